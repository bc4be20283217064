//! Report generation port trait.

use crate::domain::error::DcasimError;
use crate::domain::simulation::SimulationReport;

/// Port for writing simulation reports.
pub trait ReportPort {
    fn write(&self, report: &SimulationReport<'_>, output_path: &str) -> Result<(), DcasimError>;
}
