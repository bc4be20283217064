//! Markdown report generation.
//!
//! Renders a [`SimulationReport`] into one markdown document: parameters,
//! ranked strategy summary, per-strategy detail, the individual experiment
//! table, dropped experiments and key insights.

pub mod tables;

use std::fs;
use std::path::Path;

use tracing::info;

use crate::domain::aggregate::{NotableResult, Summary, TimingImpact};
use crate::domain::error::DcasimError;
use crate::domain::simulation::SimulationReport;
use crate::ports::report_port::ReportPort;

const DISCLAIMER: &str = "*This is a simulation for educational purposes only. \
Past performance does not guarantee future results.*";

pub struct MarkdownReportAdapter;

impl MarkdownReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MarkdownReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for MarkdownReportAdapter {
    fn write(&self, report: &SimulationReport<'_>, output_path: &str) -> Result<(), DcasimError> {
        let markdown = render(report);

        let path = Path::new(output_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DcasimError::Report {
                reason: format!("failed to create {}: {}", parent.display(), e),
            })?;
        }
        fs::write(path, markdown).map_err(|e| DcasimError::Report {
            reason: format!("failed to write {}: {}", path.display(), e),
        })?;

        info!(path = output_path, "report written");
        Ok(())
    }
}

pub fn render(report: &SimulationReport<'_>) -> String {
    let outcome = report.outcome;
    let summary = &outcome.summary;
    let mut out = String::from("# Multi-Strategy Dollar Cost Averaging Report\n\n");

    out.push_str("## Experiment Parameters\n\n");
    out.push_str(&tables::format_parameters(report));
    out.push('\n');

    out.push_str("## Strategy Performance Summary\n\n");
    out.push_str(&format!(
        "*Statistics across {} completed experiments with different start dates*\n\n",
        outcome.experiments.len()
    ));
    out.push_str(&tables::format_strategy_summary(summary));
    out.push('\n');

    out.push_str("## Detailed Strategy Analysis\n\n");
    for stats in &summary.per_strategy {
        out.push_str(&tables::format_strategy_detail(stats));
        out.push('\n');
    }

    out.push_str("## Individual Experiment Results\n\n");
    out.push_str(&tables::format_experiment_table(&outcome.experiments, summary));
    out.push('\n');

    if !outcome.dropped.is_empty() {
        out.push_str("## Dropped Experiments\n\n");
        out.push_str(&format!(
            "{} of {} experiments found no usable window and were dropped.\n\n",
            outcome.dropped.len(),
            outcome.requested()
        ));
        out.push_str(&tables::format_dropped(&outcome.dropped));
        out.push('\n');
    }

    out.push_str("## Key Insights\n\n");
    out.push_str(&insights(summary));
    out.push_str("\n---\n");
    out.push_str(DISCLAIMER);
    out.push('\n');
    out
}

fn notable(label: &str, result: &NotableResult) -> String {
    format!(
        "- **{}**: {} starting {} (experiment {}) returned {:+.2}%\n",
        label,
        result.strategy.name(),
        result.start_date.format("%Y-%m-%d"),
        result.index + 1,
        result.return_pct
    )
}

fn insights(summary: &Summary) -> String {
    let mut out = String::new();
    if let Some(best) = summary.best_by_mean() {
        out.push_str(&format!(
            "- **Best Strategy**: {} with average return of {:+.2}%\n",
            best.strategy.name(),
            best.mean_return
        ));
    }
    if let Some(consistent) = summary.most_consistent() {
        out.push_str(&format!(
            "- **Most Consistent**: {} (std dev {:.2}%)\n",
            consistent.strategy.name(),
            consistent.stdev_return
        ));
    }
    if let Some(success) = summary.highest_success_rate() {
        out.push_str(&format!(
            "- **Highest Success Rate**: {} with {:.1}% profitable experiments\n",
            success.strategy.name(),
            success.success_rate * 100.0
        ));
    }
    let spread = summary.timing_spread();
    match summary.timing_impact() {
        TimingImpact::Minimal => out.push_str(&format!(
            "- **Timing Impact**: Minimal difference ({spread:.2}%) between strategies suggests timing within periods has low impact\n"
        )),
        TimingImpact::Notable => out.push_str(&format!(
            "- **Timing Impact**: Notable difference ({spread:.2}%) between strategies suggests timing can matter\n"
        )),
    }
    if let Some(best) = &summary.best_result {
        out.push_str(&notable("Best Individual Result", best));
    }
    if let Some(worst) = &summary.worst_result {
        out.push_str(&notable("Worst Individual Result", worst));
    }
    out
}
