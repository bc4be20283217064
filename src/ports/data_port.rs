//! Price data access port trait.

use crate::domain::error::DcasimError;
use crate::domain::price::{PriceColumn, PricePoint};

pub trait PriceDataPort {
    /// Load `column` for every symbol, or only `ticker` when given.
    ///
    /// Points come back sorted by (symbol, date) with duplicates removed,
    /// keeping the last occurrence.
    fn load_prices(
        &self,
        column: PriceColumn,
        ticker: Option<&str>,
    ) -> Result<Vec<PricePoint>, DcasimError>;

    fn list_symbols(&self) -> Result<Vec<String>, DcasimError>;
}
