//! Price point representation and price column selection.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// One loaded price: unique per (symbol, date).
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub symbol: String,
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(symbol: impl Into<String>, date: NaiveDate, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            price,
        }
    }
}

/// Which daily bar column is used as the purchase and valuation price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PriceColumn {
    Open,
    High,
    Low,
    #[default]
    Close,
}

impl PriceColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceColumn::Open => "open",
            PriceColumn::High => "high",
            PriceColumn::Low => "low",
            PriceColumn::Close => "close",
        }
    }
}

impl fmt::Display for PriceColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(PriceColumn::Open),
            "high" => Ok(PriceColumn::High),
            "low" => Ok(PriceColumn::Low),
            "close" => Ok(PriceColumn::Close),
            other => Err(format!(
                "unknown price column '{other}' (expected open, high, low or close)"
            )),
        }
    }
}
