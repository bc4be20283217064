//! Accumulated DCA position. Append-only: shares are bought, never sold.

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// One executed purchase of one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    /// Date the schedule asked for.
    pub requested: NaiveDate,
    /// Trading day whose price was used after snapping.
    pub priced: NaiveDate,
    pub symbol: String,
    pub price: f64,
    pub shares: f64,
    pub amount: f64,
}

/// Min / mean / max of the prices paid across all fills.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Position {
    shares: BTreeMap<String, f64>,
    invested: BTreeMap<String, f64>,
    fills: Vec<Fill>,
}

impl Position {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fill(&mut self, fill: Fill) {
        *self.shares.entry(fill.symbol.clone()).or_insert(0.0) += fill.shares;
        *self.invested.entry(fill.symbol.clone()).or_insert(0.0) += fill.amount;
        self.fills.push(fill);
    }

    pub fn shares(&self, symbol: &str) -> f64 {
        self.shares.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn invested(&self, symbol: &str) -> f64 {
        self.invested.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn total_invested(&self) -> f64 {
        self.invested.values().sum()
    }

    /// Symbols held, with their share counts, in symbol order.
    pub fn holdings(&self) -> impl Iterator<Item = (&str, f64)> {
        self.shares.iter().map(|(s, q)| (s.as_str(), *q))
    }

    pub fn symbol_count(&self) -> usize {
        self.shares.len()
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn fill_count(&self) -> usize {
        self.fills.len()
    }

    pub fn price_stats(&self) -> Option<PriceStats> {
        if self.fills.is_empty() {
            return None;
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for fill in &self.fills {
            min = min.min(fill.price);
            max = max.max(fill.price);
            sum += fill.price;
        }
        Some(PriceStats {
            min,
            avg: sum / self.fills.len() as f64,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(symbol: &str, day: u32, price: f64, amount: f64) -> Fill {
        let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        Fill {
            requested: date,
            priced: date,
            symbol: symbol.to_string(),
            price,
            shares: amount / price,
            amount,
        }
    }

    #[test]
    fn new_position_is_empty() {
        let position = Position::new();
        assert_eq!(position.total_invested(), 0.0);
        assert_eq!(position.fill_count(), 0);
        assert_eq!(position.symbol_count(), 0);
        assert!(position.price_stats().is_none());
        assert_eq!(position.shares("AAA"), 0.0);
    }

    #[test]
    fn fills_accumulate_per_symbol() {
        let mut position = Position::new();
        position.record_fill(fill("AAA", 2, 10.0, 5.0));
        position.record_fill(fill("AAA", 3, 20.0, 5.0));
        position.record_fill(fill("BBB", 3, 50.0, 10.0));

        assert!((position.shares("AAA") - 0.75).abs() < 1e-12);
        assert!((position.invested("AAA") - 10.0).abs() < 1e-12);
        assert!((position.shares("BBB") - 0.2).abs() < 1e-12);
        assert!((position.total_invested() - 20.0).abs() < 1e-12);
        assert_eq!(position.fill_count(), 3);
        assert_eq!(
            position.holdings().map(|(s, _)| s).collect::<Vec<_>>(),
            vec!["AAA", "BBB"]
        );
    }

    #[test]
    fn price_stats_over_fills() {
        let mut position = Position::new();
        position.record_fill(fill("AAA", 2, 10.0, 1.0));
        position.record_fill(fill("AAA", 3, 20.0, 1.0));
        position.record_fill(fill("BBB", 3, 60.0, 1.0));

        let stats = position.price_stats().unwrap();
        assert!((stats.min - 10.0).abs() < f64::EPSILON);
        assert!((stats.avg - 30.0).abs() < f64::EPSILON);
        assert!((stats.max - 60.0).abs() < f64::EPSILON);
    }
}
