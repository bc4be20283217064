#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Weekday};
use dcasim::domain::error::DcasimError;
use dcasim::domain::price::{PriceColumn, PricePoint};
use dcasim::domain::price_store::PriceStore;
use dcasim::domain::simulation::SimulationConfig;
use dcasim::ports::data_port::PriceDataPort;
use std::collections::BTreeMap;

/// In-memory price table keyed by symbol. The column argument is ignored;
/// every point carries a single price.
pub struct MockPriceDataPort {
    pub data: BTreeMap<String, Vec<PricePoint>>,
    pub error: Option<String>,
}

impl MockPriceDataPort {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            error: None,
        }
    }

    pub fn with_points(mut self, points: Vec<PricePoint>) -> Self {
        for p in points {
            self.data.entry(p.symbol.clone()).or_default().push(p);
        }
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl PriceDataPort for MockPriceDataPort {
    fn load_prices(
        &self,
        _column: PriceColumn,
        ticker: Option<&str>,
    ) -> Result<Vec<PricePoint>, DcasimError> {
        if let Some(reason) = &self.error {
            return Err(DcasimError::DataLoad {
                reason: reason.clone(),
            });
        }
        let mut points: Vec<PricePoint> = self
            .data
            .iter()
            .filter(|(symbol, _)| ticker.is_none_or(|t| t == symbol.as_str()))
            .flat_map(|(_, points)| points.iter().cloned())
            .collect();
        points.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.date.cmp(&b.date)));
        Ok(points)
    }

    fn list_symbols(&self) -> Result<Vec<String>, DcasimError> {
        Ok(self.data.keys().cloned().collect())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn is_weekday(d: &NaiveDate) -> bool {
    !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Monday-to-Friday dates in `[start, end]`.
pub fn weekdays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(is_weekday)
        .collect()
}

/// Weekday prices moving linearly from `from` on `start` to `to` on `end`.
pub fn linear_series(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    from: f64,
    to: f64,
) -> Vec<PricePoint> {
    let span = (end - start).num_days().max(1) as f64;
    weekdays(start, end)
        .into_iter()
        .map(|d| {
            let t = (d - start).num_days() as f64 / span;
            PricePoint::new(symbol, d, from + (to - from) * t)
        })
        .collect()
}

pub fn constant_series(symbol: &str, start: NaiveDate, end: NaiveDate, price: f64) -> Vec<PricePoint> {
    weekdays(start, end)
        .into_iter()
        .map(|d| PricePoint::new(symbol, d, price))
        .collect()
}

/// Deterministic wobbly series that stays positive.
pub fn wavy_series(symbol: &str, start: NaiveDate, end: NaiveDate, base: f64) -> Vec<PricePoint> {
    weekdays(start, end)
        .into_iter()
        .enumerate()
        .map(|(i, d)| {
            let x = i as f64;
            let price = base * (1.0 + 0.0004 * x) + base * 0.1 * (x / 9.0).sin();
            PricePoint::new(symbol, d, price)
        })
        .collect()
}

pub fn store(points: Vec<PricePoint>) -> PriceStore {
    PriceStore::new(points, 7).unwrap()
}

pub fn small_config(num_experiments: usize, duration_days: u32) -> SimulationConfig {
    SimulationConfig {
        num_experiments,
        duration_days,
        ..SimulationConfig::default()
    }
}
