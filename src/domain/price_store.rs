//! Read-only price store with a unified trading calendar.
//!
//! Each symbol's series is kept sorted by date so point lookups are a binary
//! search. The trading calendar is the union of every date in the loaded table.
//!
//! Snap policy: a request for a date with no data for a symbol resolves to the
//! most recent earlier date that does have data, provided it is no more than
//! `snap_lookback_days` calendar days back. Anything further back, or a
//! non-positive price, is a [`DcasimError::DataGap`].

use crate::domain::error::DcasimError;
use crate::domain::price::PricePoint;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_SNAP_LOOKBACK_DAYS: u32 = 7;

#[derive(Debug, Clone, Default)]
struct SymbolSeries {
    dates: Vec<NaiveDate>,
    prices: Vec<f64>,
}

/// A price resolved by the snap policy: `date` is the trading day actually used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesCoverage {
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub points: usize,
}

#[derive(Debug, Clone)]
pub struct PriceStore {
    series: BTreeMap<String, SymbolSeries>,
    calendar: Vec<NaiveDate>,
    snap_lookback_days: u32,
}

impl PriceStore {
    /// Build the store from a loaded table. Duplicate (symbol, date) pairs keep
    /// the last occurrence.
    pub fn new(points: Vec<PricePoint>, snap_lookback_days: u32) -> Result<Self, DcasimError> {
        if points.is_empty() {
            return Err(DcasimError::invalid("data", "path", "price table is empty"));
        }

        let mut grouped: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for point in points {
            grouped
                .entry(point.symbol)
                .or_default()
                .insert(point.date, point.price);
        }

        let calendar: BTreeSet<NaiveDate> = grouped
            .values()
            .flat_map(|by_date| by_date.keys().copied())
            .collect();

        let series = grouped
            .into_iter()
            .map(|(symbol, by_date)| {
                let (dates, prices) = by_date.into_iter().unzip();
                (symbol, SymbolSeries { dates, prices })
            })
            .collect();

        Ok(Self {
            series,
            calendar: calendar.into_iter().collect(),
            snap_lookback_days,
        })
    }

    pub fn snap_lookback_days(&self) -> u32 {
        self.snap_lookback_days
    }

    pub fn symbol_count(&self) -> usize {
        self.series.len()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.series.contains_key(symbol)
    }

    pub fn first_date(&self) -> NaiveDate {
        self.calendar[0]
    }

    pub fn last_date(&self) -> NaiveDate {
        self.calendar[self.calendar.len() - 1]
    }

    pub fn calendar(&self) -> &[NaiveDate] {
        &self.calendar
    }

    /// Exact lookup; `None` when the symbol has no row on `date`.
    pub fn price_on(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        let series = self.series.get(symbol)?;
        series
            .dates
            .binary_search(&date)
            .ok()
            .map(|i| series.prices[i])
    }

    /// Lookup with the snap-to-prior-trading-day policy applied.
    pub fn price_at_or_before(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<PriceQuote, DcasimError> {
        let gap = || DcasimError::DataGap {
            symbol: symbol.to_string(),
            date,
        };

        let series = self.series.get(symbol).ok_or_else(gap)?;
        let idx = series.dates.partition_point(|d| *d <= date);
        if idx == 0 {
            return Err(gap());
        }

        let found = series.dates[idx - 1];
        if (date - found).num_days() > i64::from(self.snap_lookback_days) {
            return Err(gap());
        }

        let price = series.prices[idx - 1];
        if !price.is_finite() || price <= 0.0 {
            return Err(gap());
        }

        Ok(PriceQuote { date: found, price })
    }

    /// Dates with a row for `symbol`, in order; empty for an unknown symbol.
    pub fn symbol_dates(&self, symbol: &str) -> &[NaiveDate] {
        self.series
            .get(symbol)
            .map_or(&[], |series| series.dates.as_slice())
    }

    /// Trading days in `[start, end]`, in order.
    pub fn trading_days_between(&self, start: NaiveDate, end: NaiveDate) -> &[NaiveDate] {
        days_between(&self.calendar, start, end)
    }

    /// Snap a calendar date onto the trading calendar using the same policy as
    /// [`price_at_or_before`](Self::price_at_or_before).
    pub fn snap_to_trading_day(&self, date: NaiveDate) -> Option<NaiveDate> {
        let idx = self.calendar.partition_point(|d| *d <= date);
        if idx == 0 {
            return None;
        }
        let found = self.calendar[idx - 1];
        ((date - found).num_days() <= i64::from(self.snap_lookback_days)).then_some(found)
    }

    pub fn coverage(&self, symbol: &str) -> Option<SeriesCoverage> {
        let series = self.series.get(symbol)?;
        Some(SeriesCoverage {
            first: *series.dates.first()?,
            last: *series.dates.last()?,
            points: series.dates.len(),
        })
    }

    /// Symbols whose series spans the whole of `[start, end]`.
    pub fn symbols_covering(&self, start: NaiveDate, end: NaiveDate) -> Vec<String> {
        self.series
            .iter()
            .filter(|(_, s)| match (s.dates.first(), s.dates.last()) {
                (Some(first), Some(last)) => *first <= start && *last >= end,
                _ => false,
            })
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }
}

/// The slice of sorted `days` falling in `[start, end]`.
pub fn days_between(days: &[NaiveDate], start: NaiveDate, end: NaiveDate) -> &[NaiveDate] {
    if start > end {
        return &[];
    }
    let lo = days.partition_point(|d| *d < start);
    let hi = days.partition_point(|d| *d <= end);
    &days[lo..hi]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn point(symbol: &str, d: NaiveDate, price: f64) -> PricePoint {
        PricePoint::new(symbol, d, price)
    }

    fn sample_store() -> PriceStore {
        // 2024-01-05 is a Friday; the weekend has no rows.
        PriceStore::new(
            vec![
                point("AAA", date(2024, 1, 4), 10.0),
                point("AAA", date(2024, 1, 5), 11.0),
                point("AAA", date(2024, 1, 8), 12.0),
                point("BBB", date(2024, 1, 5), 50.0),
                point("BBB", date(2024, 1, 8), 51.0),
                point("BBB", date(2024, 1, 9), 52.0),
            ],
            DEFAULT_SNAP_LOOKBACK_DAYS,
        )
        .unwrap()
    }

    #[test]
    fn empty_table_is_invalid_configuration() {
        let err = PriceStore::new(vec![], 7).unwrap_err();
        assert!(matches!(err, DcasimError::InvalidConfiguration { .. }));
    }

    #[test]
    fn calendar_is_union_of_dates() {
        let store = sample_store();
        assert_eq!(
            store.calendar(),
            &[date(2024, 1, 4), date(2024, 1, 5), date(2024, 1, 8), date(2024, 1, 9)]
        );
        assert_eq!(store.first_date(), date(2024, 1, 4));
        assert_eq!(store.last_date(), date(2024, 1, 9));
        assert_eq!(store.symbol_count(), 2);
    }

    #[test]
    fn duplicate_rows_keep_last() {
        let store = PriceStore::new(
            vec![
                point("AAA", date(2024, 1, 4), 10.0),
                point("AAA", date(2024, 1, 4), 10.5),
            ],
            7,
        )
        .unwrap();
        assert_eq!(store.price_on("AAA", date(2024, 1, 4)), Some(10.5));
        assert_eq!(store.coverage("AAA").unwrap().points, 1);
    }

    #[test]
    fn price_on_exact_only() {
        let store = sample_store();
        assert_eq!(store.price_on("AAA", date(2024, 1, 5)), Some(11.0));
        assert_eq!(store.price_on("AAA", date(2024, 1, 6)), None);
        assert_eq!(store.price_on("ZZZ", date(2024, 1, 5)), None);
    }

    #[test]
    fn weekend_snaps_to_friday() {
        let store = sample_store();
        let quote = store.price_at_or_before("AAA", date(2024, 1, 7)).unwrap();
        assert_eq!(quote.date, date(2024, 1, 5));
        assert!((quote.price - 11.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_symbol_row_snaps_to_prior_row() {
        let store = sample_store();
        // AAA has no row on the 9th, BBB does.
        let quote = store.price_at_or_before("AAA", date(2024, 1, 9)).unwrap();
        assert_eq!(quote.date, date(2024, 1, 8));
    }

    #[test]
    fn before_first_row_is_data_gap() {
        let store = sample_store();
        let err = store.price_at_or_before("BBB", date(2024, 1, 4)).unwrap_err();
        assert_eq!(
            err,
            DcasimError::DataGap {
                symbol: "BBB".into(),
                date: date(2024, 1, 4)
            }
        );
    }

    #[test]
    fn beyond_lookback_is_data_gap() {
        let store = PriceStore::new(vec![point("AAA", date(2024, 1, 1), 10.0)], 3).unwrap();
        assert!(store.price_at_or_before("AAA", date(2024, 1, 4)).is_ok());
        assert!(store.price_at_or_before("AAA", date(2024, 1, 5)).unwrap_err().is_data_gap());
    }

    #[test]
    fn zero_price_is_data_gap() {
        let store = PriceStore::new(vec![point("AAA", date(2024, 1, 1), 0.0)], 7).unwrap();
        assert!(store.price_at_or_before("AAA", date(2024, 1, 1)).unwrap_err().is_data_gap());
    }

    #[test]
    fn trading_days_between_is_inclusive() {
        let store = sample_store();
        assert_eq!(
            store.trading_days_between(date(2024, 1, 5), date(2024, 1, 8)),
            &[date(2024, 1, 5), date(2024, 1, 8)]
        );
        assert!(store.trading_days_between(date(2024, 1, 6), date(2024, 1, 7)).is_empty());
        assert!(store.trading_days_between(date(2024, 1, 9), date(2024, 1, 4)).is_empty());
    }

    #[test]
    fn symbol_dates_are_per_series() {
        let store = sample_store();
        assert_eq!(
            store.symbol_dates("BBB"),
            &[date(2024, 1, 5), date(2024, 1, 8), date(2024, 1, 9)]
        );
        assert!(store.symbol_dates("ZZZ").is_empty());
        assert_eq!(
            days_between(store.symbol_dates("AAA"), date(2024, 1, 5), date(2024, 1, 9)),
            &[date(2024, 1, 5), date(2024, 1, 8)]
        );
    }

    #[test]
    fn snap_to_trading_day_uses_calendar() {
        let store = sample_store();
        assert_eq!(store.snap_to_trading_day(date(2024, 1, 6)), Some(date(2024, 1, 5)));
        assert_eq!(store.snap_to_trading_day(date(2024, 1, 8)), Some(date(2024, 1, 8)));
        assert_eq!(store.snap_to_trading_day(date(2024, 1, 1)), None);
    }

    #[test]
    fn symbols_covering_requires_full_span() {
        let store = sample_store();
        assert_eq!(
            store.symbols_covering(date(2024, 1, 5), date(2024, 1, 8)),
            vec!["AAA".to_string(), "BBB".to_string()]
        );
        assert_eq!(
            store.symbols_covering(date(2024, 1, 4), date(2024, 1, 8)),
            vec!["AAA".to_string()]
        );
        assert_eq!(
            store.symbols_covering(date(2024, 1, 5), date(2024, 1, 9)),
            vec!["BBB".to_string()]
        );
    }
}
