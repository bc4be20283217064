//! CSV price table adapter.
//!
//! Expects one row per (date, symbol) with a header naming at least `date`,
//! the selected price column and `Name` (or `symbol`). Columns are looked up by
//! header name, so their order does not matter.

use crate::domain::error::DcasimError;
use crate::domain::price::{PriceColumn, PricePoint};
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvPriceAdapter {
    path: PathBuf,
}

struct Columns {
    date: usize,
    symbol: usize,
}

impl CsvPriceAdapter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(&self) -> Result<csv::Reader<std::fs::File>, DcasimError> {
        csv::Reader::from_path(&self.path).map_err(|e| DcasimError::DataLoad {
            reason: format!("failed to open {}: {}", self.path.display(), e),
        })
    }

    fn headers(&self, rdr: &mut csv::Reader<std::fs::File>) -> Result<StringRecord, DcasimError> {
        rdr.headers().cloned().map_err(|e| DcasimError::DataLoad {
            reason: format!("failed to read header of {}: {}", self.path.display(), e),
        })
    }

    fn column(&self, headers: &StringRecord, names: &[&str]) -> Result<usize, DcasimError> {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
            .ok_or_else(|| DcasimError::DataLoad {
                reason: format!(
                    "{} has no '{}' column",
                    self.path.display(),
                    names.join("' or '")
                ),
            })
    }

    fn key_columns(&self, headers: &StringRecord) -> Result<Columns, DcasimError> {
        Ok(Columns {
            date: self.column(headers, &["date"])?,
            symbol: self.column(headers, &["Name", "symbol"])?,
        })
    }
}

fn field<'r>(record: &'r StringRecord, index: usize) -> &'r str {
    record.get(index).map(str::trim).unwrap_or("")
}

impl PriceDataPort for CsvPriceAdapter {
    fn load_prices(
        &self,
        column: PriceColumn,
        ticker: Option<&str>,
    ) -> Result<Vec<PricePoint>, DcasimError> {
        let mut rdr = self.reader()?;
        let headers = self.headers(&mut rdr)?;
        let cols = self.key_columns(&headers)?;
        let price_col = self.column(&headers, &[column.as_str()])?;

        let mut prices: BTreeMap<(String, NaiveDate), f64> = BTreeMap::new();
        let mut skipped = 0usize;

        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| DcasimError::DataLoad {
                reason: format!("CSV parse error: {}", e),
            })?;

            let symbol = field(&record, cols.symbol);
            if symbol.is_empty() {
                skipped += 1;
                continue;
            }
            if ticker.is_some_and(|t| t != symbol) {
                continue;
            }

            let date_str = field(&record, cols.date);
            let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT).map_err(|e| {
                DcasimError::DataLoad {
                    reason: format!("invalid date '{}' on row {}: {}", date_str, row + 2, e),
                }
            })?;

            match field(&record, price_col).parse::<f64>() {
                Ok(price) if price.is_finite() => {
                    prices.insert((symbol.to_string(), date), price);
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(
                skipped,
                column = column.as_str(),
                "skipped rows with blank symbols or unparseable prices"
            );
        }
        info!(
            path = %self.path.display(),
            rows = prices.len(),
            column = column.as_str(),
            "loaded price table"
        );

        Ok(prices
            .into_iter()
            .map(|((symbol, date), price)| PricePoint {
                symbol,
                date,
                price,
            })
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, DcasimError> {
        let mut rdr = self.reader()?;
        let headers = self.headers(&mut rdr)?;
        let symbol_col = self.column(&headers, &["Name", "symbol"])?;

        let mut symbols = BTreeSet::new();
        for result in rdr.records() {
            let record = result.map_err(|e| DcasimError::DataLoad {
                reason: format!("CSV parse error: {}", e),
            })?;
            let symbol = field(&record, symbol_col);
            if !symbol.is_empty() {
                symbols.insert(symbol.to_string());
            }
        }
        Ok(symbols.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_test_data(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prices.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    const SAMPLE: &str = "date,open,high,low,close,volume,Name\n\
        2013-02-08,15.07,15.12,14.63,14.75,8407500,AAL\n\
        2013-02-11,14.89,15.01,14.26,14.46,8882000,AAL\n\
        2013-02-08,67.71,68.4,66.89,67.46,4163170,AAPL\n\
        2013-02-11,,68.6,67.1,68.04,3935700,AAPL\n";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn load_prices_reads_selected_column() {
        let (_dir, path) = setup_test_data(SAMPLE);
        let adapter = CsvPriceAdapter::new(&path);

        let points = adapter.load_prices(PriceColumn::Close, None).unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], PricePoint::new("AAL", date(2013, 2, 8), 14.75));
        assert_eq!(points[3], PricePoint::new("AAPL", date(2013, 2, 11), 68.04));
    }

    #[test]
    fn load_prices_filters_by_ticker() {
        let (_dir, path) = setup_test_data(SAMPLE);
        let adapter = CsvPriceAdapter::new(&path);

        let points = adapter.load_prices(PriceColumn::High, Some("AAPL")).unwrap();
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.symbol == "AAPL"));
        assert_eq!(points[1].price, 68.6);
    }

    #[test]
    fn blank_prices_are_skipped() {
        let (_dir, path) = setup_test_data(SAMPLE);
        let adapter = CsvPriceAdapter::new(&path);

        let points = adapter.load_prices(PriceColumn::Open, Some("AAPL")).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].date, date(2013, 2, 8));
    }

    #[test]
    fn header_order_and_symbol_alias() {
        let (_dir, path) =
            setup_test_data("symbol,close,date\nXYZ,10.5,2020-01-02\nXYZ,11.0,2020-01-01\n");
        let adapter = CsvPriceAdapter::new(&path);

        let points = adapter.load_prices(PriceColumn::Close, None).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, date(2020, 1, 1));
        assert_eq!(points[1].price, 10.5);
    }

    #[test]
    fn duplicate_rows_keep_last() {
        let (_dir, path) = setup_test_data(
            "date,close,Name\n2020-01-02,1.0,AAA\n2020-01-02,2.0,AAA\n",
        );
        let points = CsvPriceAdapter::new(&path)
            .load_prices(PriceColumn::Close, None)
            .unwrap();
        assert_eq!(points, vec![PricePoint::new("AAA", date(2020, 1, 2), 2.0)]);
    }

    #[test]
    fn malformed_date_is_an_error() {
        let (_dir, path) = setup_test_data("date,close,Name\n02/01/2020,1.0,AAA\n");
        let err = CsvPriceAdapter::new(&path)
            .load_prices(PriceColumn::Close, None)
            .unwrap_err();
        assert!(matches!(err, DcasimError::DataLoad { ref reason } if reason.contains("02/01/2020")));
    }

    #[test]
    fn missing_column_is_an_error() {
        let (_dir, path) = setup_test_data("date,close\n2020-01-02,1.0\n");
        let err = CsvPriceAdapter::new(&path)
            .load_prices(PriceColumn::Close, None)
            .unwrap_err();
        assert!(matches!(err, DcasimError::DataLoad { .. }));
    }

    #[test]
    fn missing_file_is_an_error() {
        let adapter = CsvPriceAdapter::new("/nonexistent/prices.csv");
        assert!(adapter.load_prices(PriceColumn::Close, None).is_err());
        assert!(adapter.list_symbols().is_err());
    }

    #[test]
    fn list_symbols_is_sorted_and_unique() {
        let (_dir, path) = setup_test_data(SAMPLE);
        let symbols = CsvPriceAdapter::new(&path).list_symbols().unwrap();
        assert_eq!(symbols, vec!["AAL", "AAPL"]);
    }
}
