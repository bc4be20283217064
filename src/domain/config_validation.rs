//! Configuration validation.
//!
//! Validates every config field before any data is loaded or any experiment
//! runs.

use crate::domain::error::DcasimError;
use crate::domain::price::PriceColumn;
use crate::domain::simulation::CapitalBasis;
use crate::ports::config_port::ConfigPort;

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    validate_data_path(config)?;
    validate_price_column(config)?;
    Ok(())
}

pub fn validate_experiment_config(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    validate_num_experiments(config)?;
    validate_duration(config)?;
    validate_daily_investment(config)?;
    validate_seed(config)?;
    validate_max_window_draws(config)?;
    validate_snap_lookback(config)?;
    validate_capital_basis(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> DcasimError {
    DcasimError::invalid(section, key, reason)
}

fn validate_data_path(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    match config.get_string("data", "path") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(DcasimError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        }),
    }
}

fn validate_price_column(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    match config.get_string("data", "price_column") {
        Some(s) => s
            .parse::<PriceColumn>()
            .map(|_| ())
            .map_err(|reason| invalid("data", "price_column", &reason)),
        None => Ok(()),
    }
}

fn validate_num_experiments(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    if config.get_int("experiment", "num_experiments", 20) < 1 {
        return Err(invalid(
            "experiment",
            "num_experiments",
            "num_experiments must be at least 1",
        ));
    }
    Ok(())
}

fn validate_duration(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    let value = config.get_int("experiment", "duration_days", 365);
    if value < 1 || value > i64::from(u32::MAX) {
        return Err(invalid(
            "experiment",
            "duration_days",
            "duration_days must be positive",
        ));
    }
    Ok(())
}

fn validate_daily_investment(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    let value = config.get_double("experiment", "daily_investment", 1.0);
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(
            "experiment",
            "daily_investment",
            "daily_investment must be positive",
        ));
    }
    Ok(())
}

fn validate_seed(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    match config.get_string("experiment", "seed") {
        Some(s) if !s.trim().is_empty() => s
            .trim()
            .parse::<u64>()
            .map(|_| ())
            .map_err(|_| invalid("experiment", "seed", "seed must be a non-negative integer")),
        _ => Ok(()),
    }
}

fn validate_max_window_draws(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    let value = config.get_int("experiment", "max_window_draws", 10);
    if value < 1 || value > i64::from(u32::MAX) {
        return Err(invalid(
            "experiment",
            "max_window_draws",
            "max_window_draws must be at least 1",
        ));
    }
    Ok(())
}

fn validate_snap_lookback(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    let value = config.get_int("experiment", "snap_lookback_days", 7);
    if value < 0 || value > i64::from(u32::MAX) {
        return Err(invalid(
            "experiment",
            "snap_lookback_days",
            "snap_lookback_days must be non-negative",
        ));
    }
    Ok(())
}

fn validate_capital_basis(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    match config.get_string("experiment", "capital_basis") {
        Some(s) => s
            .parse::<CapitalBasis>()
            .map(|_| ())
            .map_err(|reason| invalid("experiment", "capital_basis", &reason)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn invalid_key(err: DcasimError) -> String {
        match err {
            DcasimError::InvalidConfiguration { key, .. } => key,
            other => panic!("expected InvalidConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn valid_config_passes() {
        let config = make_config(
            r#"
[data]
path = all_stocks_5yr.csv
price_column = open
ticker = AAPL

[experiment]
num_experiments = 20
duration_days = 365
daily_investment = 1.0
seed = 42
max_window_draws = 10
snap_lookback_days = 7
capital_basis = trading
parallel = true
"#,
        );
        assert!(validate_data_config(&config).is_ok());
        assert!(validate_experiment_config(&config).is_ok());
    }

    #[test]
    fn defaults_are_valid() {
        let config = make_config("[data]\npath = prices.csv\n");
        assert!(validate_data_config(&config).is_ok());
        assert!(validate_experiment_config(&config).is_ok());
    }

    #[test]
    fn data_path_is_required() {
        let err = validate_data_config(&make_config("[data]\nticker = AAPL\n")).unwrap_err();
        assert!(matches!(err, DcasimError::ConfigMissing { ref key, .. } if key == "path"));

        let err = validate_data_config(&make_config("[data]\npath =   \n")).unwrap_err();
        assert!(matches!(err, DcasimError::ConfigMissing { .. }));
    }

    #[test]
    fn unknown_price_column_fails() {
        let config = make_config("[data]\npath = p.csv\nprice_column = adj_close\n");
        assert_eq!(invalid_key(validate_data_config(&config).unwrap_err()), "price_column");
    }

    #[test]
    fn non_positive_experiment_values_fail() {
        for (line, key) in [
            ("num_experiments = 0", "num_experiments"),
            ("duration_days = 0", "duration_days"),
            ("duration_days = -30", "duration_days"),
            ("daily_investment = 0", "daily_investment"),
            ("daily_investment = -1.5", "daily_investment"),
            ("max_window_draws = 0", "max_window_draws"),
            ("snap_lookback_days = -1", "snap_lookback_days"),
        ] {
            let config = make_config(&format!("[experiment]\n{line}\n"));
            let err = validate_experiment_config(&config).unwrap_err();
            assert_eq!(invalid_key(err), key, "for `{line}`");
        }
    }

    #[test]
    fn seed_must_be_an_unsigned_integer() {
        let config = make_config("[experiment]\nseed = -3\n");
        assert_eq!(invalid_key(validate_experiment_config(&config).unwrap_err()), "seed");

        let config = make_config("[experiment]\nseed =\n");
        assert!(validate_experiment_config(&config).is_ok());
    }

    #[test]
    fn unknown_capital_basis_fails() {
        let config = make_config("[experiment]\ncapital_basis = weekly\n");
        assert_eq!(
            invalid_key(validate_experiment_config(&config).unwrap_err()),
            "capital_basis"
        );
    }
}
