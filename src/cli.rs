//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::markdown_report::MarkdownReportAdapter;
use crate::domain::config_validation::{validate_data_config, validate_experiment_config};
use crate::domain::error::DcasimError;
use crate::domain::price::PriceColumn;
use crate::domain::price_store::{DEFAULT_SNAP_LOOKBACK_DAYS, PriceStore};
use crate::domain::simulation::{
    self, CapitalBasis, DEFAULT_MAX_WINDOW_DRAWS, SimulationConfig, SimulationOutcome,
    SimulationReport, Universe,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceDataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_OUTPUT: &str = "multi_strategy_report.md";

#[derive(Parser, Debug)]
#[command(
    name = "dcasim",
    about = "Dollar-cost averaging timing strategy simulator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the multi-strategy simulation and write a report
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Price table CSV, overrides [data] path
        #[arg(long)]
        data: Option<PathBuf>,
        /// Single ticker; empty or "all" for every symbol
        #[arg(long)]
        ticker: Option<String>,
        #[arg(short = 'n', long)]
        experiments: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a simulation configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show symbols and date coverage of a price table
    Info {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct RunOverrides {
    pub data: Option<PathBuf>,
    pub ticker: Option<String>,
    pub experiments: Option<usize>,
    pub seed: Option<u64>,
    pub output: Option<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            data,
            ticker,
            experiments,
            seed,
            output,
        } => run_simulation_command(
            &config,
            RunOverrides {
                data,
                ticker,
                experiments,
                seed,
                output,
            },
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Info { data, ticker } => run_info(&data, ticker.as_deref()),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// `None`, empty and `all` select every symbol.
pub fn parse_universe(ticker: Option<&str>) -> Universe {
    match ticker.map(str::trim) {
        None | Some("") => Universe::All,
        Some(t) if t.eq_ignore_ascii_case("all") => Universe::All,
        Some(t) => Universe::Single(t.to_string()),
    }
}

fn non_negative_u32(value: i64, section: &str, key: &str) -> Result<u32, DcasimError> {
    u32::try_from(value)
        .map_err(|_| DcasimError::invalid(section, key, format!("{value} is out of range")))
}

pub fn build_simulation_config(adapter: &dyn ConfigPort) -> Result<SimulationConfig, DcasimError> {
    let defaults = SimulationConfig::default();

    let price_column = match adapter.get_string("data", "price_column") {
        Some(s) => s
            .parse::<PriceColumn>()
            .map_err(|reason| DcasimError::invalid("data", "price_column", reason))?,
        None => PriceColumn::default(),
    };
    let capital_basis = match adapter.get_string("experiment", "capital_basis") {
        Some(s) => s
            .parse::<CapitalBasis>()
            .map_err(|reason| DcasimError::invalid("experiment", "capital_basis", reason))?,
        None => CapitalBasis::default(),
    };
    let seed = match adapter
        .get_string("experiment", "seed")
        .filter(|s| !s.trim().is_empty())
    {
        Some(s) => Some(s.trim().parse::<u64>().map_err(|_| {
            DcasimError::invalid("experiment", "seed", "seed must be a non-negative integer")
        })?),
        None => None,
    };

    let num_experiments = adapter.get_int(
        "experiment",
        "num_experiments",
        defaults.num_experiments as i64,
    );
    let num_experiments = usize::try_from(num_experiments).map_err(|_| {
        DcasimError::invalid("experiment", "num_experiments", "must be at least 1")
    })?;

    let config = SimulationConfig {
        num_experiments,
        duration_days: non_negative_u32(
            adapter.get_int("experiment", "duration_days", i64::from(defaults.duration_days)),
            "experiment",
            "duration_days",
        )?,
        daily_investment: adapter.get_double(
            "experiment",
            "daily_investment",
            defaults.daily_investment,
        ),
        price_column,
        universe: parse_universe(adapter.get_string("data", "ticker").as_deref()),
        seed,
        max_window_draws: non_negative_u32(
            adapter.get_int(
                "experiment",
                "max_window_draws",
                i64::from(DEFAULT_MAX_WINDOW_DRAWS),
            ),
            "experiment",
            "max_window_draws",
        )?,
        snap_lookback_days: non_negative_u32(
            adapter.get_int(
                "experiment",
                "snap_lookback_days",
                i64::from(DEFAULT_SNAP_LOOKBACK_DAYS),
            ),
            "experiment",
            "snap_lookback_days",
        )?,
        capital_basis,
        parallel: adapter.get_bool("experiment", "parallel", defaults.parallel),
    };
    config.validate()?;
    Ok(config)
}

/// Fold command-line overrides into a config built from file.
pub fn apply_overrides(config: &mut SimulationConfig, overrides: &RunOverrides) {
    if let Some(ticker) = &overrides.ticker {
        config.universe = parse_universe(Some(ticker));
    }
    if let Some(n) = overrides.experiments {
        config.num_experiments = n;
    }
    if let Some(seed) = overrides.seed {
        config.seed = Some(seed);
    }
}

fn run_simulation_command(config_path: &Path, overrides: RunOverrides) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate
    if let Err(e) = validate_experiment_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if overrides.data.is_none() {
        if let Err(e) = validate_data_config(&adapter) {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    // Stage 3: Build SimulationConfig
    let mut config = match build_simulation_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    apply_overrides(&mut config, &overrides);
    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 4: Resolve data and output paths
    let data_path = match overrides
        .data
        .clone()
        .or_else(|| adapter.get_string("data", "path").map(PathBuf::from))
    {
        Some(p) => p,
        None => {
            let err = DcasimError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            };
            eprintln!("error: {err}");
            return (&err).into();
        }
    };
    let output = overrides
        .output
        .clone()
        .or_else(|| adapter.get_string("report", "output").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let data_port = CsvPriceAdapter::new(&data_path);
    let report_port = MarkdownReportAdapter::new();
    run_simulation_pipeline(
        &data_port,
        &report_port,
        &config,
        &data_port.path().display().to_string(),
        &output,
    )
}

/// Fail with the available symbols when `ticker` is not in the table.
pub fn check_ticker(data_port: &dyn PriceDataPort, ticker: &str) -> Result<(), DcasimError> {
    let symbols = data_port.list_symbols()?;
    if symbols.iter().any(|s| s == ticker) {
        return Ok(());
    }
    let preview: Vec<&str> = symbols.iter().take(10).map(String::as_str).collect();
    let more = if symbols.len() > preview.len() { ", ..." } else { "" };
    Err(DcasimError::invalid(
        "data",
        "ticker",
        format!(
            "ticker {ticker} not found in price data ({} symbols: {}{more})",
            symbols.len(),
            preview.join(", ")
        ),
    ))
}

/// Load prices, run every experiment, print the console summary and write the
/// report.
pub fn run_simulation_pipeline(
    data_port: &dyn PriceDataPort,
    report_port: &dyn ReportPort,
    config: &SimulationConfig,
    data_source: &str,
    output: &Path,
) -> ExitCode {
    // Stage 5: Load prices
    eprintln!("Loading prices from {} ({})", data_source, config.price_column);
    let ticker = match &config.universe {
        Universe::Single(t) => Some(t.as_str()),
        Universe::All => None,
    };
    if let Some(t) = ticker {
        if let Err(e) = check_ticker(data_port, t) {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }
    let points = match data_port.load_prices(config.price_column, ticker) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let store = match PriceStore::new(points, config.snap_lookback_days) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!(
        "  {} symbols, {} trading days, {} to {}",
        store.symbol_count(),
        store.calendar().len(),
        store.first_date(),
        store.last_date()
    );

    // Stage 6: Simulate
    eprintln!(
        "Running {} experiments of {} days on {}...",
        config.num_experiments, config.duration_days, config.universe
    );
    let outcome = match simulation::run_simulation(&store, config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    print_summary(&outcome);

    // Stage 7: Report
    let report = SimulationReport::new(config, data_source, &store, &outcome);
    let output_str = output.display().to_string();
    match report_port.write(&report, &output_str) {
        Ok(()) => {
            eprintln!("\nReport written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to write report: {e}");
            (&e).into()
        }
    }
}

fn print_summary(outcome: &SimulationOutcome) {
    let summary = &outcome.summary;
    eprintln!(
        "\n=== Strategy Summary ({} of {} experiments) ===",
        outcome.experiments.len(),
        outcome.requested()
    );
    for kind in &summary.ranking {
        let Some(stats) = summary.statistics(*kind) else {
            continue;
        };
        let ratio = stats
            .risk_adjusted_ratio
            .map_or_else(|| "N/A".to_string(), |r| format!("{r:.2}"));
        eprintln!(
            "  {:<15} avg {:+7.2}%  std {:6.2}%  success {:5.1}%  risk/return {}",
            stats.strategy.name(),
            stats.mean_return,
            stats.stdev_return,
            stats.success_rate * 100.0,
            ratio
        );
    }
    if !outcome.dropped.is_empty() {
        eprintln!(
            "warning: {} experiments dropped (no usable window)",
            outcome.dropped.len()
        );
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let checks = validate_data_config(&adapter)
        .and_then(|()| validate_experiment_config(&adapter))
        .and_then(|()| build_simulation_config(&adapter));
    let config = match checks {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nData:");
    eprintln!(
        "  path:         {}",
        adapter.get_string("data", "path").unwrap_or_default()
    );
    eprintln!("  price column: {}", config.price_column);
    eprintln!("  universe:     {}", config.universe);
    eprintln!("\nExperiment:");
    eprintln!("  experiments:      {}", config.num_experiments);
    eprintln!("  duration:         {} days", config.duration_days);
    eprintln!("  daily investment: {:.2}", config.daily_investment);
    match config.capital_basis {
        CapitalBasis::CalendarDays => eprintln!(
            "  capital:          {:.2} per experiment",
            config.total_capital(0)
        ),
        CapitalBasis::TradingDays => eprintln!(
            "  capital:          {:.2} per trading day",
            config.daily_investment
        ),
    }
    eprintln!(
        "  seed:             {}",
        config
            .seed
            .map_or_else(|| "entropy".to_string(), |s| s.to_string())
    );
    eprintln!("  window draws:     {}", config.max_window_draws);
    eprintln!("  snap lookback:    {} days", config.snap_lookback_days);

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(data_path: &Path, ticker: Option<&str>) -> ExitCode {
    let adapter = CsvPriceAdapter::new(data_path);
    if let Some(t) = ticker {
        if let Err(e) = check_ticker(&adapter, t) {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    let points = match adapter.load_prices(PriceColumn::Close, ticker) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let store = match PriceStore::new(points, DEFAULT_SNAP_LOOKBACK_DAYS) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    for symbol in store.symbols() {
        if let Some(cov) = store.coverage(symbol) {
            println!("{}: {} to {} ({} points)", symbol, cov.first, cov.last, cov.points);
        }
    }
    eprintln!(
        "{} symbols, {} trading days, {} to {}",
        store.symbol_count(),
        store.calendar().len(),
        store.first_date(),
        store.last_date()
    );
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn builds_config_with_defaults() {
        let config = build_simulation_config(&adapter("[data]\npath = p.csv\n")).unwrap();
        assert_eq!(
            config,
            SimulationConfig {
                seed: None,
                ..SimulationConfig::default()
            }
        );
    }

    #[test]
    fn builds_config_from_every_key() {
        let config = build_simulation_config(&adapter(
            r#"
[data]
path = p.csv
price_column = open
ticker = AAPL

[experiment]
num_experiments = 5
duration_days = 730
daily_investment = 2.5
seed = 7
max_window_draws = 3
snap_lookback_days = 4
capital_basis = trading
parallel = false
"#,
        ))
        .unwrap();

        assert_eq!(config.num_experiments, 5);
        assert_eq!(config.duration_days, 730);
        assert_eq!(config.daily_investment, 2.5);
        assert_eq!(config.price_column, PriceColumn::Open);
        assert_eq!(config.universe, Universe::Single("AAPL".into()));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.max_window_draws, 3);
        assert_eq!(config.snap_lookback_days, 4);
        assert_eq!(config.capital_basis, CapitalBasis::TradingDays);
        assert!(!config.parallel);
    }

    #[test]
    fn missing_seed_means_entropy() {
        let config =
            build_simulation_config(&adapter("[experiment]\nnum_experiments = 2\n")).unwrap();
        assert_eq!(config.seed, None);
    }

    #[test]
    fn negative_duration_is_rejected() {
        let err =
            build_simulation_config(&adapter("[experiment]\nduration_days = -5\n")).unwrap_err();
        assert!(matches!(err, DcasimError::InvalidConfiguration { ref key, .. } if key == "duration_days"));
    }

    #[test]
    fn universe_parsing() {
        assert_eq!(parse_universe(None), Universe::All);
        assert_eq!(parse_universe(Some("  ")), Universe::All);
        assert_eq!(parse_universe(Some("ALL")), Universe::All);
        assert_eq!(parse_universe(Some("MSFT")), Universe::Single("MSFT".into()));
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut config = SimulationConfig::default();
        apply_overrides(
            &mut config,
            &RunOverrides {
                ticker: Some("AAPL".into()),
                experiments: Some(3),
                seed: Some(99),
                ..RunOverrides::default()
            },
        );
        assert_eq!(config.universe, Universe::Single("AAPL".into()));
        assert_eq!(config.num_experiments, 3);
        assert_eq!(config.seed, Some(99));
    }

    #[test]
    fn check_ticker_lists_available_symbols() {
        use crate::domain::price::PricePoint;

        struct Symbols(Vec<String>);
        impl PriceDataPort for Symbols {
            fn load_prices(
                &self,
                _column: PriceColumn,
                _ticker: Option<&str>,
            ) -> Result<Vec<PricePoint>, DcasimError> {
                Ok(Vec::new())
            }
            fn list_symbols(&self) -> Result<Vec<String>, DcasimError> {
                Ok(self.0.clone())
            }
        }

        let port = Symbols(vec!["AAPL".into(), "MSFT".into()]);
        assert!(check_ticker(&port, "MSFT").is_ok());
        let err = check_ticker(&port, "ZZZ").unwrap_err();
        assert!(
            matches!(err, DcasimError::InvalidConfiguration { ref reason, .. } if reason.contains("2 symbols: AAPL, MSFT"))
        );
    }

    #[test]
    fn cli_parses_run_command() {
        let cli = Cli::try_parse_from([
            "dcasim", "run", "--config", "sim.ini", "--ticker", "AAPL", "-n", "5", "--seed", "1",
        ])
        .unwrap();
        match cli.command {
            Command::Run {
                config,
                ticker,
                experiments,
                seed,
                ..
            } => {
                assert_eq!(config, PathBuf::from("sim.ini"));
                assert_eq!(ticker.as_deref(), Some("AAPL"));
                assert_eq!(experiments, Some(5));
                assert_eq!(seed, Some(1));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
