//! Simulation driver: configuration, seeding, parallel experiment runs.
//!
//! One master `StdRng` is seeded from the configured seed. Before any
//! experiment runs it draws the opening start dates (distinct when the history
//! allows, in chronological order) and then one sub-seed per experiment. Each
//! experiment owns the RNG built from its sub-seed, so results do not depend
//! on thread count or completion order.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::aggregate::{self, Summary};
use super::error::DcasimError;
use super::experiment::{self, Experiment};
use super::price::PriceColumn;
use super::price_store::{DEFAULT_SNAP_LOOKBACK_DAYS, PriceStore};

pub const DEFAULT_MAX_WINDOW_DRAWS: u32 = 10;

/// Which symbols an experiment invests in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Universe {
    /// Every symbol whose history spans the experiment window.
    #[default]
    All,
    Single(String),
}

impl fmt::Display for Universe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Universe::All => f.write_str("All symbols"),
            Universe::Single(ticker) => f.write_str(ticker),
        }
    }
}

/// How an experiment's total capital is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapitalBasis {
    /// `duration_days * daily_investment`, spread over the window's trading days.
    #[default]
    CalendarDays,
    /// `daily_investment` on every trading day of the window.
    TradingDays,
}

impl CapitalBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapitalBasis::CalendarDays => "calendar",
            CapitalBasis::TradingDays => "trading",
        }
    }
}

impl FromStr for CapitalBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "calendar" | "calendar_days" => Ok(CapitalBasis::CalendarDays),
            "trading" | "trading_days" => Ok(CapitalBasis::TradingDays),
            other => Err(format!(
                "unknown capital basis '{other}' (expected calendar or trading)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub num_experiments: usize,
    pub duration_days: u32,
    pub daily_investment: f64,
    pub price_column: PriceColumn,
    pub universe: Universe,
    pub seed: Option<u64>,
    pub max_window_draws: u32,
    pub snap_lookback_days: u32,
    pub capital_basis: CapitalBasis,
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            num_experiments: 20,
            duration_days: 365,
            daily_investment: 1.0,
            price_column: PriceColumn::Close,
            universe: Universe::All,
            seed: Some(42),
            max_window_draws: DEFAULT_MAX_WINDOW_DRAWS,
            snap_lookback_days: DEFAULT_SNAP_LOOKBACK_DAYS,
            capital_basis: CapitalBasis::CalendarDays,
            parallel: true,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), DcasimError> {
        if self.num_experiments == 0 {
            return Err(DcasimError::invalid(
                "experiment",
                "num_experiments",
                "num_experiments must be at least 1",
            ));
        }
        if self.duration_days == 0 {
            return Err(DcasimError::invalid(
                "experiment",
                "duration_days",
                "duration_days must be positive",
            ));
        }
        if !self.daily_investment.is_finite() || self.daily_investment <= 0.0 {
            return Err(DcasimError::invalid(
                "experiment",
                "daily_investment",
                "daily_investment must be positive",
            ));
        }
        if self.max_window_draws == 0 {
            return Err(DcasimError::invalid(
                "experiment",
                "max_window_draws",
                "max_window_draws must be at least 1",
            ));
        }
        if let Universe::Single(ticker) = &self.universe {
            if ticker.trim().is_empty() {
                return Err(DcasimError::invalid("data", "ticker", "ticker is empty"));
            }
        }
        Ok(())
    }

    /// Capital every strategy deploys over a window with `trading_days` days.
    pub fn total_capital(&self, trading_days: usize) -> f64 {
        match self.capital_basis {
            CapitalBasis::CalendarDays => f64::from(self.duration_days) * self.daily_investment,
            CapitalBasis::TradingDays => trading_days as f64 * self.daily_investment,
        }
    }
}

/// An experiment whose window draws all failed.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedExperiment {
    pub index: usize,
    pub attempts: u32,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    /// Completed experiments, sorted by index.
    pub experiments: Vec<Experiment>,
    pub dropped: Vec<DroppedExperiment>,
    pub summary: Summary,
}

impl SimulationOutcome {
    pub fn requested(&self) -> usize {
        self.experiments.len() + self.dropped.len()
    }
}

/// Everything a presentation adapter needs to describe one run.
#[derive(Debug, Clone)]
pub struct SimulationReport<'a> {
    pub config: &'a SimulationConfig,
    /// Where the prices came from, e.g. the CSV path.
    pub data_source: String,
    pub symbol_count: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub outcome: &'a SimulationOutcome,
}

impl<'a> SimulationReport<'a> {
    pub fn new(
        config: &'a SimulationConfig,
        data_source: impl Into<String>,
        store: &PriceStore,
        outcome: &'a SimulationOutcome,
    ) -> Self {
        Self {
            config,
            data_source: data_source.into(),
            symbol_count: store.symbol_count(),
            first_date: store.first_date(),
            last_date: store.last_date(),
            outcome,
        }
    }
}

/// Check the universe against the loaded data before anything runs.
pub fn validate_universe(store: &PriceStore, universe: &Universe) -> Result<(), DcasimError> {
    match universe {
        Universe::Single(ticker) if !store.has_symbol(ticker) => Err(DcasimError::invalid(
            "data",
            "ticker",
            format!("ticker {ticker} not found in price data"),
        )),
        Universe::All if store.symbol_count() == 0 => {
            Err(DcasimError::invalid("data", "path", "symbol universe is empty"))
        }
        _ => Ok(()),
    }
}

pub fn run_simulation(
    store: &PriceStore,
    config: &SimulationConfig,
) -> Result<SimulationOutcome, DcasimError> {
    config.validate()?;
    if config.snap_lookback_days != store.snap_lookback_days() {
        return Err(DcasimError::invalid(
            "experiment",
            "snap_lookback_days",
            format!(
                "price store snaps {} days back but the configuration asks for {}",
                store.snap_lookback_days(),
                config.snap_lookback_days
            ),
        ));
    }
    validate_universe(store, &config.universe)?;

    let valid_starts =
        experiment::valid_start_dates(store, &config.universe, config.duration_days);
    if valid_starts.is_empty() {
        return Err(DcasimError::InsufficientData {
            reason: format!(
                "no start date leaves room for a {}-day window before {}",
                config.duration_days,
                store.last_date()
            ),
            dropped: config.num_experiments,
        });
    }

    let mut master = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let starts = experiment::draw_start_dates(&mut master, valid_starts, config.num_experiments);
    let seeds: Vec<u64> = (0..config.num_experiments)
        .map(|_| master.next_u64())
        .collect();

    info!(
        experiments = config.num_experiments,
        duration_days = config.duration_days,
        valid_starts = valid_starts.len(),
        universe = %config.universe,
        parallel = config.parallel,
        "running simulation"
    );

    let run_one = |(index, (seed, start)): (usize, (u64, NaiveDate))| {
        let mut rng = StdRng::seed_from_u64(seed);
        let outcome = experiment::run_experiment(index, store, config, start, &mut rng);
        if let Ok(ref exp) = outcome {
            debug!(index, start = %exp.start_date, attempts = exp.attempts, "experiment complete");
        }
        (index, outcome)
    };

    let jobs: Vec<(u64, NaiveDate)> = seeds.into_iter().zip(starts).collect();
    let mut outcomes: Vec<(usize, Result<Experiment, DcasimError>)> = if config.parallel {
        jobs.into_par_iter().enumerate().map(run_one).collect()
    } else {
        jobs.into_iter().enumerate().map(run_one).collect()
    };
    outcomes.sort_by_key(|(index, _)| *index);

    let mut experiments = Vec::with_capacity(outcomes.len());
    let mut dropped = Vec::new();
    for (index, outcome) in outcomes {
        match outcome {
            Ok(exp) => experiments.push(exp),
            Err(DcasimError::InsufficientData { reason, .. }) => {
                warn!(index, %reason, "experiment dropped");
                dropped.push(DroppedExperiment {
                    index,
                    attempts: config.max_window_draws,
                    reason,
                });
            }
            Err(e) => return Err(e),
        }
    }

    if experiments.is_empty() {
        return Err(DcasimError::InsufficientData {
            reason: "every experiment exhausted its window draws".to_string(),
            dropped: dropped.len(),
        });
    }

    let summary = aggregate::summarize(&experiments);
    info!(
        completed = experiments.len(),
        dropped = dropped.len(),
        "simulation complete"
    );

    Ok(SimulationOutcome {
        experiments,
        dropped,
        summary,
    })
}
