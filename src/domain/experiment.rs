//! One experiment: a random window, every strategy, the same capital.
//!
//! The runner moves through `ChooseWindow -> RunEachStrategy -> CollectResults
//! -> Terminal`. The first window is handed in by the driver; a `DataGap`
//! anywhere in a window discards the whole window and returns to
//! `ChooseWindow`, until `max_window_draws` draws have been spent.

use chrono::{Duration, NaiveDate};
use rand::Rng;
use rand::seq::index;
use tracing::debug;

use super::error::DcasimError;
use super::execution::{self, Holding};
use super::position::PriceStats;
use super::price_store::{PriceStore, days_between};
use super::schedule::{self, StrategyKind};
use super::simulation::{SimulationConfig, Universe};

/// Outcome of one strategy over one experiment window.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentResult {
    pub strategy: StrategyKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Last trading day of the window; prices for the final value come from here.
    pub valuation_date: NaiveDate,
    pub trading_days: usize,
    pub purchases: usize,
    pub total_invested: f64,
    pub final_value: f64,
    pub return_pct: f64,
    pub annualized_return_pct: f64,
    pub price_stats: Option<PriceStats>,
    pub holdings: Vec<Holding>,
}

impl ExperimentResult {
    pub fn profit(&self) -> f64 {
        self.final_value - self.total_invested
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    pub index: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Window draws used, including the successful one.
    pub attempts: u32,
    /// One result per strategy, in [`StrategyKind::ALL`] order.
    pub results: Vec<ExperimentResult>,
}

impl Experiment {
    pub fn result(&self, strategy: StrategyKind) -> Option<&ExperimentResult> {
        self.results.iter().find(|r| r.strategy == strategy)
    }
}

enum Phase {
    ChooseWindow {
        attempt: u32,
        last_gap: Option<DcasimError>,
    },
    RunEachStrategy {
        start: NaiveDate,
        attempt: u32,
    },
    CollectResults {
        start: NaiveDate,
        attempt: u32,
        results: Vec<ExperimentResult>,
    },
    Terminal(Result<Experiment, DcasimError>),
}

const ROUND_OFF: f64 = 1e-12;

pub fn window_end(start: NaiveDate, duration_days: u32) -> NaiveDate {
    start + Duration::days(i64::from(duration_days))
}

/// Days an experiment can trade on: the ticker's own dates for a single-ticker
/// universe, the union calendar otherwise.
pub fn trading_calendar<'a>(store: &'a PriceStore, universe: &Universe) -> &'a [NaiveDate] {
    match universe {
        Universe::Single(ticker) => store.symbol_dates(ticker),
        Universe::All => store.calendar(),
    }
}

/// Trading days that leave a full `duration_days` window before the last date.
pub fn valid_start_dates<'a>(
    store: &'a PriceStore,
    universe: &Universe,
    duration_days: u32,
) -> &'a [NaiveDate] {
    let calendar = trading_calendar(store, universe);
    let Some(&last) = calendar.last() else {
        return &[];
    };
    let count = calendar.partition_point(|d| window_end(*d, duration_days) <= last);
    &calendar[..count]
}

/// Opening start dates for `count` experiments, in chronological order.
/// Distinct whenever `starts` holds at least `count` dates, drawn with
/// replacement otherwise.
pub fn draw_start_dates<R: Rng + ?Sized>(
    rng: &mut R,
    starts: &[NaiveDate],
    count: usize,
) -> Vec<NaiveDate> {
    if starts.is_empty() {
        return Vec::new();
    }
    let mut chosen: Vec<NaiveDate> = if starts.len() >= count {
        index::sample(rng, starts.len(), count)
            .into_iter()
            .map(|i| starts[i])
            .collect()
    } else {
        (0..count)
            .map(|_| starts[rng.gen_range(0..starts.len())])
            .collect()
    };
    chosen.sort_unstable();
    chosen
}

/// Run experiment `index` from `start`. A window that hits a `DataGap` is
/// replaced by a uniform redraw from the valid start dates.
pub fn run_experiment<R: Rng + ?Sized>(
    index: usize,
    store: &PriceStore,
    config: &SimulationConfig,
    start: NaiveDate,
    rng: &mut R,
) -> Result<Experiment, DcasimError> {
    let starts = valid_start_dates(store, &config.universe, config.duration_days);
    if starts.is_empty() {
        return Err(DcasimError::InsufficientData {
            reason: format!(
                "no start date leaves room for a {}-day window before {}",
                config.duration_days,
                store.last_date()
            ),
            dropped: 1,
        });
    }

    let mut phase = Phase::RunEachStrategy { start, attempt: 1 };

    loop {
        phase = match phase {
            Phase::ChooseWindow { attempt, last_gap } => {
                if attempt > config.max_window_draws {
                    let detail = last_gap.map(|e| format!(": {e}")).unwrap_or_default();
                    Phase::Terminal(Err(DcasimError::InsufficientData {
                        reason: format!(
                            "experiment {index} found no usable window in {} draws{detail}",
                            config.max_window_draws
                        ),
                        dropped: 1,
                    }))
                } else {
                    let start = starts[rng.gen_range(0..starts.len())];
                    Phase::RunEachStrategy { start, attempt }
                }
            }
            Phase::RunEachStrategy { start, attempt } => {
                match run_window(store, config, start, rng) {
                    Ok(results) => Phase::CollectResults {
                        start,
                        attempt,
                        results,
                    },
                    Err(e) if e.is_data_gap() => {
                        debug!(index, %start, attempt, error = %e, "window discarded");
                        Phase::ChooseWindow {
                            attempt: attempt + 1,
                            last_gap: Some(e),
                        }
                    }
                    Err(e) => Phase::Terminal(Err(e)),
                }
            }
            Phase::CollectResults {
                start,
                attempt,
                results,
            } => Phase::Terminal(Ok(Experiment {
                index,
                start_date: start,
                end_date: window_end(start, config.duration_days),
                attempts: attempt,
                results,
            })),
            Phase::Terminal(outcome) => return outcome,
        };
    }
}

/// Run every strategy over the window starting at `start`. The window must end
/// on or before the last available date; all strategies see the same trading
/// days, symbols and capital.
pub fn run_window<R: Rng + ?Sized>(
    store: &PriceStore,
    config: &SimulationConfig,
    start: NaiveDate,
    rng: &mut R,
) -> Result<Vec<ExperimentResult>, DcasimError> {
    let calendar = trading_calendar(store, &config.universe);
    let last = calendar.last().copied().unwrap_or_else(|| store.last_date());
    let end = window_end(start, config.duration_days);
    if end > last {
        return Err(DcasimError::InsufficientData {
            reason: format!("window {start}..{end} extends beyond last available date {last}"),
            dropped: 0,
        });
    }

    let days = days_between(calendar, start, end);
    let Some(&valuation_date) = days.last() else {
        return Err(DcasimError::InsufficientData {
            reason: format!("no trading days in window {start}..{end}"),
            dropped: 0,
        });
    };

    let symbols = match &config.universe {
        Universe::Single(ticker) => {
            check_coverage(store, ticker, start, end)?;
            vec![ticker.clone()]
        }
        Universe::All => store.symbols_covering(start, valuation_date),
    };
    if symbols.is_empty() {
        return Err(DcasimError::DataGap {
            symbol: "*".to_string(),
            date: start,
        });
    }

    let capital = config.total_capital(days.len());
    let daily_amount = capital / days.len() as f64;

    StrategyKind::ALL
        .iter()
        .map(|&strategy| {
            let plan = schedule::generate(strategy, days, daily_amount, rng);
            let position = execution::execute(&plan, &symbols, store)?;
            let valuation = execution::value_position(&position, store, valuation_date)?;

            let invested = position.total_invested();
            let (return_pct, annualized_return_pct) =
                returns(invested, valuation.final_value, config.duration_days);

            Ok(ExperimentResult {
                strategy,
                start_date: start,
                end_date: end,
                valuation_date: valuation.date,
                trading_days: days.len(),
                purchases: plan.len(),
                total_invested: invested,
                final_value: valuation.final_value,
                return_pct,
                annualized_return_pct,
                price_stats: position.price_stats(),
                holdings: valuation.holdings,
            })
        })
        .collect()
}

/// A single ticker only buys on its own dates, but every market day in the
/// window must still resolve to one of its prices within the snap lookback.
fn check_coverage(
    store: &PriceStore,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(), DcasimError> {
    store
        .trading_days_between(start, end)
        .iter()
        .try_for_each(|&day| store.price_at_or_before(ticker, day).map(|_| ()))
}

/// Simple and annualized percentage return; zero when nothing was invested.
pub fn returns(invested: f64, final_value: f64, duration_days: u32) -> (f64, f64) {
    if invested <= 0.0 || duration_days == 0 {
        return (0.0, 0.0);
    }
    // Share conversion round-off on an unchanged price is not a return.
    let profit = final_value - invested;
    if profit.abs() <= invested * ROUND_OFF {
        return (0.0, 0.0);
    }
    let growth = final_value / invested;
    let simple = profit / invested * 100.0;
    let annualized = (growth.powf(365.0 / f64::from(duration_days)) - 1.0) * 100.0;
    (simple, annualized)
}
