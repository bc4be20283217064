//! Cross-experiment statistics and strategy comparison.
//!
//! Everything here is a pure function of the completed experiments; the
//! summary is rebuilt from scratch on every run.

use std::cmp::Ordering;

use super::experiment::{Experiment, ExperimentResult};
use super::schedule::StrategyKind;

/// Below this standard deviation the risk-adjusted ratio is undefined.
const STDEV_EPSILON: f64 = 1e-12;

/// Timing spread (percentage points) below which the choice of strategy is
/// reported as having minimal impact.
pub const MINIMAL_IMPACT_SPREAD: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStatistics {
    pub strategy: StrategyKind,
    pub count: usize,
    pub mean_return: f64,
    pub median_return: f64,
    /// Population standard deviation of `return_pct`.
    pub stdev_return: f64,
    pub min_return: f64,
    pub max_return: f64,
    /// Fraction of experiments with a strictly positive return, in `[0, 1]`.
    pub success_rate: f64,
    /// `mean / stdev`; `None` when the returns have no spread.
    pub risk_adjusted_ratio: Option<f64>,
    pub mean_annualized_return: f64,
    pub mean_invested: f64,
    pub mean_final_value: f64,
    /// Experiments in which this strategy had the best return.
    pub wins: usize,
}

/// Best and worst strategy of a single experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentComparison {
    pub index: usize,
    pub start_date: chrono::NaiveDate,
    pub best: StrategyKind,
    pub best_return: f64,
    pub worst: StrategyKind,
    pub worst_return: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingImpact {
    Minimal,
    Notable,
}

/// A single (experiment, strategy) result singled out in the summary.
#[derive(Debug, Clone, PartialEq)]
pub struct NotableResult {
    pub index: usize,
    pub strategy: StrategyKind,
    pub start_date: chrono::NaiveDate,
    pub return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    /// Statistics in [`StrategyKind::ALL`] order.
    pub per_strategy: Vec<SummaryStatistics>,
    pub comparisons: Vec<ExperimentComparison>,
    /// Strategies by mean return, best first.
    pub ranking: Vec<StrategyKind>,
    pub best_result: Option<NotableResult>,
    pub worst_result: Option<NotableResult>,
}

impl Summary {
    pub fn statistics(&self, strategy: StrategyKind) -> Option<&SummaryStatistics> {
        self.per_strategy.iter().find(|s| s.strategy == strategy)
    }

    pub fn best_by_mean(&self) -> Option<&SummaryStatistics> {
        self.ranking.first().and_then(|k| self.statistics(*k))
    }

    pub fn most_consistent(&self) -> Option<&SummaryStatistics> {
        pick(&self.per_strategy, |s| -s.stdev_return)
    }

    pub fn highest_success_rate(&self) -> Option<&SummaryStatistics> {
        pick(&self.per_strategy, |s| s.success_rate)
    }

    /// Difference between the highest and lowest mean return, in points.
    pub fn timing_spread(&self) -> f64 {
        let means = self.per_strategy.iter().map(|s| s.mean_return);
        let max = means.clone().fold(f64::NEG_INFINITY, f64::max);
        let min = means.fold(f64::INFINITY, f64::min);
        if max.is_finite() && min.is_finite() {
            max - min
        } else {
            0.0
        }
    }

    pub fn timing_impact(&self) -> TimingImpact {
        if self.timing_spread() < MINIMAL_IMPACT_SPREAD {
            TimingImpact::Minimal
        } else {
            TimingImpact::Notable
        }
    }
}

/// Highest `score`, ties to the earlier strategy in priority order.
fn pick<F>(stats: &[SummaryStatistics], score: F) -> Option<&SummaryStatistics>
where
    F: Fn(&SummaryStatistics) -> f64,
{
    stats.iter().reduce(|best, s| {
        match score(s)
            .total_cmp(&score(best))
            .then(best.strategy.priority().cmp(&s.strategy.priority()))
        {
            Ordering::Greater => s,
            _ => best,
        }
    })
}

pub fn summarize(experiments: &[Experiment]) -> Summary {
    let comparisons: Vec<ExperimentComparison> =
        experiments.iter().filter_map(compare).collect();

    let per_strategy: Vec<SummaryStatistics> = StrategyKind::ALL
        .iter()
        .filter_map(|&kind| {
            let results: Vec<&ExperimentResult> =
                experiments.iter().filter_map(|e| e.result(kind)).collect();
            let wins = comparisons.iter().filter(|c| c.best == kind).count();
            summarize_strategy(kind, &results, wins)
        })
        .collect();

    let mut ranking: Vec<&SummaryStatistics> = per_strategy.iter().collect();
    ranking.sort_by(|a, b| {
        b.mean_return
            .total_cmp(&a.mean_return)
            .then(a.strategy.priority().cmp(&b.strategy.priority()))
    });
    let ranking = ranking.into_iter().map(|s| s.strategy).collect();

    let notable = experiments.iter().flat_map(|e| {
        e.results.iter().map(move |r| NotableResult {
            index: e.index,
            strategy: r.strategy,
            start_date: e.start_date,
            return_pct: r.return_pct,
        })
    });
    let best_result = notable.clone().reduce(|a, b| {
        if b.return_pct > a.return_pct { b } else { a }
    });
    let worst_result = notable.reduce(|a, b| {
        if b.return_pct < a.return_pct { b } else { a }
    });

    Summary {
        per_strategy,
        comparisons,
        ranking,
        best_result,
        worst_result,
    }
}

/// Statistics for one strategy; `None` when it has no results.
pub fn summarize_strategy(
    strategy: StrategyKind,
    results: &[&ExperimentResult],
    wins: usize,
) -> Option<SummaryStatistics> {
    if results.is_empty() {
        return None;
    }
    let n = results.len() as f64;
    let returns: Vec<f64> = results.iter().map(|r| r.return_pct).collect();

    let mean_return = mean(&returns);
    let stdev_return = population_stdev(&returns, mean_return);
    let risk_adjusted_ratio = (stdev_return >= STDEV_EPSILON).then(|| mean_return / stdev_return);

    Some(SummaryStatistics {
        strategy,
        count: results.len(),
        mean_return,
        median_return: median(&returns),
        stdev_return,
        min_return: returns.iter().copied().fold(f64::INFINITY, f64::min),
        max_return: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        success_rate: returns.iter().filter(|r| **r > 0.0).count() as f64 / n,
        risk_adjusted_ratio,
        mean_annualized_return: results.iter().map(|r| r.annualized_return_pct).sum::<f64>() / n,
        mean_invested: results.iter().map(|r| r.total_invested).sum::<f64>() / n,
        mean_final_value: results.iter().map(|r| r.final_value).sum::<f64>() / n,
        wins,
    })
}

/// Best and worst strategy of one experiment, ties to the higher priority.
pub fn compare(experiment: &Experiment) -> Option<ExperimentComparison> {
    let by_priority = |a: &&ExperimentResult, b: &&ExperimentResult| {
        a.strategy.priority().cmp(&b.strategy.priority())
    };
    let best = experiment.results.iter().reduce(|best, r| {
        match r.return_pct.total_cmp(&best.return_pct).then(by_priority(&best, &r)) {
            Ordering::Greater => r,
            _ => best,
        }
    })?;
    let worst = experiment.results.iter().reduce(|worst, r| {
        match r.return_pct.total_cmp(&worst.return_pct).then(by_priority(&r, &worst)) {
            Ordering::Less => r,
            _ => worst,
        }
    })?;
    Some(ExperimentComparison {
        index: experiment.index,
        start_date: experiment.start_date,
        best: best.strategy,
        best_return: best.return_pct,
        worst: worst.strategy,
        worst_return: worst.return_pct,
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_stdev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
