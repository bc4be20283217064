//! Purchase schedule generation for the DCA timing strategies.
//!
//! The strategy set is closed: every variant is handled by one `match` in
//! [`generate`]. Randomised variants partition the window's trading days into
//! calendar periods (ISO weeks or months) and buy once per period on a
//! uniformly drawn trading day, investing the daily amount times the number of
//! trading days in that period. Partial periods at either edge of the window
//! are kept, so every variant deploys the same total capital.

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyKind {
    Daily,
    WeeklyRandom,
    MonthlyRandom,
}

impl StrategyKind {
    /// Every strategy, in tie-break priority order.
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Daily,
        StrategyKind::WeeklyRandom,
        StrategyKind::MonthlyRandom,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Daily => "Daily",
            StrategyKind::WeeklyRandom => "Weekly Random",
            StrategyKind::MonthlyRandom => "Monthly Random",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            StrategyKind::Daily => "daily",
            StrategyKind::WeeklyRandom => "weekly_random",
            StrategyKind::MonthlyRandom => "monthly_random",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StrategyKind::Daily => "Invests fixed amount every trading day",
            StrategyKind::WeeklyRandom => "Invests weekly amount on one random day per week",
            StrategyKind::MonthlyRandom => "Invests monthly amount on one random day per month",
        }
    }

    /// Fixed tie-break rank, lower wins. Arbitrary, not a quality ordering.
    pub fn priority(&self) -> u8 {
        match self {
            StrategyKind::Daily => 0,
            StrategyKind::WeeklyRandom => 1,
            StrategyKind::MonthlyRandom => 2,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(StrategyKind::Daily),
            "weekly" | "weekly_random" => Ok(StrategyKind::WeeklyRandom),
            "monthly" | "monthly_random" => Ok(StrategyKind::MonthlyRandom),
            other => Err(format!("unknown strategy '{other}'")),
        }
    }
}

/// Invest `amount` on `date`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PurchaseInstruction {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Build the purchase schedule for `kind` over `trading_days` (sorted,
/// distinct). Only the random variants advance `rng`, one draw per period in
/// chronological order.
pub fn generate<R: Rng + ?Sized>(
    kind: StrategyKind,
    trading_days: &[NaiveDate],
    daily_amount: f64,
    rng: &mut R,
) -> Vec<PurchaseInstruction> {
    match kind {
        StrategyKind::Daily => trading_days
            .iter()
            .map(|&date| PurchaseInstruction {
                date,
                amount: daily_amount,
            })
            .collect(),
        StrategyKind::WeeklyRandom => one_per_period(trading_days, daily_amount, rng, |d| {
            let week = d.iso_week();
            (week.year(), week.week())
        }),
        StrategyKind::MonthlyRandom => {
            one_per_period(trading_days, daily_amount, rng, |d| (d.year(), d.month()))
        }
    }
}

fn one_per_period<R, K>(
    trading_days: &[NaiveDate],
    daily_amount: f64,
    rng: &mut R,
    period_key: K,
) -> Vec<PurchaseInstruction>
where
    R: Rng + ?Sized,
    K: Fn(&NaiveDate) -> (i32, u32),
{
    trading_days
        .chunk_by(|a, b| period_key(a) == period_key(b))
        .map(|period| {
            let pick = rng.gen_range(0..period.len());
            PurchaseInstruction {
                date: period[pick],
                amount: daily_amount * period.len() as f64,
            }
        })
        .collect()
}

pub fn total_amount(schedule: &[PurchaseInstruction]) -> f64 {
    schedule.iter().map(|p| p.amount).sum()
}
