//! Markdown table formatting for simulation reports.

use crate::domain::aggregate::{Summary, SummaryStatistics};
use crate::domain::experiment::Experiment;
use crate::domain::schedule::StrategyKind;
use crate::domain::simulation::{DroppedExperiment, SimulationReport};

/// `1234.5` -> `1,234.50`.
pub fn format_money(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}.{frac}")
}

pub fn format_ratio(ratio: Option<f64>) -> String {
    ratio.map_or_else(|| "N/A".to_string(), |r| format!("{r:.3}"))
}

pub fn format_parameters(report: &SimulationReport<'_>) -> String {
    let config = report.config;
    let mut out = String::new();
    out.push_str("| Parameter | Value |\n");
    out.push_str("|-----------|-------|\n");
    out.push_str(&format!(
        "| Number of Experiments | {} |\n",
        report.outcome.requested()
    ));
    out.push_str(&format!(
        "| Duration per Experiment | {} days |\n",
        config.duration_days
    ));
    out.push_str(&format!(
        "| Daily Investment | {} |\n",
        format_money(config.daily_investment)
    ));
    out.push_str(&format!(
        "| Capital Basis | {} |\n",
        config.capital_basis.as_str()
    ));
    out.push_str(&format!("| Price Column Used | {} |\n", config.price_column));
    out.push_str(&format!("| Stock(s) | {} |\n", config.universe));
    out.push_str(&format!(
        "| Seed | {} |\n",
        config
            .seed
            .map_or_else(|| "entropy".to_string(), |s| s.to_string())
    ));
    out.push_str(&format!(
        "| Data | {} ({} symbols, {} to {}) |\n",
        report.data_source, report.symbol_count, report.first_date, report.last_date
    ));
    out
}

pub fn format_strategy_summary(summary: &Summary) -> String {
    if summary.ranking.is_empty() {
        return "_No strategy results._\n".to_string();
    }

    let mut out = String::new();
    out.push_str(
        "| Rank | Strategy | Avg Return | Best | Worst | Std Dev | Success Rate | Risk/Return |\n",
    );
    out.push_str(
        "|------|----------|------------|------|-------|---------|--------------|-------------|\n",
    );
    for (rank, kind) in summary.ranking.iter().enumerate() {
        let Some(stats) = summary.statistics(*kind) else {
            continue;
        };
        out.push_str(&format!(
            "| {} | **{}** | **{:+.2}%** | {:+.2}% | {:+.2}% | {:.2}% | {:.1}% | {} |\n",
            rank + 1,
            stats.strategy.name(),
            stats.mean_return,
            stats.max_return,
            stats.min_return,
            stats.stdev_return,
            stats.success_rate * 100.0,
            format_ratio(stats.risk_adjusted_ratio),
        ));
    }
    out
}

pub fn format_strategy_detail(stats: &SummaryStatistics) -> String {
    let profitable = (stats.success_rate * stats.count as f64).round() as usize;
    let mut out = format!(
        "### {}\n\n{}\n\n| Metric | Value |\n|--------|-------|\n",
        stats.strategy.name(),
        stats.strategy.description()
    );
    out.push_str(&format!("| Average Return | {:+.2}% |\n", stats.mean_return));
    out.push_str(&format!("| Median Return | {:+.2}% |\n", stats.median_return));
    out.push_str(&format!(
        "| Annualized Return | {:+.2}% |\n",
        stats.mean_annualized_return
    ));
    out.push_str(&format!("| Standard Deviation | {:.2}% |\n", stats.stdev_return));
    out.push_str(&format!("| Best Performance | {:+.2}% |\n", stats.max_return));
    out.push_str(&format!("| Worst Performance | {:+.2}% |\n", stats.min_return));
    out.push_str(&format!(
        "| Success Rate | {:.1}% ({}/{}) |\n",
        stats.success_rate * 100.0,
        profitable,
        stats.count
    ));
    out.push_str(&format!(
        "| Average Invested | {} |\n",
        format_money(stats.mean_invested)
    ));
    out.push_str(&format!(
        "| Average Final Value | {} |\n",
        format_money(stats.mean_final_value)
    ));
    out.push_str(&format!(
        "| Risk-Adjusted Return | {} |\n",
        format_ratio(stats.risk_adjusted_ratio)
    ));
    out.push_str(&format!("| Experiments Won | {} |\n", stats.wins));
    out
}

pub fn format_experiment_table(experiments: &[Experiment], summary: &Summary) -> String {
    if experiments.is_empty() {
        return "_No completed experiments._\n".to_string();
    }

    let mut out = String::from("| # | Start Date | End Date |");
    for kind in StrategyKind::ALL {
        out.push_str(&format!(" {} |", kind.name()));
    }
    out.push_str(" Best Strategy |\n|---|------------|----------|");
    for _ in StrategyKind::ALL {
        out.push_str("------|");
    }
    out.push_str("---------------|\n");

    for exp in experiments {
        out.push_str(&format!(
            "| {} | {} | {} |",
            exp.index + 1,
            exp.start_date.format("%Y-%m-%d"),
            exp.end_date.format("%Y-%m-%d")
        ));
        for kind in StrategyKind::ALL {
            match exp.result(kind) {
                Some(r) => out.push_str(&format!(" {:+.2}% |", r.return_pct)),
                None => out.push_str(" N/A |"),
            }
        }
        match summary.comparisons.iter().find(|c| c.index == exp.index) {
            Some(c) => out.push_str(&format!(" {} ({:+.2}%) |\n", c.best.name(), c.best_return)),
            None => out.push_str(" N/A |\n"),
        }
    }
    out
}

pub fn format_dropped(dropped: &[DroppedExperiment]) -> String {
    if dropped.is_empty() {
        return String::new();
    }
    let mut out = String::from("| # | Attempts | Reason |\n|---|----------|--------|\n");
    for d in dropped {
        out.push_str(&format!("| {} | {} | {} |\n", d.index + 1, d.attempts, d.reason));
    }
    out
}
