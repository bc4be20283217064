//! Schedule execution and end-of-window valuation.
//!
//! Each instruction's amount is split equally across the symbols in scope and
//! converted into fractional shares at the snapped price for its date. Any
//! price that cannot be resolved aborts execution with a `DataGap`; no purchase
//! is ever skipped.

use chrono::NaiveDate;

use super::error::DcasimError;
use super::position::{Fill, Position};
use super::price_store::PriceStore;
use super::schedule::PurchaseInstruction;

/// Per-symbol breakdown of a valued position.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub symbol: String,
    pub shares: f64,
    pub cost_basis: f64,
    pub avg_buy_price: f64,
    pub final_price: f64,
    pub final_value: f64,
    pub return_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    /// Trading day the window end snapped to.
    pub date: NaiveDate,
    pub final_value: f64,
    pub holdings: Vec<Holding>,
}

/// Execute `schedule` in date order against `store`, buying every symbol in
/// `symbols` on every instruction.
pub fn execute(
    schedule: &[PurchaseInstruction],
    symbols: &[String],
    store: &PriceStore,
) -> Result<Position, DcasimError> {
    if symbols.is_empty() {
        return Err(DcasimError::invalid(
            "data",
            "ticker",
            "no symbols in scope for execution",
        ));
    }

    let mut ordered: Vec<&PurchaseInstruction> = schedule.iter().collect();
    ordered.sort_by_key(|p| p.date);

    let mut position = Position::new();
    let per_symbol_share = 1.0 / symbols.len() as f64;

    for instruction in ordered {
        let split_amount = instruction.amount * per_symbol_share;
        for symbol in symbols {
            let quote = store.price_at_or_before(symbol, instruction.date)?;
            position.record_fill(Fill {
                requested: instruction.date,
                priced: quote.date,
                symbol: symbol.clone(),
                price: quote.price,
                shares: split_amount / quote.price,
                amount: split_amount,
            });
        }
    }

    Ok(position)
}

/// Value every holding at the snapped price for `end_date`.
pub fn value_position(
    position: &Position,
    store: &PriceStore,
    end_date: NaiveDate,
) -> Result<Valuation, DcasimError> {
    let mut holdings = Vec::with_capacity(position.symbol_count());
    let mut final_value = 0.0;

    for (symbol, shares) in position.holdings() {
        let quote = store.price_at_or_before(symbol, end_date)?;
        let cost_basis = position.invested(symbol);
        let value = shares * quote.price;
        final_value += value;

        holdings.push(Holding {
            symbol: symbol.to_string(),
            shares,
            cost_basis,
            avg_buy_price: if shares > 0.0 { cost_basis / shares } else { 0.0 },
            final_price: quote.price,
            final_value: value,
            return_pct: if cost_basis > 0.0 {
                (value / cost_basis - 1.0) * 100.0
            } else {
                0.0
            },
        });
    }

    let date = store.snap_to_trading_day(end_date).unwrap_or(end_date);

    Ok(Valuation {
        date,
        final_value,
        holdings,
    })
}
