//! Simulation core: prices, schedules, execution, experiments, statistics.

pub mod aggregate;
pub mod config_validation;
pub mod error;
pub mod execution;
pub mod experiment;
pub mod position;
pub mod price;
pub mod price_store;
pub mod schedule;
pub mod simulation;
