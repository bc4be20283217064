//! dcasim: dollar-cost averaging timing strategy simulator.
//!
//! Hexagonal architecture: simulation core in [`domain`], port traits in
//! [`ports`], concrete implementations in [`adapters`], command line in [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
