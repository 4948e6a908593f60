//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod ledger;
pub mod price;
pub mod scheduler;
pub mod strategy;
pub mod transaction;
