//! Core domain types and logic.

pub mod table;
pub mod scenario;
pub mod calendar;
pub mod capping;
pub mod total_return;
pub mod portfolio;
pub mod backtest;
pub mod export;
pub mod universe;
pub mod config_validation;
pub mod pipeline;
pub mod error;
