//! Core domain types and logic.

pub mod price_bar;
pub mod snapshot;
pub mod history;
pub mod anomaly;
pub mod indicator;
pub mod rule;
pub mod rule_eval;
pub mod catalog;
pub mod backtest;
pub mod regime;
pub mod diversity;
pub mod selector;
pub mod report;
pub mod config;
pub mod config_validation;
pub mod pipeline;
pub mod error;
