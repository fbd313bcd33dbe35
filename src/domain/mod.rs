//! Core domain types and logic.

pub mod config_validation;
pub mod dashboard;
pub mod error;
pub mod forecast;
pub mod indicator;
pub mod indicator_engine;
pub mod market;
pub mod market_data;
pub mod ohlcv;
pub mod signals;
pub mod ticker;
