//! NNTE rule builder and signal dashboard client
//!
//! Talks to the trading-signal REST backend: authors MACD comparison rules,
//! keeps the rule list in sync with optimistic toggles, and polls live
//! signals on a fixed interval.

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod rules;
pub mod services;
