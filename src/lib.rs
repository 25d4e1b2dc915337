//! # rit-algo
//!
//! Automated trading strategies for the RIT market simulator's REST API.
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `exchange`: RIT REST API client, gateway trait, and in-memory mock
//! - `risk`: Position state and ratcheting stop-loss tracking
//! - `strategy`: Quoting, basket arbitrage, tender evaluation, and scheduling
//! - `options`: Black-Scholes pricing, news-driven volatility, delta hedging
//! - `utils`: Shared decimal arithmetic helpers

pub mod config;
pub mod exchange;
pub mod options;
pub mod risk;
pub mod strategy;
pub mod utils;

pub use config::Config;
