//! Exchange gateway for the RIT simulator.
//!
//! Provides REST connectivity for:
//! - Market data (case clock, securities, order book, news)
//! - Trading (market/limit orders with clip splitting, cancels, tenders)
//!
//! Strategies depend only on the `ExchangeGateway` trait; the in-memory
//! `MockExchange` stands in for the live client in tests.

mod client;
mod error;
pub mod mock;
mod traits;
mod types;

pub use client::RitClient;
pub use error::{GatewayError, GatewayResult};
pub use mock::MockExchange;
pub use traits::ExchangeGateway;
pub use types::*;
