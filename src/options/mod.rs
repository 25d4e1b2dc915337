//! Options pricing, volatility extraction, and delta hedging.
//!
//! - [`pricing`] — Black-Scholes price/delta and implied volatility
//! - [`vol`] — forward volatility parsed from the news feed
//! - [`hedge`] — desk report, hedge ratios, and the dynamic delta hedge

pub mod hedge;
pub mod pricing;
pub mod vol;

pub use hedge::{DeskReport, HedgeError, HedgeOrder, MaturityBucket, OptionContract, OptionsDesk};
pub use pricing::{black_scholes, implied_volatility, ModelQuote, OptionType, PricingError};
pub use vol::{parse_volatility, VolParseError};
