//! Trading strategy implementation.
//!
//! Contains the core logic for:
//! - Inventory-skewed market-making quotes
//! - Synthetic-basket vs composite arbitrage
//! - Tender offer evaluation and staged unwind
//! - The concurrent polling scheduler tying the tasks together

mod arbitrage;
mod quoting;
mod scheduler;
mod tender;

pub use arbitrage::{touches, ArbAction, ArbDirection, ArbError, ArbitrageDetector, TouchMap};
pub use quoting::{QuoteDecision, QuotingEngine};
pub use scheduler::{StrategyScheduler, StrategyToggles};
pub use tender::{TenderDecision, TenderEvaluator, UnwindPlan, UnwindTranche};
