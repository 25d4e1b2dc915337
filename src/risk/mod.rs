//! Risk management for the trading client.
//!
//! Provides:
//! - Per-instrument position and cost-basis tracking
//! - Ratcheting stop-losses that only tighten in the holder's favor
//! - Forced-liquidation detection on stop breaches

mod tracker;

pub use tracker::{LiquidationOrder, PositionState, RiskTracker};

use std::sync::Arc;
use tokio::sync::Mutex;

/// Tracker handle shared by every strategy task. Each task locks it for
/// the duration of its update-and-decide step, which keeps stop-loss and
/// position writes single-writer per cycle.
pub type SharedRiskTracker = Arc<Mutex<RiskTracker>>;
