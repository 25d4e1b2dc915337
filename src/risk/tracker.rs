//! Position state and ratcheting stop-loss tracking.
//!
//! One tracker instance is shared by every strategy task. Each poll
//! cycle it absorbs the fresh snapshot, tightens stop-losses in the
//! holder's favor, and reports any breach as a forced liquidation
//! instruction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::{RiskConfig, StopLossMode};
use crate::exchange::{InstrumentSnapshot, OrderSide};

/// Tracked state for one instrument with a non-zero position.
#[derive(Debug, Clone)]
pub struct PositionState {
    pub ticker: String,
    /// Signed net volume
    pub volume: Decimal,
    /// Volume-weighted average cost
    pub cost_basis: Decimal,
    /// Best bid at the last update
    pub bid: Decimal,
    /// Best ask at the last update
    pub ask: Decimal,
    /// Ratcheting stop price; never loosens while the sign holds
    pub stop_loss: Decimal,
    /// When this state last absorbed a snapshot
    pub updated_at: DateTime<Utc>,
}

/// Market order instruction that flattens a breached position.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationOrder {
    pub ticker: String,
    pub quantity: Decimal,
    pub side: OrderSide,
}

/// Maintains per-instrument position state and stop-losses.
pub struct RiskTracker {
    config: RiskConfig,
    positions: HashMap<String, PositionState>,
}

impl RiskTracker {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            positions: HashMap::new(),
        }
    }

    /// Stop price for a fresh position at the given market price.
    /// Long stops sit below the price, short stops above.
    pub fn calc_stop_loss(&self, price: Decimal, position: Decimal) -> Decimal {
        match self.config.stop_mode {
            StopLossMode::FixedOffset => {
                if position > Decimal::ZERO {
                    price - self.config.stop_offset
                } else {
                    price + self.config.stop_offset
                }
            }
            StopLossMode::PercentOfPrice => {
                if position > Decimal::ZERO {
                    price * (Decimal::ONE - self.config.stop_pct)
                } else {
                    price * (Decimal::ONE + self.config.stop_pct)
                }
            }
        }
    }

    /// Absorb one poll cycle's snapshots.
    ///
    /// Sign flips (including through zero) recompute the stop from
    /// scratch at the current price; a held long only raises its stop,
    /// a held short only lowers it. Flat positions are dropped.
    pub fn update(&mut self, snapshots: &[InstrumentSnapshot]) {
        for snap in snapshots {
            let volume = snap.position;

            if volume == Decimal::ZERO {
                if self.positions.remove(&snap.ticker).is_some() {
                    debug!(ticker = %snap.ticker, "Position flat, cleared state");
                }
                continue;
            }

            let fresh = self.calc_stop_loss(snap.last, volume);

            let stop_loss = match self.positions.get(&snap.ticker) {
                Some(prev) => {
                    let flipped = (prev.volume >= Decimal::ZERO && volume < Decimal::ZERO)
                        || (prev.volume <= Decimal::ZERO && volume > Decimal::ZERO);
                    if flipped {
                        debug!(
                            ticker = %snap.ticker,
                            prev_volume = %prev.volume,
                            volume = %volume,
                            stop_loss = %fresh,
                            "Position sign flipped, stop recomputed"
                        );
                        fresh
                    } else if volume > Decimal::ZERO {
                        prev.stop_loss.max(fresh)
                    } else {
                        prev.stop_loss.min(fresh)
                    }
                }
                None => fresh,
            };

            self.positions.insert(
                snap.ticker.clone(),
                PositionState {
                    ticker: snap.ticker.clone(),
                    volume,
                    cost_basis: snap.vwap,
                    bid: snap.bid,
                    ask: snap.ask,
                    stop_loss,
                    updated_at: Utc::now(),
                },
            );
        }
    }

    /// Seed the stop for a block acquired via tender, anchored at the
    /// worse of cost basis and the offset touch.
    pub fn seed_block_stop(&mut self, ticker: &str, cost: Decimal) {
        if let Some(state) = self.positions.get_mut(ticker) {
            state.stop_loss = if state.volume > Decimal::ZERO {
                cost.max(state.bid - self.config.stop_offset)
            } else {
                cost.min(state.ask + self.config.stop_offset)
            };
            debug!(%ticker, stop_loss = %state.stop_loss, "Seeded block stop");
        }
    }

    /// Scan for stop breaches: long and bid through the stop, or short
    /// and ask through it. Emits at most one instruction per ticker per
    /// call; a failed liquidation is re-detected on the next cycle.
    pub fn check_losses(&self) -> Vec<LiquidationOrder> {
        let mut orders = Vec::new();

        for state in self.positions.values() {
            let breached = if state.volume > Decimal::ZERO {
                state.bid < state.stop_loss
            } else {
                state.ask > state.stop_loss
            };

            if breached {
                let side = if state.volume > Decimal::ZERO {
                    OrderSide::Sell
                } else {
                    OrderSide::Buy
                };
                warn!(
                    ticker = %state.ticker,
                    volume = %state.volume,
                    stop_loss = %state.stop_loss,
                    bid = %state.bid,
                    ask = %state.ask,
                    "Stop-loss breached, forcing liquidation"
                );
                orders.push(LiquidationOrder {
                    ticker: state.ticker.clone(),
                    quantity: state.volume.abs(),
                    side,
                });
            }
        }

        orders
    }

    /// Signed position for a ticker, zero if untracked.
    pub fn position(&self, ticker: &str) -> Decimal {
        self.positions
            .get(ticker)
            .map(|s| s.volume)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn state(&self, ticker: &str) -> Option<&PositionState> {
        self.positions.get(ticker)
    }

    /// Sum of absolute position sizes across instruments.
    pub fn gross_exposure(&self) -> Decimal {
        self.positions.values().map(|s| s.volume.abs()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot(ticker: &str, bid: Decimal, ask: Decimal, last: Decimal, position: Decimal) -> InstrumentSnapshot {
        InstrumentSnapshot {
            ticker: ticker.to_string(),
            bid,
            ask,
            bid_size: dec!(1000),
            ask_size: dec!(1000),
            last,
            volume: dec!(0),
            position,
            vwap: last,
        }
    }

    fn tracker() -> RiskTracker {
        RiskTracker::new(RiskConfig {
            stop_mode: StopLossMode::FixedOffset,
            stop_offset: dec!(0.10),
            stop_pct: dec!(0.0025),
        })
    }

    #[test]
    fn test_long_stop_ratchets_up_only() {
        let mut tracker = tracker();

        tracker.update(&[snapshot("RIT_C", dec!(24.9), dec!(25.1), dec!(25.0), dec!(5000))]);
        assert_eq!(tracker.state("RIT_C").unwrap().stop_loss, dec!(24.90));

        // Price rises, stop tightens up
        tracker.update(&[snapshot("RIT_C", dec!(25.4), dec!(25.6), dec!(25.5), dec!(5000))]);
        assert_eq!(tracker.state("RIT_C").unwrap().stop_loss, dec!(25.40));

        // Price falls back, stop holds
        tracker.update(&[snapshot("RIT_C", dec!(25.0), dec!(25.2), dec!(25.1), dec!(5000))]);
        assert_eq!(tracker.state("RIT_C").unwrap().stop_loss, dec!(25.40));
    }

    #[test]
    fn test_short_stop_ratchets_down_only() {
        let mut tracker = tracker();

        tracker.update(&[snapshot("RIT_C", dec!(24.9), dec!(25.1), dec!(25.0), dec!(-5000))]);
        assert_eq!(tracker.state("RIT_C").unwrap().stop_loss, dec!(25.10));

        tracker.update(&[snapshot("RIT_C", dec!(24.4), dec!(24.6), dec!(24.5), dec!(-5000))]);
        assert_eq!(tracker.state("RIT_C").unwrap().stop_loss, dec!(24.60));

        tracker.update(&[snapshot("RIT_C", dec!(24.9), dec!(25.1), dec!(25.0), dec!(-5000))]);
        assert_eq!(tracker.state("RIT_C").unwrap().stop_loss, dec!(24.60));
    }

    #[test]
    fn test_sign_flip_recomputes_fresh() {
        let mut tracker = tracker();

        tracker.update(&[snapshot("RIT_C", dec!(51.9), dec!(52.1), dec!(52.0), dec!(5000))]);
        assert_eq!(tracker.state("RIT_C").unwrap().stop_loss, dec!(51.90));

        // Flips from +5000 to -2000 at price 48: fresh short stop at 48.10,
        // not a min against the stale long-side value.
        tracker.update(&[snapshot("RIT_C", dec!(47.9), dec!(48.1), dec!(48.0), dec!(-2000))]);
        assert_eq!(tracker.state("RIT_C").unwrap().stop_loss, dec!(48.10));
    }

    #[test]
    fn test_flat_position_clears_state() {
        let mut tracker = tracker();

        tracker.update(&[snapshot("RIT_C", dec!(24.9), dec!(25.1), dec!(25.0), dec!(5000))]);
        assert!(tracker.state("RIT_C").is_some());

        tracker.update(&[snapshot("RIT_C", dec!(24.9), dec!(25.1), dec!(25.0), dec!(0))]);
        assert!(tracker.state("RIT_C").is_none());
        assert_eq!(tracker.position("RIT_C"), dec!(0));
    }

    #[test]
    fn test_check_losses_long_breach() {
        let mut tracker = tracker();

        tracker.update(&[snapshot("RIT_C", dec!(24.9), dec!(25.1), dec!(25.0), dec!(5000))]);
        // Bid drops through the 24.90 stop
        tracker.update(&[snapshot("RIT_C", dec!(24.5), dec!(24.7), dec!(24.6), dec!(5000))]);

        let orders = tracker.check_losses();
        assert_eq!(
            orders,
            vec![LiquidationOrder {
                ticker: "RIT_C".to_string(),
                quantity: dec!(5000),
                side: OrderSide::Sell,
            }]
        );
    }

    #[test]
    fn test_check_losses_short_breach() {
        let mut tracker = tracker();

        tracker.update(&[snapshot("RIT_C", dec!(24.9), dec!(25.1), dec!(25.0), dec!(-3000))]);
        tracker.update(&[snapshot("RIT_C", dec!(25.3), dec!(25.5), dec!(25.4), dec!(-3000))]);

        let orders = tracker.check_losses();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, OrderSide::Buy);
        assert_eq!(orders[0].quantity, dec!(3000));
    }

    #[test]
    fn test_no_breach_no_orders() {
        let mut tracker = tracker();

        tracker.update(&[snapshot("RIT_C", dec!(24.9), dec!(25.1), dec!(25.0), dec!(5000))]);
        assert!(tracker.check_losses().is_empty());
    }

    #[test]
    fn test_percent_mode_stop() {
        let tracker = RiskTracker::new(RiskConfig {
            stop_mode: StopLossMode::PercentOfPrice,
            stop_offset: dec!(0.10),
            stop_pct: dec!(0.01),
        });
        assert_eq!(tracker.calc_stop_loss(dec!(100), dec!(1)), dec!(99.00));
        assert_eq!(tracker.calc_stop_loss(dec!(100), dec!(-1)), dec!(101.00));
    }

    #[test]
    fn test_gross_exposure_sums_absolute() {
        let mut tracker = tracker();
        tracker.update(&[
            snapshot("HAWK", dec!(9.9), dec!(10.1), dec!(10.0), dec!(2000)),
            snapshot("DOVE", dec!(14.9), dec!(15.1), dec!(15.0), dec!(-3000)),
        ]);
        assert_eq!(tracker.gross_exposure(), dec!(5000));
    }
}
