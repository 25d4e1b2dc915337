//! Synthetic-basket vs composite arbitrage.
//!
//! Compares the sum of the basket legs against the composite instrument
//! and trades the whole leg set when the mispricing clears the fee
//! buffer. One position per basket definition; legs are entered and
//! unwound as a set.

use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, info};

use crate::config::ArbitrageConfig;
use crate::exchange::{ExchangeGateway, GatewayError, InstrumentSnapshot, OrderSide};

/// Best bid/ask per ticker, pulled from the cycle's snapshot.
pub type TouchMap = HashMap<String, (Decimal, Decimal)>;

/// Build the touch map from a securities snapshot.
pub fn touches(snapshots: &[InstrumentSnapshot]) -> TouchMap {
    snapshots
        .iter()
        .map(|s| (s.ticker.clone(), (s.bid, s.ask)))
        .collect()
}

#[derive(Debug, Error)]
pub enum ArbError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A leg order failed mid-sequence, leaving a partially hedged
    /// basket. The detector latches inconsistent and refuses further
    /// trading on this basket; reconciliation is manual.
    #[error("partial basket execution: {executed} of {total} legs filled")]
    PartialExecution { executed: usize, total: usize },
}

/// Which way the basket trade goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbDirection {
    /// Composite overpriced: buy every leg, sell the composite.
    SellComposite,
    /// Composite underpriced: buy the composite, sell every leg.
    BuyComposite,
}

/// Decision for this cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ArbAction {
    Enter {
        direction: ArbDirection,
        spread: Decimal,
    },
    Unwind {
        spread: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum BasketState {
    Flat,
    Entered {
        direction: ArbDirection,
        entry_spread: Decimal,
        unwind_legs: Vec<(String, OrderSide)>,
    },
    /// Terminal until restart; see `ArbError::PartialExecution`.
    Inconsistent,
}

/// State machine over one basket definition: Flat -> Entered -> Flat.
pub struct ArbitrageDetector {
    config: ArbitrageConfig,
    state: BasketState,
}

impl ArbitrageDetector {
    pub fn new(config: ArbitrageConfig) -> Self {
        Self {
            config,
            state: BasketState::Flat,
        }
    }

    /// Entry threshold net of round-trip fees on every leg plus the
    /// composite.
    pub fn min_diff(&self) -> Decimal {
        let legs = Decimal::from(self.config.legs.len() as u32 + 1);
        self.config.threshold + legs * self.config.per_trade_fee
    }

    pub fn is_inconsistent(&self) -> bool {
        self.state == BasketState::Inconsistent
    }

    pub fn has_open_position(&self) -> bool {
        matches!(self.state, BasketState::Entered { .. })
    }

    /// Decide this cycle's action from the current touch prices.
    /// Returns None when a needed quote is missing or nothing triggers.
    pub fn evaluate(&self, touches: &TouchMap) -> Option<ArbAction> {
        let (composite_bid, composite_ask) = *touches.get(&self.config.composite)?;

        let mut synthetic_bid = Decimal::ZERO;
        let mut synthetic_ask = Decimal::ZERO;
        for leg in &self.config.legs {
            let (bid, ask) = *touches.get(leg)?;
            synthetic_bid += bid;
            synthetic_ask += ask;
        }

        match &self.state {
            BasketState::Inconsistent => None,
            BasketState::Entered { .. } => {
                let spread = composite_bid - synthetic_ask;
                if spread.abs() < self.config.convergence_gap {
                    Some(ArbAction::Unwind { spread })
                } else {
                    None
                }
            }
            BasketState::Flat => {
                let min_diff = self.min_diff();
                let over = composite_bid - synthetic_ask;
                let under = synthetic_bid - composite_ask;

                if over > min_diff {
                    Some(ArbAction::Enter {
                        direction: ArbDirection::SellComposite,
                        spread: over,
                    })
                } else if under > min_diff {
                    Some(ArbAction::Enter {
                        direction: ArbDirection::BuyComposite,
                        spread: under,
                    })
                } else {
                    None
                }
            }
        }
    }

    /// Leg orders for an entry, in execution order, with the recorded
    /// unwind set (exact opposite actions on the same legs).
    fn entry_orders(
        &self,
        direction: ArbDirection,
    ) -> (Vec<(String, OrderSide)>, Vec<(String, OrderSide)>) {
        let mut orders = Vec::new();
        match direction {
            ArbDirection::SellComposite => {
                for leg in &self.config.legs {
                    orders.push((leg.clone(), OrderSide::Buy));
                }
                orders.push((self.config.composite.clone(), OrderSide::Sell));
            }
            ArbDirection::BuyComposite => {
                orders.push((self.config.composite.clone(), OrderSide::Buy));
                for leg in &self.config.legs {
                    orders.push((leg.clone(), OrderSide::Sell));
                }
            }
        }
        let unwind = orders
            .iter()
            .map(|(ticker, side)| (ticker.clone(), side.opposite()))
            .collect();
        (orders, unwind)
    }

    /// Execute a decided action through the gateway, advancing the
    /// state machine. There is no atomicity across legs: a failure
    /// partway latches the basket inconsistent rather than retrying.
    pub async fn execute<G: ExchangeGateway + ?Sized>(
        &mut self,
        gateway: &G,
        action: ArbAction,
    ) -> Result<(), ArbError> {
        match action {
            ArbAction::Enter { direction, spread } => {
                let (orders, unwind_legs) = self.entry_orders(direction);
                info!(?direction, %spread, min_diff = %self.min_diff(), "Entering basket arbitrage");

                self.run_legs(gateway, &orders).await?;

                self.state = BasketState::Entered {
                    direction,
                    entry_spread: spread,
                    unwind_legs,
                };
                Ok(())
            }
            ArbAction::Unwind { spread } => {
                let (legs, direction, entry_spread) = match &self.state {
                    BasketState::Entered {
                        unwind_legs,
                        direction,
                        entry_spread,
                    } => (unwind_legs.clone(), *direction, *entry_spread),
                    _ => return Ok(()),
                };
                info!(?direction, %spread, %entry_spread, "Spread reconverged, unwinding basket");

                self.run_legs(gateway, &legs).await?;

                self.state = BasketState::Flat;
                Ok(())
            }
        }
    }

    async fn run_legs<G: ExchangeGateway + ?Sized>(
        &mut self,
        gateway: &G,
        legs: &[(String, OrderSide)],
    ) -> Result<(), ArbError> {
        for (executed, (ticker, side)) in legs.iter().enumerate() {
            if let Err(e) = gateway
                .submit_market_order(ticker, self.config.quantity, *side)
                .await
            {
                self.state = BasketState::Inconsistent;
                error!(
                    %ticker,
                    side = %side,
                    error = %e,
                    executed,
                    total = legs.len(),
                    "Leg order failed mid-basket; latching inconsistent state for manual reconciliation"
                );
                return Err(ArbError::PartialExecution {
                    executed,
                    total: legs.len(),
                });
            }
        }
        Ok(())
    }
}
