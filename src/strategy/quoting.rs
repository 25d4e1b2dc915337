//! Inventory-skewed market-making quotes.
//!
//! One configurable engine replaces the pile of near-identical
//! market-maker variants: spread multiplier, inventory multiplier,
//! minimum spread, and size are all parameters.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

use crate::config::QuotingConfig;
use crate::exchange::{ExchangeGateway, GatewayResult, InstrumentSnapshot, OrderSide};
use crate::utils::{round_to_tick, safe_div};

const PRICE_TICK: Decimal = dec!(0.01);

/// What to publish for one ticker this cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteDecision {
    /// Replace both sides of the book.
    TwoSided {
        bid: Decimal,
        ask: Decimal,
        bid_qty: Decimal,
        ask_qty: Decimal,
    },
    /// Book too tight to quote profitably; work residual inventory off
    /// with a single near-touch limit order instead.
    Liquidate {
        side: OrderSide,
        price: Decimal,
        quantity: Decimal,
    },
}

/// Computes quote replacements from the current snapshot and inventory.
pub struct QuotingEngine {
    config: QuotingConfig,
}

impl QuotingEngine {
    pub fn new(config: QuotingConfig) -> Self {
        Self { config }
    }

    pub fn tickers(&self) -> &[String] {
        &self.config.tickers
    }

    /// Decide this cycle's quotes for one ticker.
    ///
    /// A positive (long) inventory pushes the skewed mid down, biasing
    /// fills toward selling the book flat; short inventory mirrors.
    /// Quoted size shrinks linearly as same-side inventory grows and
    /// floors at zero so a quote never adds to an extreme position.
    pub fn quote(
        &self,
        snapshot: &InstrumentSnapshot,
        position: Decimal,
        gross_limit: Decimal,
    ) -> Option<QuoteDecision> {
        let spread = snapshot.spread();

        if spread <= self.config.min_spread {
            if position == Decimal::ZERO {
                return None;
            }
            // Degrade to a one-sided liquidation order at a near-touch price.
            let (side, price) = if position > Decimal::ZERO {
                (
                    OrderSide::Sell,
                    snapshot.ask - self.config.liquidation_edge,
                )
            } else {
                (OrderSide::Buy, snapshot.bid + self.config.liquidation_edge)
            };
            return Some(QuoteDecision::Liquidate {
                side,
                price: round_to_tick(price, PRICE_TICK),
                quantity: position.abs(),
            });
        }

        let inventory_fraction = safe_div(position, gross_limit);
        let skew = inventory_fraction * self.config.inventory_multiplier;
        let skewed_mid = snapshot.mid() * (Decimal::ONE - skew);
        let half_spread = spread * self.config.spread_multiplier / Decimal::TWO;

        let base_qty = self.config.position_size * Decimal::from(self.config.num_clips);
        let long_fraction = safe_div(position.max(Decimal::ZERO), gross_limit);
        let short_fraction = safe_div((-position).max(Decimal::ZERO), gross_limit);
        let bid_qty = (base_qty * (Decimal::ONE - long_fraction)).max(Decimal::ZERO);
        let ask_qty = (base_qty * (Decimal::ONE - short_fraction)).max(Decimal::ZERO);

        Some(QuoteDecision::TwoSided {
            bid: round_to_tick(skewed_mid - half_spread, PRICE_TICK),
            ask: round_to_tick(skewed_mid + half_spread, PRICE_TICK),
            bid_qty,
            ask_qty,
        })
    }

    /// Cancel-then-replace for one ticker.
    ///
    /// The cancel must fully succeed before any replacement is posted;
    /// a cancel failure aborts this ticker's republish for the cycle
    /// rather than risking duplicate exposure.
    pub async fn republish<G: ExchangeGateway + ?Sized>(
        &self,
        gateway: &G,
        ticker: &str,
        decision: &QuoteDecision,
    ) -> GatewayResult<()> {
        if let Err(e) = gateway.cancel_all(ticker).await {
            warn!(%ticker, error = %e, "Cancel failed, aborting republish");
            return Err(e);
        }

        match decision {
            QuoteDecision::TwoSided {
                bid,
                ask,
                bid_qty,
                ask_qty,
            } => {
                info!(%ticker, %bid, %ask, %bid_qty, %ask_qty, "Publishing two-sided quote");
                if *bid_qty > Decimal::ZERO {
                    gateway
                        .submit_limit_order(ticker, *bid, *bid_qty, OrderSide::Buy)
                        .await?;
                }
                if *ask_qty > Decimal::ZERO {
                    gateway
                        .submit_limit_order(ticker, *ask, *ask_qty, OrderSide::Sell)
                        .await?;
                }
            }
            QuoteDecision::Liquidate {
                side,
                price,
                quantity,
            } => {
                info!(%ticker, side = %side, %price, %quantity, "Working inventory with liquidation quote");
                gateway
                    .submit_limit_order(ticker, *price, *quantity, *side)
                    .await?;
            }
        }

        debug!(%ticker, "Republish complete");
        Ok(())
    }
}
