//! Tender offer evaluation and staged unwind.
//!
//! Accepts a block only when its price clears the touch by the
//! configured edge, then works the block off in stages: a small leading
//! market tranche plus resting limit tranches at successive price
//! improvements, instead of one impact-heavy market order.
//!
//! Only the most recent outstanding offer is evaluated each cycle;
//! older unanswered offers expire untouched.

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::TenderConfig;
use crate::exchange::{
    ExchangeGateway, GatewayResult, InstrumentSnapshot, OrderSide, TenderOffer,
};
use crate::utils::round_to_tick;

use rust_decimal_macros::dec;

const PRICE_TICK: Decimal = dec!(0.01);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenderDecision {
    Accept,
    Decline,
}

/// One resting limit tranche of an unwind plan.
#[derive(Debug, Clone, PartialEq)]
pub struct UnwindTranche {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Staged liquidation of an accepted block.
#[derive(Debug, Clone, PartialEq)]
pub struct UnwindPlan {
    pub ticker: String,
    pub side: OrderSide,
    /// Leading tranche executed at market
    pub market_quantity: Decimal,
    /// Resting tranches at successive price improvements from the touch
    pub limit_tranches: Vec<UnwindTranche>,
}

impl UnwindPlan {
    pub fn total_quantity(&self) -> Decimal {
        self.market_quantity
            + self
                .limit_tranches
                .iter()
                .map(|t| t.quantity)
                .sum::<Decimal>()
    }
}

/// Evaluates tender offers and plans their unwind.
pub struct TenderEvaluator {
    config: TenderConfig,
}

impl TenderEvaluator {
    pub fn new(config: TenderConfig) -> Self {
        Self { config }
    }

    /// The newest outstanding offer; older unanswered ones are dropped.
    pub fn latest_offer(tenders: &[TenderOffer]) -> Option<&TenderOffer> {
        tenders.last()
    }

    /// Accept only on a strict edge over the current touch.
    ///
    /// A SELL offer asks us to sell the client a block at the offered
    /// price: worth taking only if the price clears the ask by more
    /// than the edge threshold. Fixed-bid and variable offers both
    /// compare against the live touch with the same threshold.
    pub fn evaluate(&self, offer: &TenderOffer, snapshot: &InstrumentSnapshot) -> TenderDecision {
        let edge = self.config.edge_threshold;
        let accept = match offer.action {
            OrderSide::Sell => offer.price > snapshot.ask + edge,
            OrderSide::Buy => offer.price < snapshot.bid - edge,
        };

        debug!(
            tender_id = offer.tender_id,
            ticker = %offer.ticker,
            action = %offer.action,
            price = %offer.price,
            bid = %snapshot.bid,
            ask = %snapshot.ask,
            is_fixed_bid = offer.is_fixed_bid,
            accept,
            "Evaluated tender offer"
        );

        if accept {
            TenderDecision::Accept
        } else {
            TenderDecision::Decline
        }
    }

    /// Plan the staged unwind of a signed block against the post-trade
    /// touch. Positive volume is sold off (limit tranches above the
    /// ask), negative volume bought back (below the bid).
    pub fn plan_unwind(
        &self,
        ticker: &str,
        volume: Decimal,
        bid: Decimal,
        ask: Decimal,
    ) -> UnwindPlan {
        let side = if volume > Decimal::ZERO {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        };
        let total = volume.abs();

        let market_quantity = (self.config.market_fraction * total).floor();
        let remainder = total - market_quantity;
        let tranche_count = Decimal::from(self.config.price_increments.len() as u32);
        let per_tranche = (remainder / tranche_count).floor();

        let mut limit_tranches = Vec::with_capacity(self.config.price_increments.len());
        let mut assigned = Decimal::ZERO;
        for (i, increment) in self.config.price_increments.iter().enumerate() {
            // Last tranche absorbs the rounding remainder so the plan
            // sums exactly to the block.
            let quantity = if i + 1 == self.config.price_increments.len() {
                remainder - assigned
            } else {
                assigned += per_tranche;
                per_tranche
            };
            let price = match side {
                OrderSide::Sell => ask + *increment,
                OrderSide::Buy => bid - *increment,
            };
            limit_tranches.push(UnwindTranche {
                price: round_to_tick(price, PRICE_TICK),
                quantity,
            });
        }

        UnwindPlan {
            ticker: ticker.to_string(),
            side,
            market_quantity,
            limit_tranches,
        }
    }

    /// Execute a planned unwind: sweep stale orders, fire the market
    /// tranche, then rest the limit tranches.
    pub async fn execute_unwind<G: ExchangeGateway + ?Sized>(
        &self,
        gateway: &G,
        plan: &UnwindPlan,
    ) -> GatewayResult<()> {
        info!(
            ticker = %plan.ticker,
            side = %plan.side,
            market_quantity = %plan.market_quantity,
            tranches = plan.limit_tranches.len(),
            total = %plan.total_quantity(),
            "Executing staged tender unwind"
        );

        gateway.cancel_all(&plan.ticker).await?;

        if plan.market_quantity > Decimal::ZERO {
            gateway
                .submit_market_order(&plan.ticker, plan.market_quantity, plan.side)
                .await?;
        }
        for tranche in &plan.limit_tranches {
            if tranche.quantity > Decimal::ZERO {
                gateway
                    .submit_limit_order(&plan.ticker, tranche.price, tranche.quantity, plan.side)
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> TenderEvaluator {
        TenderEvaluator::new(TenderConfig {
            edge_threshold: dec!(0.25),
            market_fraction: dec!(0.10),
            price_increments: vec![dec!(0.025), dec!(0.05)],
            settle_threshold: dec!(500),
        })
    }

    fn snapshot(bid: Decimal, ask: Decimal) -> InstrumentSnapshot {
        InstrumentSnapshot {
            ticker: "RIT_C".to_string(),
            bid,
            ask,
            bid_size: dec!(1000),
            ask_size: dec!(1000),
            last: (bid + ask) / dec!(2),
            volume: dec!(0),
            position: dec!(0),
            vwap: dec!(0),
        }
    }

    fn offer(action: OrderSide, price: Decimal) -> TenderOffer {
        TenderOffer {
            tender_id: 1,
            ticker: "RIT_C".to_string(),
            price,
            quantity: dec!(10000),
            action,
            is_fixed_bid: false,
        }
    }

    #[test]
    fn test_sell_offer_at_exact_edge_declined() {
        // ask 25.10 + edge 0.25 = 25.35; strict inequality required
        let decision = evaluator().evaluate(
            &offer(OrderSide::Sell, dec!(25.35)),
            &snapshot(dec!(24.90), dec!(25.10)),
        );
        assert_eq!(decision, TenderDecision::Decline);
    }

    #[test]
    fn test_sell_offer_above_edge_accepted() {
        let decision = evaluator().evaluate(
            &offer(OrderSide::Sell, dec!(25.36)),
            &snapshot(dec!(24.90), dec!(25.10)),
        );
        assert_eq!(decision, TenderDecision::Accept);
    }

    #[test]
    fn test_buy_offer_below_edge_accepted() {
        // bid 24.90 - 0.25 = 24.65
        let decision = evaluator().evaluate(
            &offer(OrderSide::Buy, dec!(24.64)),
            &snapshot(dec!(24.90), dec!(25.10)),
        );
        assert_eq!(decision, TenderDecision::Accept);

        let decision = evaluator().evaluate(
            &offer(OrderSide::Buy, dec!(24.65)),
            &snapshot(dec!(24.90), dec!(25.10)),
        );
        assert_eq!(decision, TenderDecision::Decline);
    }

    #[test]
    fn test_latest_offer_wins() {
        let tenders = vec![
            offer(OrderSide::Buy, dec!(24.00)),
            offer(OrderSide::Sell, dec!(26.00)),
        ];
        let latest = TenderEvaluator::latest_offer(&tenders).unwrap();
        assert_eq!(latest.action, OrderSide::Sell);
    }

    #[test]
    fn test_unwind_plan_splits_long_block() {
        let plan = evaluator().plan_unwind("RIT_C", dec!(10000), dec!(24.90), dec!(25.10));

        assert_eq!(plan.side, OrderSide::Sell);
        assert_eq!(plan.market_quantity, dec!(1000));
        assert_eq!(
            plan.limit_tranches,
            vec![
                UnwindTranche {
                    // ask + 0.025 = 25.125, banker's-rounded to the tick
                    price: dec!(25.12),
                    quantity: dec!(4500),
                },
                UnwindTranche {
                    price: dec!(25.15),
                    quantity: dec!(4500),
                },
            ]
        );
        assert_eq!(plan.total_quantity(), dec!(10000));
    }

    #[test]
    fn test_unwind_plan_buys_back_short_block() {
        let plan = evaluator().plan_unwind("RIT_C", dec!(-10000), dec!(24.90), dec!(25.10));

        assert_eq!(plan.side, OrderSide::Buy);
        assert_eq!(plan.limit_tranches[0].price, dec!(24.88)); // bid - 0.025
        assert_eq!(plan.limit_tranches[1].price, dec!(24.85));
        assert_eq!(plan.total_quantity(), dec!(10000));
    }

    #[test]
    fn test_unwind_plan_sums_exactly_with_rounding() {
        let plan = evaluator().plan_unwind("RIT_C", dec!(9999), dec!(24.90), dec!(25.10));
        // market = floor(999.9) = 999, remainder 9000 split 4500/4500
        assert_eq!(plan.market_quantity, dec!(999));
        assert_eq!(plan.total_quantity(), dec!(9999));
    }

    #[tokio::test]
    async fn test_execute_unwind_cancels_then_stages() {
        use crate::exchange::{MockExchange, OrderType};

        let mock = MockExchange::new();
        let plan = evaluator().plan_unwind("RIT_C", dec!(10000), dec!(24.90), dec!(25.10));
        evaluator().execute_unwind(&mock, &plan).await.unwrap();

        let submitted = mock.submitted_orders().await;
        assert_eq!(submitted.len(), 3);
        assert_eq!(submitted[0].order_type, OrderType::Market);
        assert_eq!(submitted[0].quantity, dec!(1000));
        assert_eq!(submitted[1].order_type, OrderType::Limit);
        assert_eq!(submitted[2].order_type, OrderType::Limit);
        assert!(submitted.iter().all(|o| o.side == OrderSide::Sell));
    }
}
