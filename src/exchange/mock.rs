//! In-memory exchange for strategy tests.
//!
//! Scripts quotes, tenders, and news; records every order the strategies
//! submit so tests can assert on the exact instruction sequence. Failure
//! injection covers the cancel-before-replace abort path.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::error::{GatewayError, GatewayResult};
use super::traits::ExchangeGateway;
use super::types::*;

/// One submitted order as the mock recorded it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedOrder {
    pub ticker: String,
    pub order_type: OrderType,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
}

#[derive(Debug, Default)]
struct MockState {
    case: Option<CaseStatus>,
    securities: Vec<InstrumentSnapshot>,
    limits: Option<TradingLimits>,
    tenders: Vec<TenderOffer>,
    news: Vec<NewsItem>,
    books: HashMap<String, OrderBook>,
    open_orders: HashMap<u64, OpenOrder>,
    submitted: Vec<SubmittedOrder>,
    cancelled: Vec<u64>,
    accepted_tenders: Vec<u64>,
    fail_cancels: bool,
    market_orders_before_failure: Option<u32>,
}

/// Mock gateway with scriptable state.
#[derive(Default)]
pub struct MockExchange {
    state: Arc<RwLock<MockState>>,
    order_id_counter: AtomicU64,
}

impl MockExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_case(&self, tick: u32, period: u32, ticks_per_period: u32) {
        self.state.write().await.case = Some(CaseStatus {
            tick,
            period,
            ticks_per_period,
        });
    }

    /// Install or replace an instrument snapshot.
    pub async fn set_security(&self, snapshot: InstrumentSnapshot) {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .securities
            .iter_mut()
            .find(|s| s.ticker == snapshot.ticker)
        {
            *existing = snapshot;
        } else {
            state.securities.push(snapshot);
        }
    }

    pub async fn set_limits(&self, gross_limit: Decimal, net_limit: Decimal) {
        self.state.write().await.limits = Some(TradingLimits {
            gross_limit,
            net_limit,
        });
    }

    pub async fn push_tender(&self, tender: TenderOffer) {
        self.state.write().await.tenders.push(tender);
    }

    pub async fn push_news(&self, headline: &str, body: &str) {
        let mut state = self.state.write().await;
        let news_id = state.news.len() as u64 + 1;
        state.news.push(NewsItem {
            news_id,
            headline: headline.to_string(),
            body: body.to_string(),
        });
    }

    /// Make every cancel_all call fail with an API error.
    pub async fn fail_cancels(&self, fail: bool) {
        self.state.write().await.fail_cancels = fail;
    }

    /// Accept `n` more market orders, then fail the rest.
    pub async fn fail_market_orders_after(&self, n: u32) {
        self.state.write().await.market_orders_before_failure = Some(n);
    }

    /// Orders submitted so far, in submission order.
    pub async fn submitted_orders(&self) -> Vec<SubmittedOrder> {
        self.state.read().await.submitted.clone()
    }

    pub async fn accepted_tenders(&self) -> Vec<u64> {
        self.state.read().await.accepted_tenders.clone()
    }

    pub async fn open_order_count(&self, ticker: &str) -> usize {
        self.state
            .read()
            .await
            .open_orders
            .values()
            .filter(|o| o.ticker == ticker)
            .count()
    }

    pub async fn clear_submitted(&self) {
        self.state.write().await.submitted.clear();
    }
}

#[async_trait::async_trait]
impl ExchangeGateway for MockExchange {
    async fn get_case(&self) -> GatewayResult<CaseStatus> {
        self.state
            .read()
            .await
            .case
            .ok_or(GatewayError::Api {
                endpoint: "case",
                status: 500,
            })
    }

    async fn get_securities(&self) -> GatewayResult<Vec<InstrumentSnapshot>> {
        Ok(self.state.read().await.securities.clone())
    }

    async fn get_book(&self, ticker: &str, _depth: u32) -> GatewayResult<OrderBook> {
        Ok(self
            .state
            .read()
            .await
            .books
            .get(ticker)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_limits(&self) -> GatewayResult<TradingLimits> {
        self.state.read().await.limits.ok_or(GatewayError::Api {
            endpoint: "limits",
            status: 500,
        })
    }

    async fn get_tenders(&self) -> GatewayResult<Vec<TenderOffer>> {
        Ok(self.state.read().await.tenders.clone())
    }

    async fn get_news(&self) -> GatewayResult<Vec<NewsItem>> {
        Ok(self.state.read().await.news.clone())
    }

    async fn open_orders(&self, ticker: &str) -> GatewayResult<Vec<OpenOrder>> {
        Ok(self
            .state
            .read()
            .await
            .open_orders
            .values()
            .filter(|o| o.ticker == ticker)
            .cloned()
            .collect())
    }

    async fn submit_market_order(
        &self,
        ticker: &str,
        quantity: Decimal,
        side: OrderSide,
    ) -> GatewayResult<()> {
        let mut state = self.state.write().await;
        if let Some(remaining) = state.market_orders_before_failure {
            if remaining == 0 {
                return Err(GatewayError::Api {
                    endpoint: "orders",
                    status: 500,
                });
            }
            state.market_orders_before_failure = Some(remaining - 1);
        }
        state.submitted.push(SubmittedOrder {
            ticker: ticker.to_string(),
            order_type: OrderType::Market,
            side,
            quantity: quantity.abs(),
            price: None,
        });
        Ok(())
    }

    async fn submit_limit_order(
        &self,
        ticker: &str,
        price: Decimal,
        quantity: Decimal,
        side: OrderSide,
    ) -> GatewayResult<()> {
        let order_id = self.order_id_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.write().await;
        state.submitted.push(SubmittedOrder {
            ticker: ticker.to_string(),
            order_type: OrderType::Limit,
            side,
            quantity: quantity.abs(),
            price: Some(price),
        });
        state.open_orders.insert(
            order_id,
            OpenOrder {
                order_id,
                ticker: ticker.to_string(),
                order_type: OrderType::Limit,
                action: side,
                quantity: quantity.abs(),
                price: Some(price),
            },
        );
        Ok(())
    }

    async fn cancel_order(&self, order_id: u64) -> GatewayResult<()> {
        let mut state = self.state.write().await;
        state.open_orders.remove(&order_id);
        state.cancelled.push(order_id);
        Ok(())
    }

    async fn cancel_all(&self, ticker: &str) -> GatewayResult<()> {
        let mut state = self.state.write().await;
        if state.fail_cancels {
            return Err(GatewayError::Api {
                endpoint: "orders",
                status: 500,
            });
        }
        let ids: Vec<u64> = state
            .open_orders
            .values()
            .filter(|o| o.ticker == ticker)
            .map(|o| o.order_id)
            .collect();
        for id in ids {
            state.open_orders.remove(&id);
            state.cancelled.push(id);
        }
        Ok(())
    }

    async fn accept_tender(&self, tender_id: u64) -> GatewayResult<()> {
        let mut state = self.state.write().await;
        state.tenders.retain(|t| t.tender_id != tender_id);
        state.accepted_tenders.push(tender_id);
        Ok(())
    }
}
