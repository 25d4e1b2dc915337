//! Venue-agnostic gateway trait the strategies trade through.
//!
//! The live `RitClient` and the in-memory `MockExchange` both implement
//! this seam, so every strategy is testable without a running simulator.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::error::GatewayResult;
use super::types::{
    CaseStatus, InstrumentSnapshot, NewsItem, OpenOrder, OrderBook, OrderSide, TenderOffer,
    TradingLimits,
};

#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Current case clock.
    async fn get_case(&self) -> GatewayResult<CaseStatus>;

    /// All tradable instruments with bid/ask/position/vwap, replaced
    /// wholesale each poll.
    async fn get_securities(&self) -> GatewayResult<Vec<InstrumentSnapshot>>;

    /// Order book for one instrument, up to `depth` levels per side.
    async fn get_book(&self, ticker: &str, depth: u32) -> GatewayResult<OrderBook>;

    /// Gross and net position limits.
    async fn get_limits(&self) -> GatewayResult<TradingLimits>;

    /// Outstanding tender offers, oldest first.
    async fn get_tenders(&self) -> GatewayResult<Vec<TenderOffer>>;

    /// News feed in arrival order.
    async fn get_news(&self) -> GatewayResult<Vec<NewsItem>>;

    /// Open resting orders for one ticker.
    async fn open_orders(&self, ticker: &str) -> GatewayResult<Vec<OpenOrder>>;

    /// Submit a market order. Quantities above the venue clip size are
    /// split into repeated maximum-clip calls plus a remainder call.
    async fn submit_market_order(
        &self,
        ticker: &str,
        quantity: Decimal,
        side: OrderSide,
    ) -> GatewayResult<()>;

    /// Submit a resting limit order, clip-split like market orders.
    async fn submit_limit_order(
        &self,
        ticker: &str,
        price: Decimal,
        quantity: Decimal,
        side: OrderSide,
    ) -> GatewayResult<()>;

    /// Cancel a single resting order.
    async fn cancel_order(&self, order_id: u64) -> GatewayResult<()>;

    /// Cancel every open order for a ticker. Must fully succeed before
    /// the caller posts replacements.
    async fn cancel_all(&self, ticker: &str) -> GatewayResult<()>;

    /// Accept a tender offer by id.
    async fn accept_tender(&self, tender_id: u64) -> GatewayResult<()>;
}
