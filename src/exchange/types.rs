//! Type definitions for RIT REST API payloads.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Case clock state.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CaseStatus {
    pub tick: u32,
    #[serde(default = "default_period")]
    pub period: u32,
    #[serde(default = "default_ticks_per_period")]
    pub ticks_per_period: u32,
}

fn default_period() -> u32 {
    1
}

fn default_ticks_per_period() -> u32 {
    300
}

impl CaseStatus {
    /// Tick counted across periods, so time-to-maturity is monotone
    /// over the whole case.
    pub fn absolute_tick(&self) -> u32 {
        self.tick + (self.period.saturating_sub(1)) * self.ticks_per_period
    }
}

/// Per-instrument market snapshot, replaced wholesale each poll cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentSnapshot {
    pub ticker: String,
    pub bid: Decimal,
    pub ask: Decimal,
    #[serde(default)]
    pub bid_size: Decimal,
    #[serde(default)]
    pub ask_size: Decimal,
    pub last: Decimal,
    #[serde(default)]
    pub volume: Decimal,
    /// Signed net position
    pub position: Decimal,
    /// Volume-weighted average cost of the current position
    #[serde(default)]
    pub vwap: Decimal,
}

impl InstrumentSnapshot {
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }

    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }
}

/// Gross and net position limits for the trader.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TradingLimits {
    pub gross_limit: Decimal,
    pub net_limit: Decimal,
}

/// One-shot block trade proposal from an institutional client.
///
/// `action` is the side we would take: a SELL tender asks us to sell
/// the client a block at the offered price.
#[derive(Debug, Clone, Deserialize)]
pub struct TenderOffer {
    pub tender_id: u64,
    pub ticker: String,
    pub price: Decimal,
    pub quantity: Decimal,
    pub action: OrderSide,
    #[serde(default)]
    pub is_fixed_bid: bool,
}

/// News feed item, in arrival order.
#[derive(Debug, Clone, Deserialize)]
pub struct NewsItem {
    #[serde(default)]
    pub news_id: u64,
    pub headline: String,
    pub body: String,
}

/// Aggregated order book for one instrument.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderBook {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// A resting order as reported by the venue.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenOrder {
    pub order_id: u64,
    pub ticker: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub action: OrderSide,
    pub quantity: Decimal,
    #[serde(default)]
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_absolute_tick_spans_periods() {
        let case = CaseStatus {
            tick: 45,
            period: 2,
            ticks_per_period: 300,
        };
        assert_eq!(case.absolute_tick(), 345);
    }

    #[test]
    fn test_snapshot_mid_and_spread() {
        let snap = InstrumentSnapshot {
            ticker: "RIT_C".to_string(),
            bid: dec!(24.90),
            ask: dec!(25.10),
            bid_size: dec!(1000),
            ask_size: dec!(1500),
            last: dec!(25.00),
            volume: dec!(0),
            position: dec!(0),
            vwap: dec!(0),
        };
        assert_eq!(snap.mid(), dec!(25.00));
        assert_eq!(snap.spread(), dec!(0.20));
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test]
    fn test_tender_deserializes() {
        let json = r#"{
            "tender_id": 7,
            "ticker": "RIT_C",
            "price": 25.50,
            "quantity": 10000,
            "action": "SELL",
            "is_fixed_bid": true
        }"#;
        let tender: TenderOffer = serde_json::from_str(json).unwrap();
        assert_eq!(tender.action, OrderSide::Sell);
        assert_eq!(tender.quantity, dec!(10000));
    }
}
