//! Configuration management for the trading client.
//!
//! Loads settings from environment variables and config files.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RIT API connection settings
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// Stop-loss and position risk parameters
    #[serde(default)]
    pub risk: RiskConfig,
    /// Market-making quote parameters
    #[serde(default)]
    pub quoting: QuotingConfig,
    /// Synthetic-basket arbitrage parameters
    #[serde(default)]
    pub arbitrage: ArbitrageConfig,
    /// Tender offer evaluation and unwind parameters
    #[serde(default)]
    pub tender: TenderConfig,
    /// Options pricing and delta-hedging parameters
    #[serde(default)]
    pub options: OptionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Static API key sent as the X-API-Key header on every request
    #[serde(default)]
    pub api_key: String,
    /// Base URL of the RIT REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Polling cadence for every strategy task, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Venue-imposed maximum order size; larger orders are split
    #[serde(default = "default_max_clip_size")]
    pub max_clip_size: Decimal,
    /// Absolute tick at which the case ends and all tasks stop
    #[serde(default = "default_end_tick")]
    pub end_tick: u32,
}

/// How the stop-loss offset is derived from the current price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopLossMode {
    /// Stop sits a fixed price distance away (long: price - offset)
    FixedOffset,
    /// Stop sits a fraction of price away (long: price * (1 - pct))
    PercentOfPrice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Stop-loss computation mode
    #[serde(default = "default_stop_mode")]
    pub stop_mode: StopLossMode,
    /// Fixed price offset used in FixedOffset mode
    #[serde(default = "default_stop_offset")]
    pub stop_offset: Decimal,
    /// Price fraction used in PercentOfPrice mode (e.g., 0.0025 = 0.25%)
    #[serde(default = "default_stop_pct")]
    pub stop_pct: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotingConfig {
    /// Tickers to quote two-sided markets on
    #[serde(default = "default_quote_tickers")]
    pub tickers: Vec<String>,
    /// Fraction of the market spread our quotes occupy (< 1 quotes inside)
    #[serde(default = "default_spread_multiplier")]
    pub spread_multiplier: Decimal,
    /// Minimum market spread worth quoting into
    #[serde(default = "default_min_spread")]
    pub min_spread: Decimal,
    /// Scale factor from inventory fraction to mid-price skew
    #[serde(default = "default_inventory_multiplier")]
    pub inventory_multiplier: Decimal,
    /// Base quantity per quoted side, in units of one clip
    #[serde(default = "default_position_size")]
    pub position_size: Decimal,
    /// Number of clips quoted per side when inventory is flat
    #[serde(default = "default_num_clips")]
    pub num_clips: u32,
    /// Price improvement applied to near-touch liquidation orders
    #[serde(default = "default_liquidation_edge")]
    pub liquidation_edge: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageConfig {
    /// Tickers of the basket legs, in execution order
    #[serde(default = "default_arb_legs")]
    pub legs: Vec<String>,
    /// Ticker of the composite instrument the basket replicates
    #[serde(default = "default_arb_composite")]
    pub composite: String,
    /// Minimum raw mispricing before fees
    #[serde(default = "default_arb_threshold")]
    pub threshold: Decimal,
    /// Spread magnitude below which an open basket is unwound
    #[serde(default = "default_arb_convergence_gap")]
    pub convergence_gap: Decimal,
    /// Per-leg market order fee, buffered into the entry threshold
    #[serde(default = "default_per_trade_fee")]
    pub per_trade_fee: Decimal,
    /// Quantity traded on every leg
    #[serde(default = "default_arb_quantity")]
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenderConfig {
    /// Minimum edge over the touch required to accept an offer
    #[serde(default = "default_edge_threshold")]
    pub edge_threshold: Decimal,
    /// Fraction of an accepted block unwound immediately at market
    #[serde(default = "default_market_fraction")]
    pub market_fraction: Decimal,
    /// Successive price improvements for the resting limit tranches;
    /// the remainder after the market tranche is split equally across them
    #[serde(default = "default_price_increments")]
    pub price_increments: Vec<Decimal>,
    /// Position change that signals an accepted tender has settled
    #[serde(default = "default_settle_threshold")]
    pub settle_threshold: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Underlying stock ticker
    #[serde(default = "default_underlying")]
    pub underlying: String,
    /// Shares per option contract
    #[serde(default = "default_contract_size")]
    pub contract_size: Decimal,
    /// Symmetric delta exposure band; hedging trims back to this
    #[serde(default = "default_delta_limit")]
    pub delta_limit: Decimal,
    /// Stock position cap applied when the options book is flat
    #[serde(default = "default_stock_cap")]
    pub stock_cap: Decimal,
    /// Risk-free rate used in pricing
    #[serde(default)]
    pub risk_free_rate: f64,
    /// Simulation ticks per trading year
    #[serde(default = "default_ticks_per_year")]
    pub ticks_per_year: f64,
    /// Total simulation ticks across all periods
    #[serde(default = "default_total_ticks")]
    pub total_ticks: f64,
    /// Number of front-month contracts listed first in the securities feed
    #[serde(default = "default_front_month_count")]
    pub front_month_count: usize,
    /// Model-vs-market percent edge that flags a Buy/Sell signal in the report
    #[serde(default = "default_edge_margin")]
    pub edge_margin: f64,
}

// Default value functions

fn default_base_url() -> String {
    "http://localhost:9999/v1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_poll_interval_ms() -> u64 {
    500 // deliberate speed bump; the venue rate-limits API orders
}

fn default_max_clip_size() -> Decimal {
    Decimal::new(10_000, 0)
}

fn default_end_tick() -> u32 {
    295
}

fn default_stop_mode() -> StopLossMode {
    StopLossMode::FixedOffset
}

fn default_stop_offset() -> Decimal {
    Decimal::new(10, 2) // 0.10
}

fn default_stop_pct() -> Decimal {
    Decimal::new(25, 4) // 0.0025
}

fn default_quote_tickers() -> Vec<String> {
    vec!["RIT_C".to_string(), "HAWK".to_string(), "DOVE".to_string()]
}

fn default_spread_multiplier() -> Decimal {
    Decimal::new(8, 1) // 0.8 - quote slightly inside the market
}

fn default_min_spread() -> Decimal {
    Decimal::new(20, 2) // 0.20
}

fn default_inventory_multiplier() -> Decimal {
    Decimal::new(5, 3) // 0.005
}

fn default_position_size() -> Decimal {
    Decimal::new(10_000, 0)
}

fn default_num_clips() -> u32 {
    3
}

fn default_liquidation_edge() -> Decimal {
    Decimal::new(1, 2) // 0.01 - one tick inside the touch
}

fn default_arb_legs() -> Vec<String> {
    vec!["HAWK".to_string(), "DOVE".to_string()]
}

fn default_arb_composite() -> String {
    "RIT_C".to_string()
}

fn default_arb_threshold() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_arb_convergence_gap() -> Decimal {
    Decimal::new(2, 2) // 0.02
}

fn default_per_trade_fee() -> Decimal {
    Decimal::new(2, 2) // 0.02 per market order
}

fn default_arb_quantity() -> Decimal {
    Decimal::new(10_000, 0)
}

fn default_edge_threshold() -> Decimal {
    Decimal::new(25, 2) // 0.25
}

fn default_market_fraction() -> Decimal {
    Decimal::new(10, 2) // 0.10 - small leading market tranche
}

fn default_price_increments() -> Vec<Decimal> {
    vec![Decimal::new(25, 3), Decimal::new(50, 3)] // 0.025, 0.05
}

fn default_settle_threshold() -> Decimal {
    Decimal::new(500, 0)
}

fn default_underlying() -> String {
    "RTM".to_string()
}

fn default_contract_size() -> Decimal {
    Decimal::new(100, 0)
}

fn default_delta_limit() -> Decimal {
    Decimal::new(200, 0)
}

fn default_stock_cap() -> Decimal {
    Decimal::new(50_000, 0)
}

fn default_ticks_per_year() -> f64 {
    3600.0
}

fn default_total_ticks() -> f64 {
    600.0 // two 300-tick periods
}

fn default_front_month_count() -> usize {
    20 // ten strikes, call and put each
}

fn default_edge_margin() -> f64 {
    0.15
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().separator("__").prefix("RIT"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.quoting.spread_multiplier > Decimal::ZERO
                && self.quoting.spread_multiplier <= Decimal::ONE,
            "spread_multiplier must be in (0, 1]"
        );

        anyhow::ensure!(
            self.exchange.max_clip_size > Decimal::ZERO,
            "max_clip_size must be positive"
        );

        anyhow::ensure!(
            !self.arbitrage.legs.is_empty(),
            "arbitrage basket needs at least one leg"
        );

        anyhow::ensure!(
            self.tender.market_fraction >= Decimal::ZERO
                && self.tender.market_fraction < Decimal::ONE,
            "market_fraction must be in [0, 1)"
        );

        anyhow::ensure!(
            !self.tender.price_increments.is_empty(),
            "tender unwind needs at least one limit tranche"
        );

        anyhow::ensure!(
            self.options.ticks_per_year > 0.0,
            "ticks_per_year must be positive"
        );

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exchange: ExchangeConfig::default(),
            risk: RiskConfig::default(),
            quoting: QuotingConfig::default(),
            arbitrage: ArbitrageConfig::default(),
            tender: TenderConfig::default(),
            options: OptionsConfig::default(),
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_clip_size: default_max_clip_size(),
            end_tick: default_end_tick(),
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            stop_mode: default_stop_mode(),
            stop_offset: default_stop_offset(),
            stop_pct: default_stop_pct(),
        }
    }
}

impl Default for QuotingConfig {
    fn default() -> Self {
        Self {
            tickers: default_quote_tickers(),
            spread_multiplier: default_spread_multiplier(),
            min_spread: default_min_spread(),
            inventory_multiplier: default_inventory_multiplier(),
            position_size: default_position_size(),
            num_clips: default_num_clips(),
            liquidation_edge: default_liquidation_edge(),
        }
    }
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            legs: default_arb_legs(),
            composite: default_arb_composite(),
            threshold: default_arb_threshold(),
            convergence_gap: default_arb_convergence_gap(),
            per_trade_fee: default_per_trade_fee(),
            quantity: default_arb_quantity(),
        }
    }
}

impl Default for TenderConfig {
    fn default() -> Self {
        Self {
            edge_threshold: default_edge_threshold(),
            market_fraction: default_market_fraction(),
            price_increments: default_price_increments(),
            settle_threshold: default_settle_threshold(),
        }
    }
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            underlying: default_underlying(),
            contract_size: default_contract_size(),
            delta_limit: default_delta_limit(),
            stock_cap: default_stock_cap(),
            risk_free_rate: 0.0,
            ticks_per_year: default_ticks_per_year(),
            total_ticks: default_total_ticks(),
            front_month_count: default_front_month_count(),
            edge_margin: default_edge_margin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_spread_multiplier_rejected() {
        let mut config = Config::default();
        config.quoting.spread_multiplier = Decimal::new(15, 1); // 1.5
        assert!(config.validate().is_err());
    }
}
