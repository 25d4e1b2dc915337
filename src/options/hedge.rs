//! Options desk: contract parsing, model valuation, and delta hedging.
//!
//! Each cycle the desk rebuilds the option book from the securities
//! feed, prices every contract off the news-implied volatility, rolls
//! positions up into a share-equivalent delta exposure, and trims any
//! excess back inside the configured band with a market order in the
//! underlying.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::OptionsConfig;
use crate::exchange::{CaseStatus, ExchangeGateway, GatewayError, InstrumentSnapshot, OrderSide};

use super::pricing::{black_scholes, ModelQuote, OptionType, PricingError};
use super::vol::{parse_volatility, VolParseError};

const MONTH_YEARS: f64 = 1.0 / 12.0;

#[derive(Debug, Error)]
pub enum HedgeError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Volatility(#[from] VolParseError),
    #[error("unparseable option ticker: {0}")]
    BadTicker(String),
    #[error("underlying {0} missing from securities feed")]
    MissingUnderlying(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaturityBucket {
    FrontMonth,
    BackMonth,
}

/// One listed option, decoded from its ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionContract {
    pub ticker: String,
    pub option_type: OptionType,
    pub strike: f64,
    pub bucket: MaturityBucket,
}

impl OptionContract {
    /// Decode type and strike from the venue's ticker encoding: type
    /// letter (`C`/`P`) embedded in the name, strike as the trailing
    /// digits. `RTM1C48` is a front-month 48-strike call.
    pub fn parse(ticker: &str, bucket: MaturityBucket) -> Result<Self, HedgeError> {
        let option_type = if ticker.contains('P') {
            OptionType::Put
        } else if ticker.contains('C') {
            OptionType::Call
        } else {
            return Err(HedgeError::BadTicker(ticker.to_string()));
        };

        let digits: String = ticker
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        let strike: f64 = digits
            .parse()
            .map_err(|_| HedgeError::BadTicker(ticker.to_string()))?;
        if strike <= 0.0 {
            return Err(HedgeError::BadTicker(ticker.to_string()));
        }

        Ok(Self {
            ticker: ticker.to_string(),
            option_type,
            strike,
            bucket,
        })
    }
}

/// Valued option row in the desk report.
#[derive(Debug, Clone)]
pub struct OptionRow {
    pub contract: OptionContract,
    pub position: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub model: ModelQuote,
    /// Relative sizing against the adjacent leg of the same bucket;
    /// unset when either delta is exactly zero.
    pub hedge_ratio: Option<f64>,
    pub signal: Option<Signal>,
}

/// Model-vs-market mispricing flag. Report-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
}

/// One cycle's view of the desk.
#[derive(Debug, Clone)]
pub struct DeskReport {
    pub spot: f64,
    pub sigma: f64,
    pub rows: Vec<OptionRow>,
    /// Share-equivalent delta across stock and options
    pub exposure: f64,
    pub required_hedge: f64,
}

/// Market order in the underlying that brings exposure back in band.
#[derive(Debug, Clone, PartialEq)]
pub struct HedgeOrder {
    pub quantity: Decimal,
    pub side: OrderSide,
}

pub struct OptionsDesk {
    config: OptionsConfig,
}

impl OptionsDesk {
    pub fn new(config: OptionsConfig) -> Self {
        Self { config }
    }

    pub fn underlying(&self) -> &str {
        &self.config.underlying
    }

    /// Back-month years remaining, and front-month when it has not yet
    /// expired.
    pub fn maturities(&self, case: &CaseStatus) -> (Option<f64>, f64) {
        let back = (self.config.total_ticks - f64::from(case.absolute_tick()))
            / self.config.ticks_per_year;
        let front = back - MONTH_YEARS;
        (if front > 0.0 { Some(front) } else { None }, back)
    }

    fn contract_maturity(&self, bucket: MaturityBucket, case: &CaseStatus) -> Option<f64> {
        let (front, back) = self.maturities(case);
        match bucket {
            MaturityBucket::FrontMonth => front,
            MaturityBucket::BackMonth => (back > 0.0).then_some(back),
        }
    }

    /// Build the valued desk report from one securities snapshot.
    ///
    /// The underlying must be present; options are taken in feed order,
    /// the first `front_month_count` into the front-month bucket and
    /// the rest into the back month. Expired buckets are skipped.
    pub fn build_report(
        &self,
        case: &CaseStatus,
        securities: &[InstrumentSnapshot],
        sigma: f64,
    ) -> Result<DeskReport, HedgeError> {
        let stock = securities
            .iter()
            .find(|s| s.ticker == self.config.underlying)
            .ok_or_else(|| HedgeError::MissingUnderlying(self.config.underlying.clone()))?;
        let spot = stock
            .mid()
            .to_f64()
            .ok_or(PricingError::DegenerateInput("spot"))?;

        let mut rows = Vec::new();
        for (i, snapshot) in securities
            .iter()
            .filter(|s| s.ticker != self.config.underlying)
            .enumerate()
        {
            let bucket = if i < self.config.front_month_count {
                MaturityBucket::FrontMonth
            } else {
                MaturityBucket::BackMonth
            };
            let contract = OptionContract::parse(&snapshot.ticker, bucket)?;

            let Some(maturity) = self.contract_maturity(bucket, case) else {
                debug!(ticker = %snapshot.ticker, "Skipping expired bucket");
                continue;
            };
            let model = black_scholes(
                spot,
                contract.strike,
                maturity,
                self.config.risk_free_rate,
                sigma,
                contract.option_type,
            )?;

            let signal = self.edge_signal(&model, snapshot);
            rows.push(OptionRow {
                contract,
                position: snapshot.position,
                bid: snapshot.bid,
                ask: snapshot.ask,
                model,
                hedge_ratio: None,
                signal,
            });
        }
        assign_hedge_ratios(&mut rows);

        let contract_size = self.config.contract_size.to_f64().unwrap_or(0.0);
        let stock_delta = stock.position.to_f64().unwrap_or(0.0);
        let option_delta: f64 = rows
            .iter()
            .map(|r| r.position.to_f64().unwrap_or(0.0) * contract_size * r.model.delta)
            .sum();
        let exposure = stock_delta + option_delta;

        Ok(DeskReport {
            spot,
            sigma,
            rows,
            exposure,
            required_hedge: -exposure,
        })
    }

    /// Flag a contract whose model value stands clear of the touch by
    /// more than the configured percent margin.
    fn edge_signal(&self, model: &ModelQuote, snapshot: &InstrumentSnapshot) -> Option<Signal> {
        let bid = snapshot.bid.to_f64().unwrap_or(0.0);
        let ask = snapshot.ask.to_f64().unwrap_or(0.0);
        if bid <= 0.0 || ask <= 0.0 {
            return None;
        }
        if (model.price - bid) / bid < -self.config.edge_margin {
            Some(Signal::Sell)
        } else if (model.price - ask) / ask > self.config.edge_margin {
            Some(Signal::Buy)
        } else {
            None
        }
    }

    /// The market order, if any, that brings exposure back in line.
    /// The delta band applies on every cycle; a flat options book with
    /// the stock leg past the cap is flattened outright instead of
    /// trimmed to the band edge.
    pub fn hedge_order(&self, report: &DeskReport, stock_position: Decimal) -> Option<HedgeOrder> {
        let delta_limit = self.config.delta_limit.to_f64().unwrap_or(0.0);
        let options_flat = report.rows.iter().all(|r| r.position == Decimal::ZERO);

        if options_flat && stock_position.abs() > self.config.stock_cap {
            let side = if stock_position > Decimal::ZERO {
                OrderSide::Sell
            } else {
                OrderSide::Buy
            };
            return Some(HedgeOrder {
                quantity: stock_position.abs(),
                side,
            });
        }

        if report.exposure.abs() <= delta_limit {
            return None;
        }
        let excess = report.exposure.abs() - delta_limit;
        let side = if report.exposure > 0.0 {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        };
        Some(HedgeOrder {
            quantity: Decimal::from(excess.round() as i64),
            side,
        })
    }

    /// One full desk pass: value the book, log the report, and execute
    /// the hedge order if the exposure band is breached.
    #[instrument(skip(self, gateway))]
    pub async fn run_cycle<G: ExchangeGateway + ?Sized>(
        &self,
        gateway: &G,
    ) -> Result<Option<HedgeOrder>, HedgeError> {
        let case = gateway.get_case().await?;
        let securities = gateway.get_securities().await?;
        let news = gateway.get_news().await?;

        let sigma = parse_volatility(&news)?;
        let report = self.build_report(&case, &securities, sigma)?;

        for row in &report.rows {
            if let Some(signal) = row.signal {
                info!(
                    ticker = %row.contract.ticker,
                    model = row.model.price,
                    bid = %row.bid,
                    ask = %row.ask,
                    ?signal,
                    "Model edge"
                );
            }
        }
        info!(
            sigma = report.sigma,
            exposure = report.exposure,
            required_hedge = report.required_hedge,
            "Desk exposure"
        );

        let stock_position = securities
            .iter()
            .find(|s| s.ticker == self.config.underlying)
            .map(|s| s.position)
            .unwrap_or_default();
        let order = self.hedge_order(&report, stock_position);

        if let Some(ref hedge) = order {
            warn!(
                quantity = %hedge.quantity,
                side = %hedge.side,
                "Delta band breached, hedging in the underlying"
            );
            gateway
                .submit_market_order(&self.config.underlying, hedge.quantity, hedge.side)
                .await?;
        }
        Ok(order)
    }
}

/// Pair adjacent rows of the same maturity bucket and assign relative
/// sizing: the smaller-delta leg carries `max/min`, the larger 1.0.
fn assign_hedge_ratios(rows: &mut [OptionRow]) {
    let mut i = 0;
    while i + 1 < rows.len() {
        if rows[i].contract.bucket != rows[i + 1].contract.bucket {
            i += 1;
            continue;
        }
        let a = rows[i].model.delta.abs();
        let b = rows[i + 1].model.delta.abs();
        if a == 0.0 || b == 0.0 {
            rows[i].hedge_ratio = None;
            rows[i + 1].hedge_ratio = None;
        } else if a >= b {
            rows[i].hedge_ratio = Some(1.0);
            rows[i + 1].hedge_ratio = Some(a / b);
        } else {
            rows[i].hedge_ratio = Some(b / a);
            rows[i + 1].hedge_ratio = Some(1.0);
        }
        i += 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> OptionsConfig {
        OptionsConfig {
            front_month_count: 2,
            ..OptionsConfig::default()
        }
    }

    fn snapshot(ticker: &str, bid: Decimal, ask: Decimal, position: Decimal) -> InstrumentSnapshot {
        InstrumentSnapshot {
            ticker: ticker.to_string(),
            bid,
            ask,
            bid_size: dec!(1000),
            ask_size: dec!(1000),
            last: (bid + ask) / dec!(2),
            volume: dec!(0),
            position,
            vwap: dec!(0),
        }
    }

    fn case(tick: u32) -> CaseStatus {
        CaseStatus {
            tick,
            period: 1,
            ticks_per_period: 300,
        }
    }

    #[test]
    fn test_contract_parsing() {
        let call = OptionContract::parse("RTM1C48", MaturityBucket::FrontMonth).unwrap();
        assert_eq!(call.option_type, OptionType::Call);
        assert_eq!(call.strike, 48.0);

        let put = OptionContract::parse("RTM2P52", MaturityBucket::BackMonth).unwrap();
        assert_eq!(put.option_type, OptionType::Put);
        assert_eq!(put.strike, 52.0);

        assert!(OptionContract::parse("RTM", MaturityBucket::FrontMonth).is_err());
        assert!(OptionContract::parse("RTMC", MaturityBucket::FrontMonth).is_err());
    }

    #[test]
    fn test_maturities_shrink_with_tick() {
        let desk = OptionsDesk::new(config());
        let (front, back) = desk.maturities(&case(60));
        // 540 ticks left = 0.15y back month, front a month earlier
        assert!((back - 0.15).abs() < 1e-12);
        assert!((front.unwrap() - (0.15 - 1.0 / 12.0)).abs() < 1e-12);
    }

    #[test]
    fn test_front_month_expires() {
        let desk = OptionsDesk::new(config());
        // 300 ticks left = 1/12 year exactly; front month has expired
        let (front, back) = desk.maturities(&case(300));
        assert!(front.is_none());
        assert!(back > 0.0);
    }

    #[test]
    fn test_portfolio_delta_aggregates_stock_and_options() {
        let desk = OptionsDesk::new(config());
        let securities = vec![
            snapshot("RTM", dec!(49.90), dec!(50.10), dec!(1000)),
            snapshot("RTM1C50", dec!(1.50), dec!(1.60), dec!(10)),
            snapshot("RTM1P50", dec!(1.50), dec!(1.60), dec!(0)),
        ];
        let report = desk.build_report(&case(60), &securities, 0.25).unwrap();

        assert_eq!(report.rows.len(), 2);
        let call_delta = report.rows[0].model.delta;
        assert!(call_delta > 0.0 && call_delta < 1.0);
        // stock 1000 * 1 + call 10 * 100 * delta
        let expected = 1000.0 + 10.0 * 100.0 * call_delta;
        assert!((report.exposure - expected).abs() < 1e-9);
        assert_eq!(report.required_hedge, -report.exposure);
    }

    #[test]
    fn test_hedge_ratio_pairing() {
        let desk = OptionsDesk::new(config());
        let securities = vec![
            snapshot("RTM", dec!(49.90), dec!(50.10), dec!(0)),
            snapshot("RTM1C48", dec!(2.50), dec!(2.60), dec!(0)),
            snapshot("RTM1P48", dec!(0.50), dec!(0.60), dec!(0)),
        ];
        let report = desk.build_report(&case(60), &securities, 0.25).unwrap();

        let call = &report.rows[0];
        let put = &report.rows[1];
        // ITM call has the larger |delta|; the put leg carries the ratio
        assert!(call.model.delta.abs() > put.model.delta.abs());
        assert_eq!(call.hedge_ratio, Some(1.0));
        let ratio = put.hedge_ratio.unwrap();
        assert!((ratio - call.model.delta.abs() / put.model.delta.abs()).abs() < 1e-12);
        assert!(ratio > 1.0);
    }

    #[test]
    fn test_hedge_order_trims_excess_only() {
        let desk = OptionsDesk::new(config());
        let securities = vec![
            snapshot("RTM", dec!(49.90), dec!(50.10), dec!(0)),
            snapshot("RTM1C50", dec!(1.50), dec!(1.60), dec!(10)),
        ];
        let report = desk.build_report(&case(60), &securities, 0.25).unwrap();
        // ATM-ish call, exposure about 10 * 100 * 0.53 = 530 shares
        assert!(report.exposure > 200.0);

        let order = desk.hedge_order(&report, dec!(0)).unwrap();
        assert_eq!(order.side, OrderSide::Sell);
        let expected = Decimal::from((report.exposure - 200.0).round() as i64);
        assert_eq!(order.quantity, expected);
    }

    #[test]
    fn test_no_hedge_inside_band() {
        let desk = OptionsDesk::new(config());
        let securities = vec![
            snapshot("RTM", dec!(49.90), dec!(50.10), dec!(100)),
            snapshot("RTM1C50", dec!(1.50), dec!(1.60), dec!(1)),
        ];
        let report = desk.build_report(&case(60), &securities, 0.25).unwrap();
        assert!(report.exposure.abs() < 200.0);
        assert!(desk.hedge_order(&report, dec!(100)).is_none());
    }

    #[test]
    fn test_flat_options_flatten_oversized_stock() {
        let desk = OptionsDesk::new(config());
        let securities = vec![
            snapshot("RTM", dec!(49.90), dec!(50.10), dec!(60000)),
            snapshot("RTM1C50", dec!(1.50), dec!(1.60), dec!(0)),
        ];
        let report = desk.build_report(&case(60), &securities, 0.25).unwrap();

        // Past the cap the whole leg goes, not just the band excess
        let order = desk.hedge_order(&report, dec!(60000)).unwrap();
        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(order.quantity, dec!(60000));
    }

    #[test]
    fn test_bare_stock_inside_cap_still_trimmed_to_band() {
        let desk = OptionsDesk::new(config());
        let securities = vec![
            snapshot("RTM", dec!(49.90), dec!(50.10), dec!(10000)),
            snapshot("RTM1C50", dec!(1.50), dec!(1.60), dec!(0)),
        ];
        let report = desk.build_report(&case(60), &securities, 0.25).unwrap();
        assert!((report.exposure - 10000.0).abs() < 1e-9);

        // The delta band applies every cycle, options book or not
        let order = desk.hedge_order(&report, dec!(10000)).unwrap();
        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(order.quantity, dec!(9800));

        let securities = vec![
            snapshot("RTM", dec!(49.90), dec!(50.10), dec!(-10000)),
            snapshot("RTM1C50", dec!(1.50), dec!(1.60), dec!(0)),
        ];
        let report = desk.build_report(&case(60), &securities, 0.25).unwrap();
        let order = desk.hedge_order(&report, dec!(-10000)).unwrap();
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.quantity, dec!(9800));
    }

    #[test]
    fn test_edge_signals() {
        let mut cfg = config();
        cfg.edge_margin = 0.15;
        let desk = OptionsDesk::new(cfg);
        let securities = vec![
            snapshot("RTM", dec!(49.90), dec!(50.10), dec!(0)),
            // Quoted far above model value: sell signal
            snapshot("RTM1C50", dec!(5.00), dec!(5.10), dec!(0)),
            // Quoted far below model value: buy signal
            snapshot("RTM1P50", dec!(0.10), dec!(0.15), dec!(0)),
        ];
        let report = desk.build_report(&case(60), &securities, 0.25).unwrap();
        assert_eq!(report.rows[0].signal, Some(Signal::Sell));
        assert_eq!(report.rows[1].signal, Some(Signal::Buy));
    }

    #[test]
    fn test_missing_underlying_errors() {
        let desk = OptionsDesk::new(config());
        let securities = vec![snapshot("RTM1C50", dec!(1.50), dec!(1.60), dec!(0))];
        assert!(matches!(
            desk.build_report(&case(60), &securities, 0.25),
            Err(HedgeError::MissingUnderlying(_))
        ));
    }

    #[tokio::test]
    async fn test_run_cycle_submits_hedge() {
        use crate::exchange::{MockExchange, OrderType};

        let mock = MockExchange::new();
        mock.set_case(60, 1, 300).await;
        mock.set_security(snapshot("RTM", dec!(49.90), dec!(50.10), dec!(0)))
            .await;
        mock.set_security(snapshot("RTM1C50", dec!(1.50), dec!(1.60), dec!(10)))
            .await;
        mock.push_news("Week 1 Announcement", "volatility of RTM is 25% this week.")
            .await;

        let desk = OptionsDesk::new(config());
        let order = desk.run_cycle(&mock).await.unwrap().unwrap();
        assert_eq!(order.side, OrderSide::Sell);

        let submitted = mock.submitted_orders().await;
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].ticker, "RTM");
        assert_eq!(submitted[0].order_type, OrderType::Market);
    }
}
