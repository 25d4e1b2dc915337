//! Concurrent polling scheduler.
//!
//! One tokio task per enabled strategy, each polling the gateway on the
//! configured cadence against the shared risk tracker. Tasks never
//! block on each other; a failed cycle is logged and retried on the
//! next tick. The run ends when the case clock passes the configured
//! end tick or the shutdown flag flips, and every task is awaited so no
//! cancel/replace is left half-done.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::exchange::ExchangeGateway;
use crate::options::OptionsDesk;
use crate::risk::{RiskTracker, SharedRiskTracker};

use super::arbitrage::{touches, ArbitrageDetector};
use super::quoting::QuotingEngine;
use super::tender::{TenderDecision, TenderEvaluator};

/// Which strategy tasks to launch.
#[derive(Debug, Clone, Copy)]
pub struct StrategyToggles {
    pub quoting: bool,
    pub arbitrage: bool,
    pub tender: bool,
    pub hedging: bool,
}

impl Default for StrategyToggles {
    fn default() -> Self {
        Self {
            quoting: true,
            arbitrage: true,
            tender: true,
            hedging: true,
        }
    }
}

/// One strategy's per-tick work unit, driven by the scheduler loop.
#[async_trait]
trait PollTask: Send {
    fn name(&self) -> &'static str;

    async fn cycle(&mut self, gateway: &dyn ExchangeGateway) -> Result<()>;
}

/// Owns the gateway handle, the shared tracker, and the shutdown flag.
pub struct StrategyScheduler {
    gateway: Arc<dyn ExchangeGateway>,
    config: Config,
    tracker: SharedRiskTracker,
    shutdown: Arc<AtomicBool>,
}

impl StrategyScheduler {
    pub fn new(
        gateway: Arc<dyn ExchangeGateway>,
        config: Config,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let tracker = Arc::new(Mutex::new(RiskTracker::new(config.risk.clone())));
        Self {
            gateway,
            config,
            tracker,
            shutdown,
        }
    }

    pub fn tracker(&self) -> SharedRiskTracker {
        self.tracker.clone()
    }

    /// Launch the enabled strategy tasks and wait for all of them.
    pub async fn run(&self, toggles: StrategyToggles) -> Result<()> {
        let mut handles: Vec<JoinHandle<()>> = Vec::new();

        if toggles.quoting {
            handles.push(self.spawn(Box::new(QuotingTask {
                engine: QuotingEngine::new(self.config.quoting.clone()),
                tracker: self.tracker.clone(),
            })));
        }
        if toggles.arbitrage {
            handles.push(self.spawn(Box::new(ArbitrageTask {
                detector: ArbitrageDetector::new(self.config.arbitrage.clone()),
            })));
        }
        if toggles.tender {
            handles.push(self.spawn(Box::new(TenderTask {
                evaluator: TenderEvaluator::new(self.config.tender.clone()),
                tracker: self.tracker.clone(),
                settle_threshold: self.config.tender.settle_threshold,
                decided: HashSet::new(),
            })));
        }
        if toggles.hedging {
            handles.push(self.spawn(Box::new(HedgeTask {
                desk: OptionsDesk::new(self.config.options.clone()),
            })));
        }

        info!(tasks = handles.len(), "Strategy scheduler running");
        for handle in handles {
            handle.await.ok();
        }
        info!("All strategy tasks stopped");
        Ok(())
    }

    fn spawn(&self, mut task: Box<dyn PollTask>) -> JoinHandle<()> {
        let gateway = self.gateway.clone();
        let shutdown = self.shutdown.clone();
        let end_tick = self.config.exchange.end_tick;
        let interval = Duration::from_millis(self.config.exchange.poll_interval_ms);

        tokio::spawn(async move {
            info!(task = task.name(), "Task started");
            while !shutdown.load(Ordering::SeqCst) {
                match gateway.get_case().await {
                    Ok(case) if case.absolute_tick() >= end_tick => {
                        info!(
                            task = task.name(),
                            tick = case.absolute_tick(),
                            "End of case reached, stopping"
                        );
                        shutdown.store(true, Ordering::SeqCst);
                        break;
                    }
                    Ok(_) => {
                        if let Err(e) = task.cycle(gateway.as_ref()).await {
                            warn!(
                                task = task.name(),
                                error = %e,
                                "Cycle failed, retrying next tick"
                            );
                        }
                    }
                    Err(e) => {
                        warn!(task = task.name(), error = %e, "Case fetch failed");
                    }
                }
                tokio::time::sleep(interval).await;
            }
            info!(task = task.name(), "Task stopped");
        })
    }
}

/// Market making with the shared stop-loss sweep.
///
/// The tracker lock is held only for the update-and-decide step;
/// forced liquidations go out before any fresh quotes.
struct QuotingTask {
    engine: QuotingEngine,
    tracker: SharedRiskTracker,
}

#[async_trait]
impl PollTask for QuotingTask {
    fn name(&self) -> &'static str {
        "quoting"
    }

    async fn cycle(&mut self, gateway: &dyn ExchangeGateway) -> Result<()> {
        let securities = gateway.get_securities().await?;
        let limits = gateway.get_limits().await?;

        let liquidations = {
            let mut tracker = self.tracker.lock().await;
            tracker.update(&securities);
            tracker.check_losses()
        };
        for order in &liquidations {
            gateway
                .submit_market_order(&order.ticker, order.quantity, order.side)
                .await?;
        }

        for ticker in self.engine.tickers().to_vec() {
            let Some(snapshot) = securities.iter().find(|s| s.ticker == ticker) else {
                continue;
            };
            // Skip quoting a ticker we just force-liquidated
            if liquidations.iter().any(|l| l.ticker == ticker) {
                continue;
            }
            if let Some(decision) =
                self.engine
                    .quote(snapshot, snapshot.position, limits.gross_limit)
            {
                // Republish failures are logged inside; move on to the
                // next ticker rather than abandoning the cycle.
                if self
                    .engine
                    .republish(gateway, &ticker, &decision)
                    .await
                    .is_err()
                {
                    continue;
                }
            }
        }
        Ok(())
    }
}

struct ArbitrageTask {
    detector: ArbitrageDetector,
}

#[async_trait]
impl PollTask for ArbitrageTask {
    fn name(&self) -> &'static str {
        "arbitrage"
    }

    async fn cycle(&mut self, gateway: &dyn ExchangeGateway) -> Result<()> {
        let securities = gateway.get_securities().await?;
        let touch_map = touches(&securities);

        if let Some(action) = self.detector.evaluate(&touch_map) {
            self.detector.execute(gateway, action).await?;
        }
        Ok(())
    }
}

/// Evaluates the newest tender offer and stages the unwind of accepted
/// blocks. Each offer is decided at most once.
struct TenderTask {
    evaluator: TenderEvaluator,
    tracker: SharedRiskTracker,
    settle_threshold: Decimal,
    decided: HashSet<u64>,
}

#[async_trait]
impl PollTask for TenderTask {
    fn name(&self) -> &'static str {
        "tender"
    }

    async fn cycle(&mut self, gateway: &dyn ExchangeGateway) -> Result<()> {
        let tenders = gateway.get_tenders().await?;
        let Some(offer) = TenderEvaluator::latest_offer(&tenders) else {
            return Ok(());
        };
        if self.decided.contains(&offer.tender_id) {
            return Ok(());
        }

        let securities = gateway.get_securities().await?;
        let Some(snapshot) = securities.iter().find(|s| s.ticker == offer.ticker) else {
            return Ok(());
        };

        self.decided.insert(offer.tender_id);
        if self.evaluator.evaluate(offer, snapshot) == TenderDecision::Decline {
            info!(
                tender_id = offer.tender_id,
                ticker = %offer.ticker,
                price = %offer.price,
                "Declined tender offer"
            );
            return Ok(());
        }

        let offer = offer.clone();
        gateway.accept_tender(offer.tender_id).await?;
        info!(
            tender_id = offer.tender_id,
            ticker = %offer.ticker,
            action = %offer.action,
            price = %offer.price,
            quantity = %offer.quantity,
            "Accepted tender offer"
        );

        // Refresh the touch after the fill, then seed the block stop and
        // stage the unwind from the settled position.
        let securities = gateway.get_securities().await?;
        let Some(snapshot) = securities.iter().find(|s| s.ticker == offer.ticker) else {
            return Ok(());
        };
        {
            let mut tracker = self.tracker.lock().await;
            tracker.update(&securities);
            tracker.seed_block_stop(&offer.ticker, snapshot.vwap);
        }

        if snapshot.position.abs() <= self.settle_threshold {
            info!(
                ticker = %offer.ticker,
                position = %snapshot.position,
                "Block below settle threshold, leaving to the quoting flow"
            );
            return Ok(());
        }

        let plan = self.evaluator.plan_unwind(
            &offer.ticker,
            snapshot.position,
            snapshot.bid,
            snapshot.ask,
        );
        self.evaluator.execute_unwind(gateway, &plan).await?;
        Ok(())
    }
}

struct HedgeTask {
    desk: OptionsDesk,
}

#[async_trait]
impl PollTask for HedgeTask {
    fn name(&self) -> &'static str {
        "hedging"
    }

    async fn cycle(&mut self, gateway: &dyn ExchangeGateway) -> Result<()> {
        self.desk.run_cycle(gateway).await?;
        Ok(())
    }
}
