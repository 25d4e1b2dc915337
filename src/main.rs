//! RIT Algo - Main Entry Point
//!
//! Launches the strategy scheduler against a live RIT simulator.

use anyhow::Result;
use clap::Parser;
use rit_algo::config::Config;
use rit_algo::exchange::RitClient;
use rit_algo::strategy::{StrategyScheduler, StrategyToggles};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

/// RIT Algo CLI
#[derive(Parser)]
#[command(name = "rit-algo")]
#[command(version, about = "Automated trading strategies for the RIT simulator")]
struct Cli {
    /// Disable the market-making task
    #[arg(long)]
    no_quoting: bool,

    /// Disable the basket arbitrage task
    #[arg(long)]
    no_arbitrage: bool,

    /// Disable the tender evaluation task
    #[arg(long)]
    no_tender: bool,

    /// Disable the options delta-hedging task
    #[arg(long)]
    no_hedging: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    info!("rit-algo v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    config.validate()?;
    log_config(&config);

    if config.exchange.api_key.is_empty() {
        warn!("No API key configured; the simulator will reject orders");
    }

    let client = Arc::new(RitClient::new(&config.exchange)?);

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
        shutdown_clone.store(true, Ordering::SeqCst);
    });

    let toggles = StrategyToggles {
        quoting: !cli.no_quoting,
        arbitrage: !cli.no_arbitrage,
        tender: !cli.no_tender,
        hedging: !cli.no_hedging,
    };

    let scheduler = StrategyScheduler::new(client, config, shutdown);
    scheduler.run(toggles).await?;

    info!("Goodbye");
    Ok(())
}

fn init_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("rit_algo=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();
    Ok(())
}

fn log_config(config: &Config) {
    info!("Configuration:");
    info!("   Base URL: {}", config.exchange.base_url);
    info!("   Poll interval: {}ms", config.exchange.poll_interval_ms);
    info!("   End tick: {}", config.exchange.end_tick);
    info!("   Quoting tickers: {:?}", config.quoting.tickers);
    info!(
        "   Arbitrage basket: {:?} vs {}",
        config.arbitrage.legs, config.arbitrage.composite
    );
    info!("   Tender edge threshold: {}", config.tender.edge_threshold);
    info!("   Options underlying: {}", config.options.underlying);
    info!("   Delta limit: {}", config.options.delta_limit);
}
