//! Signal-driven single-position trading bot — main entry point.
//!
//! Boots the trading service over the data directory and serves the control
//! surface: signal intake, config/status, trade history, error log, and the
//! assets overview. Orders themselves run on their own tasks behind the
//! service's order lock.

use anyhow::Result;
use clap::Parser;
use signalbot::server;
use signalbot::service::TradingService;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

/// Signal-driven single-position DEX trading bot
#[derive(Parser)]
#[command(name = "signalbot")]
struct Args {
    /// Directory holding config and durable trading state
    #[arg(short, long, env = "DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Port for the control surface
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();

    info!("Signalbot starting...");

    let service = Arc::new(TradingService::new(args.data_dir.clone()));

    let config = service.config();
    info!(
        "Active chain: {} (chain_id: {})",
        config.active_chain.display_name, config.active_chain.id
    );
    info!(
        "Pair: {} -> {} | size: {} | min balance: {}",
        config.tokens.stablecoin, config.tokens.token, config.strategy.size, config.strategy.min
    );
    info!("Bot enabled: {}", config.status);

    let app = server::router(Arc::clone(&service));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port)).await?;
    info!("Control surface listening on port {}", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
