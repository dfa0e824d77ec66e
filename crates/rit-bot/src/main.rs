//! RIT agent - entry point.
//!
//! Runs the configured strategy (market maker or tender evaluator) against
//! the case API until the trading window closes or Ctrl-C.

use anyhow::Result;
use clap::Parser;
use rit_bot::{AppConfig, Application, Strategy};
use tracing::{info, warn};

/// RIT market making and tender agent
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via RIT_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Strategy override
    #[arg(short, long, value_enum)]
    strategy: Option<Strategy>,

    /// Run against an in-memory exchange instead of the case API
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Determine config path: CLI arg > RIT_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("RIT_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let mut config = AppConfig::load(&config_path)?;
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }

    rit_telemetry::init_logging(&config.telemetry.log_level)?;
    info!("Starting RIT agent v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_path = %config_path,
        strategy = ?config.strategy,
        base_url = %config.base_url,
        dry_run = args.dry_run,
        "Configuration loaded"
    );
    if !config.has_api_key() && !args.dry_run {
        warn!("No API key configured; the case API will reject requests");
    }

    let client = rit_bot::build_client(&config, args.dry_run)?;
    let shutdown = rit_bot::shutdown_on_ctrl_c();

    let app = Application::new(config, client)?;
    let summary = app.run(shutdown).await?;
    println!("{summary}");

    Ok(())
}
