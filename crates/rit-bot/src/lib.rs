//! RIT market making and tender agent.
//!
//! Main application that wires the components together:
//! - Exchange client (HTTP or in-memory mock for dry runs)
//! - Order gateway with the adaptive speed bump
//! - Strategy: symmetric market maker or tender evaluator
//! - Trading-window main loop with cooperative shutdown

pub mod app;
pub mod config;
pub mod error;
pub mod probe;

pub use app::Application;
pub use config::{AppConfig, ProbeConfig, SessionConfig, Strategy, TelemetryConfig};
pub use error::{AppError, AppResult};
pub use probe::{ProbeReport, ThroughputProbe};

use rit_client::{DynExchangeClient, HttpExchangeClient, MockExchange};
use rit_core::Price;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Build the exchange client for `config`.
///
/// With `dry_run` the agent talks to an in-memory exchange that advances one
/// tick per read, seeded with prices and books for the configured tickers.
pub fn build_client(config: &AppConfig, dry_run: bool) -> AppResult<DynExchangeClient> {
    if dry_run {
        warn!("Dry run: using in-memory exchange, no orders reach the case");
        return Ok(Arc::new(dry_run_exchange(config)));
    }
    let client =
        HttpExchangeClient::new(&config.base_url, &config.api_key_header, &config.api_key)?;
    Ok(Arc::new(client))
}

fn dry_run_exchange(config: &AppConfig) -> MockExchange {
    let mock = MockExchange::new();
    mock.set_tick(config.session.start_guard);
    mock.set_tick_step(1);
    let mid = Price::new(Decimal::new(2000, 2));
    let half = Price::new(Decimal::new(1, 2));
    let mut tickers = vec![config.maker.ticker.clone(), config.probe.ticker.clone()];
    tickers.extend(config.tender.watch_list.iter().cloned());
    for ticker in tickers {
        mock.set_price(&ticker, mid);
        mock.set_book(&ticker, Some(mid - half), Some(mid + half));
    }
    mock
}

/// Cancellation token fired on Ctrl-C.
pub fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
        }
        trigger.cancel();
    });
    token
}
