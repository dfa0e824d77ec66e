//! Main application loop.
//!
//! Reads the case tick, and while it lies inside the trading window runs one
//! strategy step per iteration. Shutdown is cooperative: the token is checked
//! at the top of every iteration and interrupts every sleep.

use crate::config::{AppConfig, Strategy};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rit_client::DynExchangeClient;
use rit_core::{Tick, TradingWindow};
use rit_executor::{OrderGateway, SpeedBump};
use rit_mm::MarketMaker;
use rit_position::InventoryBalancer;
use rit_telemetry::SessionSummary;
use rit_tender::TenderEvaluator;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Strategy selected at startup.
enum Runner {
    MarketMaker(MarketMaker),
    Tender(TenderEvaluator),
}

/// Main application.
pub struct Application {
    gateway: OrderGateway,
    runner: Runner,
    window: TradingWindow,
    loop_interval: Duration,
    started_at: DateTime<Utc>,
}

impl Application {
    /// Create the application around an exchange client.
    pub fn new(config: AppConfig, client: DynExchangeClient) -> AppResult<Self> {
        let speed_bump = SpeedBump::new(config.speed_bump)?;
        let gateway = OrderGateway::new(client, speed_bump);

        let runner = match config.strategy {
            Strategy::MarketMaker => Runner::MarketMaker(MarketMaker::new(config.maker.clone())),
            Strategy::Tender => Runner::Tender(TenderEvaluator::new(
                config.tender.clone(),
                InventoryBalancer::new(config.balancer.clone()),
            )),
        };

        Ok(Self {
            gateway,
            runner,
            window: config.session.window(),
            loop_interval: Duration::from_millis(config.session.loop_interval_ms),
            started_at: Utc::now(),
        })
    }

    /// Run until the window closes, shutdown fires or a fatal error occurs.
    ///
    /// The session summary is logged on every exit path.
    pub async fn run(mut self, shutdown: CancellationToken) -> AppResult<SessionSummary> {
        info!(
            start_guard = self.window.start_guard,
            end_guard = self.window.end_guard,
            strategy = self.strategy_name(),
            "Starting application"
        );

        let result = self.trading_loop(&shutdown).await;
        if let Err(e) = &result {
            error!(error = %e, "Fatal error, stopping");
        }

        let summary = self.summary();
        summary.log();
        result.map(|()| summary)
    }

    /// Summary of the run so far.
    pub fn summary(&self) -> SessionSummary {
        let speed_bump = self.gateway.speed_bump();
        SessionSummary::collect(
            self.started_at,
            speed_bump.placed_orders(),
            speed_bump.average_latency(),
            speed_bump.average_slack(),
        )
    }

    async fn trading_loop(&mut self, shutdown: &CancellationToken) -> AppResult<()> {
        let mut tick = self.gateway.client().case_tick().await?;
        info!(tick, "Case clock read");
        if !self.window.contains(tick) {
            warn!(tick, "Tick outside trading window, nothing to do");
        }

        while !shutdown.is_cancelled() && self.window.contains(tick) {
            match &self.runner {
                Runner::MarketMaker(maker) => {
                    if let Some(action) = maker.on_poll(&mut self.gateway).await? {
                        debug!(tick, ?action, "Maker step");
                    }
                    self.pause(shutdown).await;
                }
                Runner::Tender(evaluator) => {
                    // The evaluator waits on its own when no tender is outstanding.
                    let outcome = evaluator.poll(&mut self.gateway, tick, shutdown).await?;
                    debug!(tick, ?outcome, "Tender step");
                }
            }

            tick = self.next_tick(tick).await?;
        }

        if shutdown.is_cancelled() {
            info!(tick, "Shutdown requested, leaving main loop");
        } else {
            info!(tick, "Trading window closed");
        }
        Ok(())
    }

    /// Re-read the tick; keep `last` on a non-fatal read error.
    async fn next_tick(&self, last: Tick) -> AppResult<Tick> {
        match self.gateway.client().case_tick().await {
            Ok(tick) => Ok(tick),
            Err(e) if e.is_fatal() => Err(AppError::Client(e)),
            Err(e) => {
                warn!(error = %e, last, "Tick read failed, keeping last tick");
                Ok(last)
            }
        }
    }

    async fn pause(&self, shutdown: &CancellationToken) {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = tokio::time::sleep(self.loop_interval) => {}
        }
    }

    fn strategy_name(&self) -> &'static str {
        match self.runner {
            Runner::MarketMaker(_) => "market_maker",
            Runner::Tender(_) => "tender",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rit_client::{ClientError, MockExchange, MockRead};
    use std::sync::Arc;

    fn app(mock: &Arc<MockExchange>) -> Application {
        Application::new(AppConfig::default(), mock.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_failed_tick_read_keeps_last_tick() {
        let mock = Arc::new(MockExchange::new());
        mock.set_tick(120);
        mock.fail_next_read(
            MockRead::Case,
            ClientError::Request {
                status: 500,
                body: "internal".into(),
            },
        );
        let app = app(&mock);

        assert_eq!(app.next_tick(42).await.unwrap(), 42);
        assert_eq!(app.next_tick(42).await.unwrap(), 120);
    }

    #[tokio::test]
    async fn test_fatal_tick_read_propagates() {
        let mock = Arc::new(MockExchange::new());
        mock.set_auth_failure(true);
        let app = app(&mock);

        assert!(matches!(
            app.next_tick(42).await,
            Err(AppError::Client(ClientError::Authentication))
        ));
    }
}
