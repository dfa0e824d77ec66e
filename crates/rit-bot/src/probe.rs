//! Exchange throughput harness.
//!
//! Sends a fixed batch of far-from-market LIMIT BUY orders through the
//! gateway to observe how the speed bump settles against the exchange's
//! order-rate limit. Stops at the first rejected order.

use crate::config::ProbeConfig;
use crate::error::AppResult;
use rit_core::{OrderRequest, OrderSide};
use rit_executor::OrderGateway;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What the harness managed to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    pub planned: u64,
    pub accepted: u64,
    /// A rejection ended the run early.
    pub rejected: bool,
}

pub struct ThroughputProbe {
    config: ProbeConfig,
}

impl ThroughputProbe {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub async fn run(
        &self,
        gateway: &mut OrderGateway,
        shutdown: &CancellationToken,
    ) -> AppResult<ProbeReport> {
        let planned = self.config.order_count();
        let request = OrderRequest::limit(
            &self.config.ticker,
            OrderSide::Buy,
            self.config.order_size,
            self.config.price,
        );
        info!(
            ticker = %self.config.ticker,
            orders = planned,
            order = %request.label(),
            "Starting throughput probe"
        );

        let mut report = ProbeReport {
            planned,
            accepted: 0,
            rejected: false,
        };
        for _ in 0..planned {
            if shutdown.is_cancelled() {
                info!("Shutdown requested, stopping probe");
                break;
            }
            match gateway.submit(&request).await {
                Ok(_) => report.accepted += 1,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, accepted = report.accepted, "Order rejected, stopping probe");
                    report.rejected = true;
                    break;
                }
            }
        }
        Ok(report)
    }
}
