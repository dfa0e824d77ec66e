//! Tender decision rule and accept protocol.
//!
//! ```text
//! Detected -> TimeGated -> Decline
//!          -> PriceEvaluated -> Accept (flatten, accept, limit unwind)
//!                            -> Decline
//! ```
//!
//! `tender.action` is the institution's side. An institution BUY is worth
//! taking when the market trades above the tender price (the agent sells
//! high and buys back lower); an institution SELL when it trades below.

use crate::config::TenderConfig;
use crate::error::TenderResult;
use rit_client::{reference_price, ClientError};
use rit_core::{OrderSide, Price, Tender, Tick};
use rit_executor::OrderGateway;
use rit_position::{InventoryBalancer, UnwindStrategy};
use rit_telemetry::Metrics;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why a tender was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// Too close to the end of the period to unwind.
    TooLate { tick: Tick },
    /// Edge below the threshold.
    ThinEdge { edge: Price },
    /// No reference price to compare against.
    NoPrice,
}

impl DeclineReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooLate { .. } => "too_late",
            Self::ThinEdge { .. } => "thin_edge",
            Self::NoPrice => "no_price",
        }
    }
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLate { tick } => write!(f, "too late in period (tick {tick})"),
            Self::ThinEdge { edge } => write!(f, "edge {edge} below threshold"),
            Self::NoPrice => write!(f, "no reference price"),
        }
    }
}

/// Outcome of evaluating one tender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenderDecision {
    Accept { edge: Price },
    Decline(DeclineReason),
}

impl TenderDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept { .. })
    }
}

/// Decide whether to take `tender` at `tick` given the reference price.
///
/// The time gate is checked first, so `last` may be `None` for a late tender.
pub fn evaluate(
    tender: &Tender,
    tick: Tick,
    last: Option<Price>,
    config: &TenderConfig,
) -> TenderDecision {
    if tick >= config.cutoff_tick() {
        return TenderDecision::Decline(DeclineReason::TooLate { tick });
    }
    let Some(last) = last else {
        return TenderDecision::Decline(DeclineReason::NoPrice);
    };

    let edge = match tender.action {
        OrderSide::Buy => last - tender.price,
        OrderSide::Sell => tender.price - last,
    };
    if edge >= config.price_threshold {
        TenderDecision::Accept { edge }
    } else {
        TenderDecision::Decline(DeclineReason::ThinEdge { edge })
    }
}

/// What one poll did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Accepted { tender_id: u64 },
    Declined { tender_id: u64, reason: DeclineReason },
    /// No tender outstanding; drifted tickers were flattened.
    Idle { drift_orders: u32 },
}

/// Polls for tenders and runs the accept/decline protocol.
pub struct TenderEvaluator {
    config: TenderConfig,
    balancer: InventoryBalancer,
}

impl TenderEvaluator {
    pub fn new(config: TenderConfig, balancer: InventoryBalancer) -> Self {
        Self { config, balancer }
    }

    /// Handle at most one tender, or flatten drift and wait when there is none.
    pub async fn poll(
        &self,
        gateway: &mut OrderGateway,
        tick: Tick,
        shutdown: &CancellationToken,
    ) -> TenderResult<PollOutcome> {
        let tenders = match gateway.client().tenders().await {
            Ok(tenders) => tenders,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Tender read failed");
                Vec::new()
            }
        };

        if let Some(tender) = tenders.into_iter().next() {
            return self.handle(gateway, &tender, tick, shutdown).await;
        }

        let drift_orders = self
            .balancer
            .ensure_flat(gateway, &self.config.watch_list, shutdown)
            .await?;
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)) => {}
        }
        Ok(PollOutcome::Idle { drift_orders })
    }

    /// Evaluate `tender` and accept or decline it.
    pub async fn handle(
        &self,
        gateway: &mut OrderGateway,
        tender: &Tender,
        tick: Tick,
        shutdown: &CancellationToken,
    ) -> TenderResult<PollOutcome> {
        let last = if tick >= self.config.cutoff_tick() {
            None
        } else {
            match reference_price(gateway.client(), &tender.ticker, self.config.price_source).await
            {
                Ok(last) => last,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!(ticker = %tender.ticker, error = %e, "Reference price read failed");
                    None
                }
            }
        };

        info!(
            tender_id = tender.tender_id,
            ticker = %tender.ticker,
            action = %tender.action,
            quantity = tender.quantity,
            price = %tender.price,
            last = ?last.map(|p| p.to_string()),
            tick,
            "Tender received"
        );

        match evaluate(tender, tick, last, &self.config) {
            TenderDecision::Accept { edge } => {
                Metrics::tender_decision("accept", "edge");
                info!(tender_id = tender.tender_id, edge = %edge, "Accepting tender");
                self.accept(gateway, tender, shutdown).await?;
                Ok(PollOutcome::Accepted {
                    tender_id: tender.tender_id,
                })
            }
            TenderDecision::Decline(reason) => {
                Metrics::tender_decision("decline", reason.as_str());
                info!(tender_id = tender.tender_id, %reason, "Declining tender");
                if let Err(e) = gateway.client().decline_tender(tender.tender_id).await {
                    log_tender_call_failure(&e, tender.tender_id, "decline")?;
                }
                Ok(PollOutcome::Declined {
                    tender_id: tender.tender_id,
                    reason,
                })
            }
        }
    }

    async fn accept(
        &self,
        gateway: &mut OrderGateway,
        tender: &Tender,
        shutdown: &CancellationToken,
    ) -> TenderResult<()> {
        let before = self
            .balancer
            .balance(gateway, &tender.ticker, UnwindStrategy::Aggressive, shutdown)
            .await?;
        debug!(
            ticker = %tender.ticker,
            orders = before.orders_submitted,
            "Flat before accepting"
        );

        if let Err(e) = gateway.client().accept_tender(tender.tender_id).await {
            log_tender_call_failure(&e, tender.tender_id, "accept")?;
        }

        let strategy = UnwindStrategy::Opportunistic {
            cost_basis: tender.price,
            commission: self.config.commission,
        };
        let after = self
            .balancer
            .balance(gateway, &tender.ticker, strategy, shutdown)
            .await?;
        info!(
            tender_id = tender.tender_id,
            orders = after.orders_submitted,
            state = ?after.state,
            "Tender unwind finished"
        );
        Ok(())
    }
}

fn log_tender_call_failure(e: &ClientError, tender_id: u64, call: &str) -> TenderResult<()> {
    if e.is_fatal() {
        return Err(e.clone().into());
    }
    warn!(tender_id, error = %e, "Tender {call} failed, not retrying");
    Ok(())
}
