//! Position unwind state machine.
//!
//! One cycle: read position, decide, submit at most one chunk, wait, re-read.
//!
//! ```text
//! Unbalanced -> PlacingOrder -> Waiting -> Rechecking -> (Unbalanced | Balanced)
//! ```
//!
//! Opportunistic cycles may place nothing when the gate is closed; the loop
//! then just waits for the book to move. Shutdown interrupts at the top of
//! a cycle or during the wait.

use crate::error::PositionResult;
use rit_client::{net_position, ClientError};
use rit_core::{MarketQuote, OrderRequest, OrderSide, PositionSource, Price};
use rit_executor::OrderGateway;
use rit_telemetry::Metrics;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Balancer configuration (`[balancer]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancerConfig {
    /// Maximum quantity per unwind order.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    /// Wait between cycles.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Where the position is read from.
    #[serde(default)]
    pub position_source: PositionSource,
}

fn default_chunk_size() -> u64 {
    1500
}

fn default_poll_interval_ms() -> u64 {
    200
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            poll_interval_ms: default_poll_interval_ms(),
            position_source: PositionSource::default(),
        }
    }
}

/// How to unwind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwindStrategy {
    /// MARKET orders until flat.
    Aggressive,
    /// LIMIT orders at the touch, only while the book is on the right side
    /// of `cost_basis` by more than `commission`.
    Opportunistic { cost_basis: Price, commission: Price },
}

/// Why a cycle placed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Book does not clear the cost basis plus commission.
    GateClosed,
    /// A book side needed for the gate or the price is empty.
    MissingQuote,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GateClosed => "gate_closed",
            Self::MissingQuote => "missing_quote",
        }
    }
}

/// Decision for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnwindPlan {
    /// Position is zero.
    Flat,
    Submit(OrderRequest),
    Skip(SkipReason),
}

/// Decide the next unwind order for `position`.
///
/// `quote` is only consulted by the opportunistic strategy. A long position
/// sells at the best bid when the best ask exceeds `cost + commission`; a
/// short position buys at the best ask when the best bid is below
/// `cost - commission`.
pub fn plan_unwind(
    ticker: &str,
    position: i64,
    chunk_size: u64,
    strategy: UnwindStrategy,
    quote: Option<MarketQuote>,
) -> UnwindPlan {
    let Some(side) = OrderSide::reducing(position) else {
        return UnwindPlan::Flat;
    };
    let quantity = position.unsigned_abs().min(chunk_size.max(1));

    match strategy {
        UnwindStrategy::Aggressive => {
            UnwindPlan::Submit(OrderRequest::market(ticker, side, quantity))
        }
        UnwindStrategy::Opportunistic {
            cost_basis,
            commission,
        } => {
            let quote = quote.unwrap_or_default();
            let (Some(bid), Some(ask)) = (quote.best_bid, quote.best_ask) else {
                return UnwindPlan::Skip(SkipReason::MissingQuote);
            };
            let (open, price) = match side {
                OrderSide::Sell => (ask > cost_basis + commission, bid),
                OrderSide::Buy => (bid < cost_basis - commission, ask),
            };
            if open {
                UnwindPlan::Submit(OrderRequest::limit(ticker, side, quantity, price))
            } else {
                UnwindPlan::Skip(SkipReason::GateClosed)
            }
        }
    }
}

/// Unwind state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceState {
    Unbalanced,
    PlacingOrder,
    Waiting,
    Rechecking,
    /// Position read as zero.
    Balanced,
    /// Shutdown requested before reaching zero.
    Interrupted,
}

/// Result of one `balance` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceOutcome {
    /// Orders accepted by the exchange.
    pub orders_submitted: u32,
    /// Last position read (0 when balanced).
    pub final_position: i64,
    /// `Balanced` or `Interrupted`.
    pub state: BalanceState,
}

/// Drives positions back to zero through the order gateway.
#[derive(Debug, Clone)]
pub struct InventoryBalancer {
    config: BalancerConfig,
}

impl InventoryBalancer {
    pub fn new(config: BalancerConfig) -> Self {
        Self { config }
    }

    /// Unwind `ticker` until flat or `shutdown` fires.
    ///
    /// Rejected orders and non-fatal read errors are logged and retried on
    /// the next cycle. Authentication failures are returned.
    pub async fn balance(
        &self,
        gateway: &mut OrderGateway,
        ticker: &str,
        strategy: UnwindStrategy,
        shutdown: &CancellationToken,
    ) -> PositionResult<BalanceOutcome> {
        let mut state = BalanceState::Unbalanced;
        let mut orders_submitted = 0u32;
        let mut last_position = 0i64;

        loop {
            if shutdown.is_cancelled() {
                transition(&mut state, BalanceState::Interrupted, ticker);
                break;
            }

            let position =
                match net_position(gateway.client(), ticker, self.config.position_source).await {
                    Ok(position) => position,
                    Err(e) => {
                        fatal_or_warn(e, ticker, "position read failed")?;
                        self.wait(shutdown).await;
                        continue;
                    }
                };
            last_position = position;
            Metrics::position(ticker, position);

            let quote = match strategy {
                UnwindStrategy::Aggressive => None,
                UnwindStrategy::Opportunistic { .. } if position != 0 => {
                    match gateway.client().top_of_book(ticker).await {
                        Ok(quote) => Some(quote),
                        Err(e) => {
                            fatal_or_warn(e, ticker, "book read failed")?;
                            self.wait(shutdown).await;
                            continue;
                        }
                    }
                }
                UnwindStrategy::Opportunistic { .. } => None,
            };

            match plan_unwind(ticker, position, self.config.chunk_size, strategy, quote) {
                UnwindPlan::Flat => {
                    transition(&mut state, BalanceState::Balanced, ticker);
                    break;
                }
                UnwindPlan::Submit(request) => {
                    transition(&mut state, BalanceState::PlacingOrder, ticker);
                    debug!(ticker, position, order = %request.label(), "Unwinding");
                    match gateway.submit(&request).await {
                        Ok(_) => orders_submitted += 1,
                        Err(e) if e.is_fatal() => return Err(e.into()),
                        // Logged by the gateway; retry next cycle.
                        Err(_) => {}
                    }
                }
                UnwindPlan::Skip(reason) => {
                    Metrics::unwind_skipped(reason.as_str());
                    debug!(ticker, position, ?quote, reason = reason.as_str(), "Unwind skipped");
                }
            }

            transition(&mut state, BalanceState::Waiting, ticker);
            self.wait(shutdown).await;
            transition(&mut state, BalanceState::Rechecking, ticker);
        }

        let outcome = BalanceOutcome {
            orders_submitted,
            final_position: if state == BalanceState::Balanced {
                0
            } else {
                last_position
            },
            state,
        };
        if orders_submitted > 0 || state == BalanceState::Interrupted {
            info!(
                ticker,
                orders = outcome.orders_submitted,
                final_position = outcome.final_position,
                state = ?outcome.state,
                "Balance finished"
            );
        }
        Ok(outcome)
    }

    /// Aggressively flatten every ticker in `watch_list` with a non-zero position.
    ///
    /// Returns the number of unwind orders accepted.
    pub async fn ensure_flat(
        &self,
        gateway: &mut OrderGateway,
        watch_list: &[String],
        shutdown: &CancellationToken,
    ) -> PositionResult<u32> {
        let mut orders = 0;
        for ticker in watch_list {
            if shutdown.is_cancelled() {
                break;
            }
            let position =
                match net_position(gateway.client(), ticker, self.config.position_source).await {
                    Ok(position) => position,
                    Err(e) => {
                        fatal_or_warn(e, ticker, "position read failed")?;
                        continue;
                    }
                };
            if position != 0 {
                warn!(ticker = %ticker, position, "Position drift detected, flattening");
                let outcome = self
                    .balance(gateway, ticker, UnwindStrategy::Aggressive, shutdown)
                    .await?;
                orders += outcome.orders_submitted;
            }
        }
        Ok(orders)
    }

    async fn wait(&self, shutdown: &CancellationToken) {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)) => {}
        }
    }
}

fn transition(state: &mut BalanceState, next: BalanceState, ticker: &str) {
    trace!(ticker, from = ?*state, to = ?next, "Balance state");
    *state = next;
}

fn fatal_or_warn(e: ClientError, ticker: &str, what: &str) -> PositionResult<()> {
    if e.is_fatal() {
        return Err(e.into());
    }
    warn!(ticker, error = %e, "{what}, retrying next cycle");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rit_client::{MockExchange, MockRead};
    use rit_executor::{SpeedBump, SpeedBumpConfig};
    use rit_core::OrderType;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn price(d: rust_decimal::Decimal) -> Price {
        Price::new(d)
    }

    fn quote(bid: Option<Price>, ask: Option<Price>) -> Option<MarketQuote> {
        Some(MarketQuote::new(bid, ask))
    }

    fn opportunistic() -> UnwindStrategy {
        UnwindStrategy::Opportunistic {
            cost_basis: price(dec!(10.00)),
            commission: price(dec!(0.02)),
        }
    }

    fn setup() -> (Arc<MockExchange>, OrderGateway, InventoryBalancer) {
        let mock = Arc::new(MockExchange::new());
        let speed_bump = SpeedBump::new(SpeedBumpConfig {
            target_orders_per_sec: 1000.0,
        })
        .unwrap();
        let gateway = OrderGateway::new(mock.clone(), speed_bump);
        let balancer = InventoryBalancer::new(BalancerConfig {
            chunk_size: 1500,
            poll_interval_ms: 1,
            position_source: PositionSource::Securities,
        });
        (mock, gateway, balancer)
    }

    #[test]
    fn test_plan_flat() {
        assert_eq!(
            plan_unwind("CRZY", 0, 1500, UnwindStrategy::Aggressive, None),
            UnwindPlan::Flat
        );
    }

    #[test]
    fn test_plan_aggressive_caps_chunk() {
        let plan = plan_unwind("CRZY", -4000, 1500, UnwindStrategy::Aggressive, None);
        assert_eq!(
            plan,
            UnwindPlan::Submit(OrderRequest::market("CRZY", OrderSide::Buy, 1500))
        );
        let plan = plan_unwind("CRZY", 700, 1500, UnwindStrategy::Aggressive, None);
        assert_eq!(
            plan,
            UnwindPlan::Submit(OrderRequest::market("CRZY", OrderSide::Sell, 700))
        );
    }

    #[test]
    fn test_plan_long_sells_at_bid_when_ask_clears_cost() {
        let plan = plan_unwind(
            "CRZY",
            5000,
            1500,
            opportunistic(),
            quote(Some(price(dec!(10.01))), Some(price(dec!(10.03)))),
        );
        assert_eq!(
            plan,
            UnwindPlan::Submit(OrderRequest::limit(
                "CRZY",
                OrderSide::Sell,
                1500,
                price(dec!(10.01))
            ))
        );
    }

    #[test]
    fn test_plan_long_gate_is_strict() {
        // ask == cost + commission does not open the gate
        let plan = plan_unwind(
            "CRZY",
            5000,
            1500,
            opportunistic(),
            quote(Some(price(dec!(10.00))), Some(price(dec!(10.02)))),
        );
        assert_eq!(plan, UnwindPlan::Skip(SkipReason::GateClosed));
    }

    #[test]
    fn test_plan_short_buys_at_ask_when_bid_below_cost() {
        let plan = plan_unwind(
            "CRZY",
            -5000,
            1500,
            opportunistic(),
            quote(Some(price(dec!(9.97))), Some(price(dec!(9.99)))),
        );
        assert_eq!(
            plan,
            UnwindPlan::Submit(OrderRequest::limit(
                "CRZY",
                OrderSide::Buy,
                1500,
                price(dec!(9.99))
            ))
        );

        let plan = plan_unwind(
            "CRZY",
            -5000,
            1500,
            opportunistic(),
            quote(Some(price(dec!(9.98))), Some(price(dec!(10.00)))),
        );
        assert_eq!(plan, UnwindPlan::Skip(SkipReason::GateClosed));
    }

    #[test]
    fn test_plan_missing_side_skips() {
        let plan = plan_unwind(
            "CRZY",
            5000,
            1500,
            opportunistic(),
            quote(None, Some(price(dec!(11.00)))),
        );
        assert_eq!(plan, UnwindPlan::Skip(SkipReason::MissingQuote));
        let plan = plan_unwind("CRZY", -5000, 1500, opportunistic(), None);
        assert_eq!(plan, UnwindPlan::Skip(SkipReason::MissingQuote));
    }

    #[tokio::test]
    async fn test_aggressive_unwind_issues_ceil_orders() {
        let (mock, mut gateway, balancer) = setup();
        mock.set_position("CRZY", 4000);
        let token = CancellationToken::new();

        let outcome = balancer
            .balance(&mut gateway, "CRZY", UnwindStrategy::Aggressive, &token)
            .await
            .unwrap();

        assert_eq!(outcome.state, BalanceState::Balanced);
        assert_eq!(outcome.orders_submitted, 3);
        assert_eq!(outcome.final_position, 0);
        assert_eq!(mock.position("CRZY"), 0);

        let quantities: Vec<u64> = mock.submissions().iter().map(|r| r.quantity).collect();
        assert_eq!(quantities, vec![1500, 1500, 1000]);
        assert!(mock
            .submissions()
            .iter()
            .all(|r| r.order_type == OrderType::Market && r.action == OrderSide::Sell));
    }

    #[tokio::test]
    async fn test_balanced_position_places_nothing() {
        let (mock, mut gateway, balancer) = setup();
        let token = CancellationToken::new();
        let outcome = balancer
            .balance(&mut gateway, "TAME", UnwindStrategy::Aggressive, &token)
            .await
            .unwrap();
        assert_eq!(outcome.state, BalanceState::Balanced);
        assert!(mock.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_order_is_retried() {
        let (mock, mut gateway, balancer) = setup();
        mock.set_position("CRZY", -1000);
        mock.fail_next_order(ClientError::Request {
            status: 500,
            body: "busy".into(),
        });
        let token = CancellationToken::new();

        let outcome = balancer
            .balance(&mut gateway, "CRZY", UnwindStrategy::Aggressive, &token)
            .await
            .unwrap();
        assert_eq!(outcome.orders_submitted, 1);
        assert_eq!(mock.submissions().len(), 2);
        assert_eq!(mock.position("CRZY"), 0);
    }

    #[tokio::test]
    async fn test_failed_position_read_is_retried() {
        let (mock, mut gateway, balancer) = setup();
        mock.set_position("CRZY", 1200);
        mock.fail_next_read(
            MockRead::Security,
            ClientError::Request {
                status: 500,
                body: "busy".into(),
            },
        );
        let token = CancellationToken::new();

        let outcome = balancer
            .balance(&mut gateway, "CRZY", UnwindStrategy::Aggressive, &token)
            .await
            .unwrap();
        assert_eq!(outcome.state, BalanceState::Balanced);
        assert_eq!(outcome.orders_submitted, 1);
        assert_eq!(mock.submissions().len(), 1);
        assert_eq!(mock.position("CRZY"), 0);
    }

    #[tokio::test]
    async fn test_auth_failure_is_fatal() {
        let (mock, mut gateway, balancer) = setup();
        mock.set_auth_failure(true);
        let token = CancellationToken::new();
        let result = balancer
            .balance(&mut gateway, "CRZY", UnwindStrategy::Aggressive, &token)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_opportunistic_unwind_fills_when_gate_open() {
        let (mock, mut gateway, balancer) = setup();
        mock.set_fill_limits(true);
        mock.set_position("CRZY", 2000);
        mock.set_book("CRZY", Some(price(dec!(10.05))), Some(price(dec!(10.07))));
        let token = CancellationToken::new();

        let outcome = balancer
            .balance(&mut gateway, "CRZY", opportunistic(), &token)
            .await
            .unwrap();
        assert_eq!(outcome.state, BalanceState::Balanced);
        assert_eq!(outcome.orders_submitted, 2);
        assert!(mock
            .submissions()
            .iter()
            .all(|r| r.order_type == OrderType::Limit && r.price == Some(price(dec!(10.05)))));
    }

    #[tokio::test]
    async fn test_opportunistic_gate_closed_until_shutdown() {
        let (mock, mut gateway, balancer) = setup();
        mock.set_position("CRZY", 2000);
        mock.set_book("CRZY", Some(price(dec!(9.95))), Some(price(dec!(9.97))));
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            canceller.cancel();
        });

        let outcome = balancer
            .balance(&mut gateway, "CRZY", opportunistic(), &token)
            .await
            .unwrap();
        assert_eq!(outcome.state, BalanceState::Interrupted);
        assert_eq!(outcome.final_position, 2000);
        assert!(mock.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_flat_only_touches_drifted_tickers() {
        let (mock, mut gateway, balancer) = setup();
        mock.set_position("TAME", 300);
        let token = CancellationToken::new();
        let watch = vec!["CRZY".to_string(), "TAME".to_string()];

        let orders = balancer
            .ensure_flat(&mut gateway, &watch, &token)
            .await
            .unwrap();
        assert_eq!(orders, 1);
        assert_eq!(mock.position("TAME"), 0);
        assert!(mock.submissions().iter().all(|r| r.ticker == "TAME"));
    }

    #[test]
    fn test_config_defaults() {
        let config: BalancerConfig = toml::from_str("").unwrap();
        assert_eq!(config, BalancerConfig::default());
        assert_eq!(config.chunk_size, 1500);
    }
}
