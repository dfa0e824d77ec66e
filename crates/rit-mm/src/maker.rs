//! Quote lifecycle.
//!
//! Each poll reads the net position, the number of open orders and the
//! reference price, then applies one of four actions:
//!
//! - `|position| > threshold`: cancel everything, place one order that
//!   reduces the position at the far side of the spread
//! - no open orders: place the bid, then the ask
//! - exactly two open orders: hold
//! - any other count: cancel everything and wait for the next poll

use crate::config::MakerConfig;
use crate::error::MakerResult;
use rit_client::{net_position, open_order_count, reference_price, ClientError};
use rit_core::{OrderRequest, OrderSide, Price};
use rit_executor::OrderGateway;
use tracing::{debug, info, warn};

/// Action chosen for one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MakerAction {
    /// Both quotes are resting.
    Hold,
    /// Place a fresh bid/ask pair.
    Quote { bid: OrderRequest, ask: OrderRequest },
    /// Partial fill or stray orders: cancel all, requote next poll.
    Reset,
    /// Inventory over threshold: cancel all, then one reducing order.
    Correct(OrderRequest),
}

/// Decide the action for one poll.
pub fn plan(config: &MakerConfig, position: i64, open_orders: usize, last: Price) -> MakerAction {
    let bid_price = (last - config.spread).round_dp(2);
    let ask_price = (last + config.spread).round_dp(2);

    if position.unsigned_abs() > config.position_threshold {
        return match OrderSide::reducing(position) {
            Some(OrderSide::Sell) => MakerAction::Correct(OrderRequest::limit(
                &config.ticker,
                OrderSide::Sell,
                config.sell_volume,
                ask_price,
            )),
            _ => MakerAction::Correct(OrderRequest::limit(
                &config.ticker,
                OrderSide::Buy,
                config.buy_volume,
                bid_price,
            )),
        };
    }

    match open_orders {
        0 => MakerAction::Quote {
            bid: OrderRequest::limit(&config.ticker, OrderSide::Buy, config.buy_volume, bid_price),
            ask: OrderRequest::limit(
                &config.ticker,
                OrderSide::Sell,
                config.sell_volume,
                ask_price,
            ),
        },
        2 => MakerAction::Hold,
        _ => MakerAction::Reset,
    }
}

/// Symmetric two-sided quoter.
pub struct MarketMaker {
    config: MakerConfig,
}

impl MarketMaker {
    pub fn new(config: MakerConfig) -> Self {
        Self { config }
    }

    /// Run one poll. Returns `None` when the cycle was skipped for lack of data.
    pub async fn on_poll(&self, gateway: &mut OrderGateway) -> MakerResult<Option<MakerAction>> {
        let ticker = self.config.ticker.as_str();
        let client = gateway.client();

        let position = match net_position(client, ticker, self.config.position_source).await {
            Ok(position) => position,
            Err(e) => return skip(e, ticker, "position"),
        };
        let open_orders = match open_order_count(client, ticker).await {
            Ok(count) => count,
            Err(e) => return skip(e, ticker, "open orders"),
        };
        let last = match reference_price(client, ticker, self.config.price_source).await {
            Ok(Some(last)) => last,
            Ok(None) => {
                debug!(ticker, "No reference price yet, skipping cycle");
                return Ok(None);
            }
            Err(e) => return skip(e, ticker, "reference price"),
        };
        rit_telemetry::Metrics::position(ticker, position);

        let action = plan(&self.config, position, open_orders, last);
        debug!(ticker, position, open_orders, last = %last, ?action, "Maker poll");

        match &action {
            MakerAction::Hold => {}
            MakerAction::Quote { bid, ask } => {
                submit(gateway, bid).await?;
                submit(gateway, ask).await?;
            }
            MakerAction::Reset => {
                info!(ticker, open_orders, "Unbalanced quotes, cancelling all");
                cancel(gateway).await?;
            }
            MakerAction::Correct(order) => {
                warn!(
                    ticker,
                    position,
                    threshold = self.config.position_threshold,
                    "Position over threshold, correcting"
                );
                cancel(gateway).await?;
                submit(gateway, order).await?;
            }
        }
        Ok(Some(action))
    }
}

fn skip(e: ClientError, ticker: &str, what: &str) -> MakerResult<Option<MakerAction>> {
    if e.is_fatal() {
        return Err(e.into());
    }
    warn!(ticker, error = %e, "Failed to read {what}, skipping cycle");
    Ok(None)
}

async fn submit(gateway: &mut OrderGateway, request: &OrderRequest) -> MakerResult<()> {
    match gateway.submit(request).await {
        Err(e) if e.is_fatal() => Err(e.into()),
        // Rejections are logged by the gateway.
        _ => Ok(()),
    }
}

async fn cancel(gateway: &OrderGateway) -> MakerResult<()> {
    match gateway.cancel_all().await {
        Ok(_) => Ok(()),
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(e) => {
            warn!(error = %e, "Cancel all failed");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rit_client::{MockExchange, MockRead};
    use rit_executor::{SpeedBump, SpeedBumpConfig};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn p(d: rust_decimal::Decimal) -> Price {
        Price::new(d)
    }

    fn setup() -> (Arc<MockExchange>, OrderGateway, MarketMaker) {
        let mock = Arc::new(MockExchange::new());
        let speed_bump = SpeedBump::new(SpeedBumpConfig {
            target_orders_per_sec: 1000.0,
        })
        .unwrap();
        let gateway = OrderGateway::new(mock.clone(), speed_bump);
        (mock, gateway, MarketMaker::new(MakerConfig::default()))
    }

    #[test]
    fn test_plan_fresh_quotes() {
        let config = MakerConfig::default();
        assert_eq!(
            plan(&config, 0, 0, p(dec!(20.00))),
            MakerAction::Quote {
                bid: OrderRequest::limit("ALGO", OrderSide::Buy, 1000, p(dec!(19.97))),
                ask: OrderRequest::limit("ALGO", OrderSide::Sell, 1000, p(dec!(20.03))),
            }
        );
    }

    #[test]
    fn test_plan_hold_and_reset() {
        let config = MakerConfig::default();
        assert_eq!(plan(&config, 200, 2, p(dec!(20.00))), MakerAction::Hold);
        assert_eq!(plan(&config, 200, 1, p(dec!(20.00))), MakerAction::Reset);
        assert_eq!(plan(&config, 200, 3, p(dec!(20.00))), MakerAction::Reset);
    }

    #[test]
    fn test_plan_correct_long_and_short() {
        let config = MakerConfig::default();
        assert_eq!(
            plan(&config, 501, 2, p(dec!(20.00))),
            MakerAction::Correct(OrderRequest::limit(
                "ALGO",
                OrderSide::Sell,
                1000,
                p(dec!(20.03))
            ))
        );
        assert_eq!(
            plan(&config, -800, 0, p(dec!(20.00))),
            MakerAction::Correct(OrderRequest::limit(
                "ALGO",
                OrderSide::Buy,
                1000,
                p(dec!(19.97))
            ))
        );
        // Exactly at the threshold is still normal quoting.
        assert_eq!(plan(&config, 500, 2, p(dec!(20.00))), MakerAction::Hold);
    }

    #[tokio::test]
    async fn test_poll_places_bid_then_ask() {
        let (mock, mut gateway, maker) = setup();
        mock.set_price("ALGO", p(dec!(20.00)));

        let action = maker.on_poll(&mut gateway).await.unwrap();
        assert!(matches!(action, Some(MakerAction::Quote { .. })));

        let submissions = mock.submissions();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].label(), "BUY 1000@19.97");
        assert_eq!(submissions[1].label(), "SELL 1000@20.03");
        assert_eq!(mock.open_orders().len(), 2);

        // Next poll holds.
        let action = maker.on_poll(&mut gateway).await.unwrap();
        assert_eq!(action, Some(MakerAction::Hold));
        assert_eq!(mock.submissions().len(), 2);
    }

    #[tokio::test]
    async fn test_poll_corrective_cancels_then_one_order() {
        let (mock, mut gateway, maker) = setup();
        mock.set_price("ALGO", p(dec!(20.00)));
        mock.set_position("ALGO", 1200);
        mock.add_open_order("ALGO", OrderSide::Buy, 1000, p(dec!(19.90)));
        mock.add_open_order("ALGO", OrderSide::Sell, 1000, p(dec!(20.10)));

        maker.on_poll(&mut gateway).await.unwrap();
        assert_eq!(mock.cancel_calls(), 1);
        let submissions = mock.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].label(), "SELL 1000@20.03");
        assert_eq!(mock.open_orders().len(), 1);
    }

    #[tokio::test]
    async fn test_poll_resets_on_single_open_order() {
        let (mock, mut gateway, maker) = setup();
        mock.set_price("ALGO", p(dec!(20.00)));
        mock.add_open_order("ALGO", OrderSide::Sell, 1000, p(dec!(20.03)));

        let action = maker.on_poll(&mut gateway).await.unwrap();
        assert_eq!(action, Some(MakerAction::Reset));
        assert_eq!(mock.cancel_calls(), 1);
        assert!(mock.submissions().is_empty());
        assert!(mock.open_orders().is_empty());
    }

    #[tokio::test]
    async fn test_poll_skips_without_price() {
        let (mock, mut gateway, maker) = setup();
        let action = maker.on_poll(&mut gateway).await.unwrap();
        assert_eq!(action, None);
        assert!(mock.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_failed_position_read_skips_cycle() {
        let (mock, mut gateway, maker) = setup();
        mock.set_price("ALGO", p(dec!(20.00)));
        mock.fail_next_read(MockRead::Orders, ClientError::Malformed("eof".into()));

        let action = maker.on_poll(&mut gateway).await.unwrap();
        assert_eq!(action, None);
        assert!(mock.submissions().is_empty());
        assert_eq!(mock.cancel_calls(), 0);

        // The next poll quotes normally.
        let action = maker.on_poll(&mut gateway).await.unwrap();
        assert!(matches!(action, Some(MakerAction::Quote { .. })));
        assert_eq!(mock.submissions().len(), 2);
    }

    #[tokio::test]
    async fn test_poll_auth_failure_is_fatal() {
        let (mock, mut gateway, maker) = setup();
        mock.set_auth_failure(true);
        assert!(maker.on_poll(&mut gateway).await.is_err());
    }
}
