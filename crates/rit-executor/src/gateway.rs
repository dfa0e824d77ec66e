//! Order gateway.
//!
//! Every order in the process goes through [`OrderGateway::submit`], which
//! times the request and feeds the latency to the single [`SpeedBump`].
//! Rejected orders are recorded as well.

use crate::speed_bump::SpeedBump;
use rit_client::{ClientResult, DynExchangeClient, ExchangeClient};
use rit_core::{OrderAck, OrderRequest};
use rit_telemetry::Metrics;
use std::time::Instant;
use tracing::{info, warn};

/// Owns the exchange handle and the process-wide speed bump.
pub struct OrderGateway {
    client: DynExchangeClient,
    speed_bump: SpeedBump,
}

impl OrderGateway {
    pub fn new(client: DynExchangeClient, speed_bump: SpeedBump) -> Self {
        Self { client, speed_bump }
    }

    /// Exchange handle for reads.
    pub fn client(&self) -> &dyn ExchangeClient {
        self.client.as_ref()
    }

    pub fn speed_bump(&self) -> &SpeedBump {
        &self.speed_bump
    }

    /// Submit one order, then apply the speed bump delay.
    pub async fn submit(&mut self, request: &OrderRequest) -> ClientResult<OrderAck> {
        let started = Instant::now();
        let result = self.client.place_order(request).await;
        let latency = started.elapsed();
        Metrics::order_latency(latency.as_secs_f64() * 1000.0);

        let reading = self.speed_bump.record_and_delay(latency).await;
        Metrics::speed_bump_delay(reading.average_slack * 1000.0);

        match &result {
            Ok(ack) => {
                Metrics::order_submitted(request.action.as_str(), request.order_type.as_str());
                info!(
                    ticker = %request.ticker,
                    order_id = ack.order_id,
                    "Order placed: {} | tx={:.3}s sb={:.3}s avg_sb={:.3}s",
                    request.label(),
                    latency.as_secs_f64(),
                    reading.slack,
                    reading.average_slack,
                );
            }
            Err(e) => {
                Metrics::order_rejected(e.kind());
                warn!(
                    ticker = %request.ticker,
                    error = %e,
                    "Order rejected: {} | tx={:.3}s",
                    request.label(),
                    latency.as_secs_f64(),
                );
            }
        }

        result
    }

    /// Cancel every open order.
    pub async fn cancel_all(&self) -> ClientResult<Vec<u64>> {
        let cancelled = self.client.cancel_all().await?;
        info!(count = cancelled.len(), ids = ?cancelled, "Cancelled open orders");
        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speed_bump::SpeedBumpConfig;
    use rit_client::{ClientError, MockExchange};
    use rit_core::{OrderSide, Price};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn gateway(mock: &Arc<MockExchange>) -> OrderGateway {
        // High rate so the tests do not sleep noticeably.
        let speed_bump = SpeedBump::new(SpeedBumpConfig {
            target_orders_per_sec: 1000.0,
        })
        .unwrap();
        OrderGateway::new(mock.clone(), speed_bump)
    }

    #[tokio::test]
    async fn test_submit_counts_accepted_orders() {
        let mock = Arc::new(MockExchange::new());
        let mut gw = gateway(&mock);
        let req = OrderRequest::limit("ALGO", OrderSide::Buy, 1000, Price::new(dec!(19.97)));

        let ack = gw.submit(&req).await.unwrap();
        assert_eq!(ack.order_id, 1);
        assert_eq!(gw.speed_bump().placed_orders(), 1);
        assert_eq!(mock.submissions(), vec![req]);
    }

    #[tokio::test]
    async fn test_rejected_order_still_feeds_speed_bump() {
        let mock = Arc::new(MockExchange::new());
        mock.fail_next_order(ClientError::Request {
            status: 429,
            body: "too fast".into(),
        });
        let mut gw = gateway(&mock);
        let req = OrderRequest::market("CRZY", OrderSide::Sell, 1500);

        assert!(gw.submit(&req).await.is_err());
        assert_eq!(gw.speed_bump().placed_orders(), 1);
    }

    #[tokio::test]
    async fn test_cancel_all_passes_ids_through() {
        let mock = Arc::new(MockExchange::new());
        mock.add_open_order("ALGO", OrderSide::Buy, 1000, Price::new(dec!(19.97)));
        let gw = gateway(&mock);
        assert_eq!(gw.cancel_all().await.unwrap(), vec![1]);
    }
}
