//! Reads parameterised by data source.

use crate::client::ExchangeClient;
use crate::error::ClientResult;
use rit_core::{Order, OrderStatus, PositionSource, Price, PriceSource};

/// Net position of `ticker`; 0 if the exchange does not list it.
pub async fn net_position(
    client: &dyn ExchangeClient,
    ticker: &str,
    source: PositionSource,
) -> ClientResult<i64> {
    match source {
        PositionSource::Securities => Ok(client
            .security(ticker)
            .await?
            .map_or(0, |security| security.position)),
        PositionSource::Transacted => Ok(client
            .orders(OrderStatus::Transacted, Some(ticker))
            .await?
            .iter()
            .map(Order::signed_filled)
            .sum()),
    }
}

/// Reference ("last") price of `ticker`; `None` if nothing has traded yet.
pub async fn reference_price(
    client: &dyn ExchangeClient,
    ticker: &str,
    source: PriceSource,
) -> ClientResult<Option<Price>> {
    match source {
        PriceSource::Last => Ok(client.security(ticker).await?.and_then(|s| s.last)),
        PriceSource::HistoryClose => client.last_close(ticker).await,
    }
}

/// Number of OPEN orders for `ticker`.
pub async fn open_order_count(client: &dyn ExchangeClient, ticker: &str) -> ClientResult<usize> {
    Ok(client.orders(OrderStatus::Open, Some(ticker)).await?.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockExchange;
    use rit_core::{OrderRequest, OrderSide};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_position_sources_agree_after_fills() {
        let mock = MockExchange::new();
        mock.place_order(&OrderRequest::market("ALGO", OrderSide::Buy, 1000))
            .await
            .unwrap();
        mock.place_order(&OrderRequest::market("ALGO", OrderSide::Sell, 400))
            .await
            .unwrap();

        let from_orders = net_position(&mock, "ALGO", PositionSource::Transacted)
            .await
            .unwrap();
        let from_securities = net_position(&mock, "ALGO", PositionSource::Securities)
            .await
            .unwrap();
        assert_eq!(from_orders, 600);
        assert_eq!(from_securities, 600);
    }

    #[tokio::test]
    async fn test_transacted_position_ignores_other_tickers() {
        let mock = MockExchange::new();
        mock.set_position("CRZY", 300);
        mock.set_position("TAME", -700);
        let pos = net_position(&mock, "CRZY", PositionSource::Transacted)
            .await
            .unwrap();
        assert_eq!(pos, 300);
    }

    #[tokio::test]
    async fn test_reference_price_missing() {
        let mock = MockExchange::new();
        assert_eq!(
            reference_price(&mock, "ALGO", PriceSource::HistoryClose)
                .await
                .unwrap(),
            None
        );
        mock.set_price("ALGO", Price::new(dec!(20.00)));
        assert_eq!(
            reference_price(&mock, "ALGO", PriceSource::Last).await.unwrap(),
            Some(Price::new(dec!(20.00)))
        );
    }

    #[tokio::test]
    async fn test_open_order_count() {
        let mock = MockExchange::new();
        mock.add_open_order("ALGO", OrderSide::Buy, 1000, Price::new(dec!(19.97)));
        mock.add_open_order("CRZY", OrderSide::Sell, 1000, Price::new(dec!(10.00)));
        assert_eq!(open_order_count(&mock, "ALGO").await.unwrap(), 1);
    }
}
