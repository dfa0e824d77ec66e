//! REST client for the case API.
//!
//! Every request carries the API key through the client's default headers.
//! Responses are classified into [`ClientError`] variants so callers can tell
//! a rejected key (fatal) from a transient failure (retry on next poll).

use crate::client::{BoxFuture, ExchangeClient};
use crate::error::{ClientError, ClientResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode};
use rit_core::{
    CaseInfo, HistoryBar, MarketQuote, Order, OrderAck, OrderBook, OrderRequest, OrderStatus,
    Price, Security, Tender,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Default base URL of the desktop client's API.
pub const DEFAULT_BASE_URL: &str = "http://localhost:9999/v1";

/// Header the API key is sent in.
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct CancelResponse {
    #[serde(default)]
    cancelled_order_ids: Vec<u64>,
}

/// Exchange client over HTTP.
pub struct HttpExchangeClient {
    client: Client,
    base_url: String,
}

impl HttpExchangeClient {
    /// Create a client for `base_url` sending `api_key` in `header_name`.
    pub fn new(base_url: impl Into<String>, header_name: &str, api_key: &str) -> ClientResult<Self> {
        Self::with_timeout(base_url, header_name, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        header_name: &str,
        api_key: &str,
        timeout: Duration,
    ) -> ClientResult<Self> {
        let name = HeaderName::from_bytes(header_name.as_bytes())
            .map_err(|e| ClientError::Setup(format!("invalid header name '{header_name}': {e}")))?;
        let mut value = HeaderValue::from_str(api_key)
            .map_err(|e| ClientError::Setup(format!("invalid API key: {e}")))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(name, value);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Setup(format!("Failed to create HTTP client: {e}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!(base_url = %base_url, "Exchange client created");

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        if let Some(err) = classify(status, &body) {
            return Err(err);
        }
        serde_json::from_str(&body).map_err(|e| ClientError::Malformed(format!("{e}: {body}")))
    }

    async fn execute(&self, request: RequestBuilder) -> ClientResult<()> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match classify(status, &body) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn transport(e: reqwest::Error) -> ClientError {
    ClientError::Transport(e.to_string())
}

/// Map a non-success status to an error. `None` for 2xx.
fn classify(status: StatusCode, body: &str) -> Option<ClientError> {
    if status == StatusCode::UNAUTHORIZED {
        Some(ClientError::Authentication)
    } else if !status.is_success() {
        Some(ClientError::Request {
            status: status.as_u16(),
            body: body.to_string(),
        })
    } else {
        None
    }
}

/// Query parameters for `POST /orders`.
fn order_query(request: &OrderRequest) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("ticker", request.ticker.clone()),
        ("type", request.order_type.as_str().to_string()),
        ("quantity", request.quantity.to_string()),
        ("action", request.action.as_str().to_string()),
    ];
    if let Some(price) = request.price {
        query.push(("price", price.to_string()));
    }
    query
}

impl ExchangeClient for HttpExchangeClient {
    fn case(&self) -> BoxFuture<'_, ClientResult<CaseInfo>> {
        Box::pin(async move { self.fetch(self.client.get(self.url("case"))).await })
    }

    fn security<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, ClientResult<Option<Security>>> {
        Box::pin(async move {
            let request = self
                .client
                .get(self.url("securities"))
                .query(&[("ticker", ticker)]);
            let securities: Vec<Security> = self.fetch(request).await?;
            Ok(securities.into_iter().find(|s| s.ticker == ticker))
        })
    }

    fn last_close<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, ClientResult<Option<Price>>> {
        Box::pin(async move {
            let request = self
                .client
                .get(self.url("securities/history"))
                .query(&[("ticker", ticker), ("limit", "1")]);
            let bars: Vec<HistoryBar> = self.fetch(request).await?;
            Ok(bars.first().map(|bar| bar.close))
        })
    }

    fn top_of_book<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, ClientResult<MarketQuote>> {
        Box::pin(async move {
            let request = self
                .client
                .get(self.url("securities/book"))
                .query(&[("ticker", ticker)]);
            let book: OrderBook = self.fetch(request).await?;
            Ok(book.top())
        })
    }

    fn orders<'a>(
        &'a self,
        status: OrderStatus,
        ticker: Option<&'a str>,
    ) -> BoxFuture<'a, ClientResult<Vec<Order>>> {
        Box::pin(async move {
            let mut request = self
                .client
                .get(self.url("orders"))
                .query(&[("status", status.as_str())]);
            if let Some(ticker) = ticker {
                request = request.query(&[("ticker", ticker)]);
            }
            let orders: Vec<Order> = self.fetch(request).await?;
            Ok(match ticker {
                Some(ticker) => orders.into_iter().filter(|o| o.ticker == ticker).collect(),
                None => orders,
            })
        })
    }

    fn place_order<'a>(&'a self, request: &'a OrderRequest) -> BoxFuture<'a, ClientResult<OrderAck>> {
        Box::pin(async move {
            let http = self
                .client
                .post(self.url("orders"))
                .query(&order_query(request));
            self.fetch(http).await
        })
    }

    fn cancel_all(&self) -> BoxFuture<'_, ClientResult<Vec<u64>>> {
        Box::pin(async move {
            let request = self
                .client
                .post(self.url("commands/cancel"))
                .query(&[("all", "1")]);
            let response: CancelResponse = self.fetch(request).await?;
            Ok(response.cancelled_order_ids)
        })
    }

    fn tenders(&self) -> BoxFuture<'_, ClientResult<Vec<Tender>>> {
        Box::pin(async move { self.fetch(self.client.get(self.url("tenders"))).await })
    }

    fn accept_tender(&self, tender_id: u64) -> BoxFuture<'_, ClientResult<()>> {
        Box::pin(async move {
            debug!(tender_id, "Accepting tender");
            let request = self.client.post(self.url(&format!("tenders/{tender_id}")));
            self.execute(request).await
        })
    }

    fn decline_tender(&self, tender_id: u64) -> BoxFuture<'_, ClientResult<()>> {
        Box::pin(async move {
            debug!(tender_id, "Declining tender");
            let request = self.client.delete(self.url(&format!("tenders/{tender_id}")));
            self.execute(request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rit_core::OrderSide;
    use rust_decimal_macros::dec;

    #[test]
    fn test_classify_statuses() {
        assert_eq!(classify(StatusCode::OK, ""), None);
        assert_eq!(
            classify(StatusCode::UNAUTHORIZED, "bad key"),
            Some(ClientError::Authentication)
        );
        assert_eq!(
            classify(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            Some(ClientError::Request {
                status: 429,
                body: "slow down".into()
            })
        );
    }

    #[test]
    fn test_limit_order_query() {
        let req = OrderRequest::limit("ALGO", OrderSide::Buy, 1000, Price::new(dec!(19.97)));
        let query = order_query(&req);
        assert_eq!(
            query,
            vec![
                ("ticker", "ALGO".to_string()),
                ("type", "LIMIT".to_string()),
                ("quantity", "1000".to_string()),
                ("action", "BUY".to_string()),
                ("price", "19.97".to_string()),
            ]
        );
    }

    #[test]
    fn test_market_order_query_has_no_price() {
        let req = OrderRequest::market("CRZY", OrderSide::Sell, 1500);
        assert!(order_query(&req).iter().all(|(k, _)| *k != "price"));
    }

    #[test]
    fn test_invalid_header_name_is_setup_error() {
        let err = HttpExchangeClient::new(DEFAULT_BASE_URL, "bad header", "KEY")
            .err()
            .unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client =
            HttpExchangeClient::new("http://localhost:9999/v1/", DEFAULT_API_KEY_HEADER, "KEY")
                .unwrap();
        assert_eq!(client.url("case"), "http://localhost:9999/v1/case");
    }
}
