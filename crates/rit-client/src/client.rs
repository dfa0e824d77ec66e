//! Exchange client trait.
//!
//! Abstracts the case REST API so strategies can run against the live
//! exchange or the in-memory [`crate::MockExchange`].

use std::pin::Pin;
use std::sync::Arc;

use rit_core::{
    CaseInfo, MarketQuote, Order, OrderAck, OrderRequest, OrderStatus, Price, Security, Tender,
    Tick,
};

use crate::error::ClientResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Operations the agent needs from the exchange.
///
/// Every call is a single request; there are no retries at this level. The
/// next poll is the retry.
pub trait ExchangeClient: Send + Sync {
    /// `GET /case`.
    fn case(&self) -> BoxFuture<'_, ClientResult<CaseInfo>>;

    /// Current simulated tick.
    fn case_tick(&self) -> BoxFuture<'_, ClientResult<Tick>> {
        Box::pin(async move { Ok(self.case().await?.tick) })
    }

    /// `GET /securities?ticker=..`; `None` if the exchange does not list it.
    fn security<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, ClientResult<Option<Security>>>;

    /// Close of the most recent history bar; `None` before the first bar.
    fn last_close<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, ClientResult<Option<Price>>>;

    /// Best bid and ask of the book.
    fn top_of_book<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, ClientResult<MarketQuote>>;

    /// `GET /orders?status=..`, optionally restricted to one ticker.
    fn orders<'a>(
        &'a self,
        status: OrderStatus,
        ticker: Option<&'a str>,
    ) -> BoxFuture<'a, ClientResult<Vec<Order>>>;

    /// `POST /orders`.
    fn place_order<'a>(&'a self, request: &'a OrderRequest) -> BoxFuture<'a, ClientResult<OrderAck>>;

    /// `POST /commands/cancel?all=1`. Returns the cancelled order ids.
    fn cancel_all(&self) -> BoxFuture<'_, ClientResult<Vec<u64>>>;

    /// `GET /tenders`, in exchange order.
    fn tenders(&self) -> BoxFuture<'_, ClientResult<Vec<Tender>>>;

    /// `POST /tenders/{id}`.
    fn accept_tender(&self, tender_id: u64) -> BoxFuture<'_, ClientResult<()>>;

    /// `DELETE /tenders/{id}`.
    fn decline_tender(&self, tender_id: u64) -> BoxFuture<'_, ClientResult<()>>;
}

/// Arc wrapper for ExchangeClient trait objects.
pub type DynExchangeClient = Arc<dyn ExchangeClient>;
