//! In-memory exchange for tests and dry runs.
//!
//! Behaves like a very small simulated case:
//! - market orders fill in full at once
//! - limit orders rest OPEN, or fill at once when `fill_limits` is on
//! - accepting a tender moves the position against the institution's side
//! - `case()` can advance the tick by a fixed step on every read
//!
//! Every position change is recorded as a TRANSACTED order, so positions
//! read from `GET /securities` and from the order history always agree.

use crate::client::{BoxFuture, ExchangeClient};
use crate::error::{ClientError, ClientResult};
use parking_lot::Mutex;
use rit_core::{
    CaseInfo, MarketQuote, Order, OrderAck, OrderRequest, OrderSide, OrderStatus, OrderType,
    Price, Security, Tender, Tick,
};
use std::collections::HashMap;

/// Read endpoints that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockRead {
    Case,
    Security,
    LastClose,
    TopOfBook,
    Orders,
    Tenders,
}

#[derive(Debug, Default)]
struct MockState {
    tick: Tick,
    tick_step: Tick,
    next_order_id: u64,
    orders: Vec<Order>,
    positions: HashMap<String, i64>,
    prices: HashMap<String, Price>,
    books: HashMap<String, MarketQuote>,
    tenders: Vec<Tender>,
    fill_limits: bool,
    auth_failure: bool,
    next_order_error: Option<ClientError>,
    next_read_errors: HashMap<MockRead, ClientError>,
    next_tender_error: Option<ClientError>,
    submissions: Vec<OrderRequest>,
    accepted_tenders: Vec<u64>,
    declined_tenders: Vec<u64>,
    cancel_calls: usize,
}

impl MockState {
    fn fill(&mut self, ticker: &str, action: OrderSide, quantity: u64, price: Option<Price>) -> u64 {
        let order_id = self.allocate_id();
        self.orders.push(Order {
            order_id,
            ticker: ticker.to_string(),
            order_type: OrderType::Market,
            quantity,
            action,
            price,
            quantity_filled: quantity,
            status: OrderStatus::Transacted,
        });
        *self.positions.entry(ticker.to_string()).or_insert(0) += action.sign() * quantity as i64;
        order_id
    }

    /// Book a synthetic fill that moves the position of `ticker` by `delta`.
    fn book_delta(&mut self, ticker: &str, delta: i64, price: Option<Price>) {
        if let Some(side) = OrderSide::reducing(-delta) {
            self.fill(ticker, side, delta.unsigned_abs(), price);
        }
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_order_id += 1;
        self.next_order_id
    }

    fn check_auth(&self) -> ClientResult<()> {
        if self.auth_failure {
            Err(ClientError::Authentication)
        } else {
            Ok(())
        }
    }

    fn check_read(&mut self, read: MockRead) -> ClientResult<()> {
        self.check_auth()?;
        match self.next_read_errors.remove(&read) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Mock exchange for testing.
#[derive(Debug, Default)]
pub struct MockExchange {
    state: Mutex<MockState>,
}

impl MockExchange {
    /// Create an empty exchange at tick 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current tick.
    pub fn set_tick(&self, tick: Tick) {
        self.state.lock().tick = tick;
    }

    /// Advance the tick by `step` after every `case()` read (0 disables).
    pub fn set_tick_step(&self, step: Tick) {
        self.state.lock().tick_step = step;
    }

    pub fn tick(&self) -> Tick {
        self.state.lock().tick
    }

    /// Set the last price (also used as the latest history close).
    pub fn set_price(&self, ticker: &str, price: Price) {
        self.state.lock().prices.insert(ticker.to_string(), price);
    }

    /// Set the top of book.
    pub fn set_book(&self, ticker: &str, best_bid: Option<Price>, best_ask: Option<Price>) {
        self.state
            .lock()
            .books
            .insert(ticker.to_string(), MarketQuote::new(best_bid, best_ask));
    }

    /// Force the position of `ticker` by booking a synthetic fill for the difference.
    pub fn set_position(&self, ticker: &str, position: i64) {
        let mut state = self.state.lock();
        let current = state.positions.get(ticker).copied().unwrap_or(0);
        state.book_delta(ticker, position - current, None);
    }

    pub fn position(&self, ticker: &str) -> i64 {
        self.state.lock().positions.get(ticker).copied().unwrap_or(0)
    }

    /// Fill limit orders immediately instead of leaving them OPEN.
    pub fn set_fill_limits(&self, fill: bool) {
        self.state.lock().fill_limits = fill;
    }

    /// Rest an OPEN limit order without going through `place_order`.
    pub fn add_open_order(&self, ticker: &str, action: OrderSide, quantity: u64, price: Price) -> u64 {
        let mut state = self.state.lock();
        let order_id = state.allocate_id();
        state.orders.push(Order {
            order_id,
            ticker: ticker.to_string(),
            order_type: OrderType::Limit,
            quantity,
            action,
            price: Some(price),
            quantity_filled: 0,
            status: OrderStatus::Open,
        });
        order_id
    }

    /// Offer a tender.
    pub fn push_tender(&self, tender: Tender) {
        self.state.lock().tenders.push(tender);
    }

    /// Make every call fail with 401 from now on.
    pub fn set_auth_failure(&self, fail: bool) {
        self.state.lock().auth_failure = fail;
    }

    /// Fail the next `place_order` with `err`.
    pub fn fail_next_order(&self, err: ClientError) {
        self.state.lock().next_order_error = Some(err);
    }

    /// Fail the next call to the `read` endpoint with `err`.
    pub fn fail_next_read(&self, read: MockRead, err: ClientError) {
        self.state.lock().next_read_errors.insert(read, err);
    }

    /// Fail the next tender accept or decline with `err`.
    pub fn fail_next_tender_call(&self, err: ClientError) {
        self.state.lock().next_tender_error = Some(err);
    }

    /// Every order request received, including rejected ones.
    pub fn submissions(&self) -> Vec<OrderRequest> {
        self.state.lock().submissions.clone()
    }

    pub fn open_orders(&self) -> Vec<Order> {
        self.state
            .lock()
            .orders
            .iter()
            .filter(|o| o.status == OrderStatus::Open)
            .cloned()
            .collect()
    }

    pub fn accepted_tenders(&self) -> Vec<u64> {
        self.state.lock().accepted_tenders.clone()
    }

    pub fn declined_tenders(&self) -> Vec<u64> {
        self.state.lock().declined_tenders.clone()
    }

    pub fn cancel_calls(&self) -> usize {
        self.state.lock().cancel_calls
    }
}

impl ExchangeClient for MockExchange {
    fn case(&self) -> BoxFuture<'_, ClientResult<CaseInfo>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.check_read(MockRead::Case)?;
            let tick = state.tick;
            state.tick = state.tick.saturating_add(state.tick_step);
            Ok(CaseInfo {
                tick,
                period: Some(1),
                ticks_per_period: Some(300),
                status: Some("ACTIVE".to_string()),
            })
        })
    }

    fn security<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, ClientResult<Option<Security>>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.check_read(MockRead::Security)?;
            let book = state.books.get(ticker).copied().unwrap_or_default();
            Ok(Some(Security {
                ticker: ticker.to_string(),
                position: state.positions.get(ticker).copied().unwrap_or(0),
                last: state.prices.get(ticker).copied(),
                bid: book.best_bid,
                ask: book.best_ask,
            }))
        })
    }

    fn last_close<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, ClientResult<Option<Price>>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.check_read(MockRead::LastClose)?;
            Ok(state.prices.get(ticker).copied())
        })
    }

    fn top_of_book<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, ClientResult<MarketQuote>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.check_read(MockRead::TopOfBook)?;
            Ok(state.books.get(ticker).copied().unwrap_or_default())
        })
    }

    fn orders<'a>(
        &'a self,
        status: OrderStatus,
        ticker: Option<&'a str>,
    ) -> BoxFuture<'a, ClientResult<Vec<Order>>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.check_read(MockRead::Orders)?;
            Ok(state
                .orders
                .iter()
                .filter(|o| o.status == status)
                .filter(|o| ticker.map_or(true, |t| o.ticker == t))
                .cloned()
                .collect())
        })
    }

    fn place_order<'a>(&'a self, request: &'a OrderRequest) -> BoxFuture<'a, ClientResult<OrderAck>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.submissions.push(request.clone());
            state.check_auth()?;
            if let Some(err) = state.next_order_error.take() {
                return Err(err);
            }
            if request.quantity == 0 {
                return Err(ClientError::Request {
                    status: 400,
                    body: "quantity must be positive".to_string(),
                });
            }

            let fills_now = request.order_type == OrderType::Market || state.fill_limits;
            if fills_now {
                let order_id =
                    state.fill(&request.ticker, request.action, request.quantity, request.price);
                return Ok(OrderAck {
                    order_id,
                    status: Some(OrderStatus::Transacted),
                });
            }

            let order_id = state.allocate_id();
            state.orders.push(Order {
                order_id,
                ticker: request.ticker.clone(),
                order_type: request.order_type,
                quantity: request.quantity,
                action: request.action,
                price: request.price,
                quantity_filled: 0,
                status: OrderStatus::Open,
            });
            Ok(OrderAck {
                order_id,
                status: Some(OrderStatus::Open),
            })
        })
    }

    fn cancel_all(&self) -> BoxFuture<'_, ClientResult<Vec<u64>>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.check_auth()?;
            state.cancel_calls += 1;
            let mut cancelled = Vec::new();
            for order in state
                .orders
                .iter_mut()
                .filter(|o| o.status == OrderStatus::Open)
            {
                order.status = OrderStatus::Cancelled;
                cancelled.push(order.order_id);
            }
            Ok(cancelled)
        })
    }

    fn tenders(&self) -> BoxFuture<'_, ClientResult<Vec<Tender>>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.check_read(MockRead::Tenders)?;
            Ok(state.tenders.clone())
        })
    }

    fn accept_tender(&self, tender_id: u64) -> BoxFuture<'_, ClientResult<()>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.check_auth()?;
            if let Some(err) = state.next_tender_error.take() {
                return Err(err);
            }
            let idx = state
                .tenders
                .iter()
                .position(|t| t.tender_id == tender_id)
                .ok_or_else(|| ClientError::Request {
                    status: 404,
                    body: format!("tender {tender_id} not found"),
                })?;
            let tender = state.tenders.remove(idx);
            state.book_delta(&tender.ticker, tender.position_delta(), Some(tender.price));
            state.accepted_tenders.push(tender_id);
            Ok(())
        })
    }

    fn decline_tender(&self, tender_id: u64) -> BoxFuture<'_, ClientResult<()>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.check_auth()?;
            if let Some(err) = state.next_tender_error.take() {
                return Err(err);
            }
            state.tenders.retain(|t| t.tender_id != tender_id);
            state.declined_tenders.push(tender_id);
            Ok(())
        })
    }
}
