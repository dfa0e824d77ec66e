//! Exchange data snapshots.
//!
//! Contains the case clock, per-security state, order book, price history
//! and tender offers as returned by the REST API, plus the transient
//! top-of-book `MarketQuote` used to gate limit unwinds.

use crate::decimal::Price;
use crate::order::OrderSide;
use crate::session::Tick;
use crate::wire;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `GET /case` response (only the fields the agent reads).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseInfo {
    pub tick: Tick,
    #[serde(default)]
    pub period: Option<u32>,
    #[serde(default)]
    pub ticks_per_period: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
}

/// One entry of `GET /securities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Security {
    pub ticker: String,
    /// Exchange-reported net position.
    #[serde(default, deserialize_with = "wire::signed_quantity")]
    pub position: i64,
    /// Last traded price; absent before the first trade.
    #[serde(default)]
    pub last: Option<Price>,
    #[serde(default)]
    pub bid: Option<Price>,
    #[serde(default)]
    pub ask: Option<Price>,
}

/// One bar of `GET /securities/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryBar {
    pub tick: Tick,
    #[serde(default)]
    pub open: Option<Price>,
    #[serde(default)]
    pub high: Option<Price>,
    #[serde(default)]
    pub low: Option<Price>,
    pub close: Price,
}

/// A resting order in the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    #[serde(default, deserialize_with = "wire::quantity")]
    pub quantity: u64,
}

/// `GET /securities/book` response. Bids are sorted best (highest) first,
/// asks best (lowest) first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    #[serde(default)]
    pub bids: Vec<BookLevel>,
    #[serde(default)]
    pub asks: Vec<BookLevel>,
}

impl OrderBook {
    /// Reduce the book to its top-of-book quote.
    pub fn top(&self) -> MarketQuote {
        MarketQuote {
            best_bid: self.bids.first().map(|level| level.price),
            best_ask: self.asks.first().map(|level| level.price),
        }
    }
}

/// Top-of-book snapshot.
///
/// Used only transiently to gate limit unwinds; never cached across polls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarketQuote {
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
}

impl MarketQuote {
    pub fn new(best_bid: Option<Price>, best_ask: Option<Price>) -> Self {
        Self { best_bid, best_ask }
    }

}

impl fmt::Display for MarketQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |p: Option<Price>| p.map_or_else(|| "-".to_string(), |p| p.to_string());
        write!(f, "{} / {}", side(self.best_bid), side(self.best_ask))
    }
}

/// Block trade offered by an institution (`GET /tenders`).
///
/// `action` is the institution's intended trade, not the agent's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tender {
    pub tender_id: u64,
    pub ticker: String,
    pub action: OrderSide,
    #[serde(default)]
    pub price: Price,
    #[serde(deserialize_with = "wire::quantity")]
    pub quantity: u64,
    /// Tick at which the offer lapses.
    #[serde(default)]
    pub expires: Option<Tick>,
    #[serde(default)]
    pub caption: Option<String>,
}

impl Tender {
    /// Position change the agent takes on if the tender is accepted.
    ///
    /// The agent trades against the institution: an institution BUY leaves
    /// the agent short, an institution SELL leaves it long.
    pub fn position_delta(&self) -> i64 {
        -self.action.sign() * self.quantity as i64
    }
}

/// Where the net position of a ticker is read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSource {
    /// `position` field of `GET /securities`.
    #[default]
    Securities,
    /// Sum of filled quantities over TRANSACTED orders (BUY adds, SELL subtracts).
    Transacted,
}

/// Where the reference ("last") price of a ticker is read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// `last` field of `GET /securities`.
    #[default]
    Last,
    /// Close of the most recent `GET /securities/history` bar.
    HistoryClose,
}
