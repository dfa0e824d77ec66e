//! Order-related types.
//!
//! Provides order side, type and status enums in the exchange's wire casing,
//! the exchange's order record and the placement request.

use crate::decimal::Price;
use crate::wire;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns 1 for buy, -1 for sell (for position calculations).
    pub fn sign(&self) -> i64 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }

    /// Side that reduces a non-zero position toward zero.
    ///
    /// Returns `None` for a flat position.
    pub fn reducing(position: i64) -> Option<Self> {
        match position.signum() {
            1 => Some(Self::Sell),
            -1 => Some(Self::Buy),
            _ => None,
        }
    }

    /// Wire representation (`BUY` / `SELL`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Limit order, rests at its price.
    Limit,
    /// Market order, fills against the book.
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Limit => "LIMIT",
            Self::Market => "MARKET",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order status as reported by `GET /orders`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Open,
    Transacted,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Transacted => "TRANSACTED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order record owned by the exchange.
///
/// Immutable once submitted except for the fill/status fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: u64,
    pub ticker: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(deserialize_with = "wire::quantity")]
    pub quantity: u64,
    pub action: OrderSide,
    /// Limit price; absent for market orders.
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default, deserialize_with = "wire::quantity")]
    pub quantity_filled: u64,
    pub status: OrderStatus,
}

impl Order {
    /// Signed filled quantity: BUY adds, SELL subtracts.
    pub fn signed_filled(&self) -> i64 {
        self.action.sign() * self.quantity_filled as i64
    }
}

/// Order placement request (`POST /orders`).
///
/// Built through [`OrderRequest::market`] or [`OrderRequest::limit`] so that a
/// LIMIT order always carries a price and a MARKET order never does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub ticker: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub quantity: u64,
    pub action: OrderSide,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
}

impl OrderRequest {
    /// Create a market order.
    pub fn market(ticker: impl Into<String>, action: OrderSide, quantity: u64) -> Self {
        Self {
            ticker: ticker.into(),
            order_type: OrderType::Market,
            quantity,
            action,
            price: None,
        }
    }

    /// Create a limit order.
    pub fn limit(ticker: impl Into<String>, action: OrderSide, quantity: u64, price: Price) -> Self {
        Self {
            ticker: ticker.into(),
            order_type: OrderType::Limit,
            quantity,
            action,
            price: Some(price),
        }
    }

    /// Short label for logs, e.g. `BUY 1000@19.97` or `SELL 1500@MKT`.
    pub fn label(&self) -> String {
        match self.price {
            Some(price) => format!("{} {}@{}", self.action, self.quantity, price),
            None => format!("{} {}@MKT", self.action, self.quantity),
        }
    }
}

/// Exchange acknowledgement of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: u64,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}
