//! Core domain types for the RIT trading agent.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `Price`: Precision-safe decimal price
//! - `Tick`, `TradingWindow`: Simulated session clock and active window
//! - `OrderSide`, `OrderType`, `OrderStatus`, `Order`, `OrderRequest`: Order model
//! - `Tender`, `MarketQuote`, `Security`: Exchange data snapshots

pub mod decimal;
pub mod error;
pub mod order;
pub mod session;
pub mod types;
mod wire;

pub use decimal::Price;
pub use error::{CoreError, Result};
pub use order::{Order, OrderAck, OrderRequest, OrderSide, OrderStatus, OrderType};
pub use session::{Tick, TradingWindow};
pub use types::{
    BookLevel, CaseInfo, HistoryBar, MarketQuote, OrderBook, PositionSource, PriceSource,
    Security, Tender,
};
