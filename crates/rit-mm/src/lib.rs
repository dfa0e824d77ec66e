//! Market making strategy for the RIT agent.
//!
//! Keeps one bid and one ask around the reference price and pulls inventory
//! back inside a threshold with a single corrective order.
//!
//! # Architecture
//!
//! ```text
//! poll -> MarketMaker::on_poll()
//!          ├─ read position, open order count, reference price
//!          ├─ plan(): Hold | Quote | Reset | Correct
//!          └─ OrderGateway (speed bump) -> exchange
//! ```

pub mod config;
pub mod error;
pub mod maker;

pub use config::MakerConfig;
pub use error::{MakerError, MakerResult};
pub use maker::{plan, MakerAction, MarketMaker};
