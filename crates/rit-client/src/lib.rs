//! Exchange access for the RIT agent.
//!
//! - `ExchangeClient`: dyn-compatible async interface over the case REST API
//! - `HttpExchangeClient`: reqwest implementation with API-key header
//! - `MockExchange`: in-memory exchange for tests and dry runs
//! - `net_position` / `reference_price`: reads parameterised by source

pub mod client;
pub mod error;
pub mod http;
pub mod mock;
pub mod queries;

pub use client::{BoxFuture, DynExchangeClient, ExchangeClient};
pub use error::{ClientError, ClientResult};
pub use http::{HttpExchangeClient, DEFAULT_API_KEY_HEADER, DEFAULT_BASE_URL};
pub use mock::{MockExchange, MockRead};
pub use queries::{net_position, open_order_count, reference_price};
