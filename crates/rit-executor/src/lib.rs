//! Order submission for the RIT agent.
//!
//! # Key Components
//!
//! - [`SpeedBump`]: Adaptive self-throttle that paces submissions toward a
//!   target rate using the running average of per-order slack
//! - [`OrderGateway`]: Single path for every order; times the request, feeds
//!   the speed bump and records metrics

pub mod error;
pub mod gateway;
pub mod speed_bump;

pub use error::{ExecutorError, ExecutorResult};
pub use gateway::OrderGateway;
pub use speed_bump::{SpeedBump, SpeedBumpConfig, SpeedBumpReading};
