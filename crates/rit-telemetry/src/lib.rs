//! Prometheus counters and structured logging for the RIT agent.
//!
//! - Structured logging with tracing (pretty in development, JSON in production)
//! - In-process Prometheus counters for orders, unwinds and tenders
//! - End-of-session summary built from the counters

pub mod error;
pub mod logging;
pub mod metrics;
pub mod summary;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
pub use summary::SessionSummary;
