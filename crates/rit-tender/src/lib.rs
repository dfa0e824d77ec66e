//! Tender evaluation for the RIT agent.
//!
//! Institutions offer block trades ("tenders") at a fixed price. The agent
//! accepts only when the offer beats the market by a threshold and there is
//! enough time left in the period to unwind the resulting inventory.
//!
//! Accepting runs three steps: flatten the ticker first, accept, then unwind
//! the new position with limit orders that never give back more than the
//! commission against the tender price.

pub mod config;
pub mod error;
pub mod evaluator;

pub use config::TenderConfig;
pub use error::{TenderError, TenderResult};
pub use evaluator::{evaluate, DeclineReason, PollOutcome, TenderDecision, TenderEvaluator};
