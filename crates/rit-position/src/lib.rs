//! Inventory balancing for the RIT agent.
//!
//! Drives the net position of a ticker back to zero, either aggressively
//! with MARKET orders or opportunistically with LIMIT orders gated on the
//! top of book versus a cost basis.
//!
//! # Key Components
//!
//! - [`InventoryBalancer`]: Poll loop that unwinds until flat or shut down
//! - [`plan_unwind`]: Pure decision for one cycle, testable without I/O
//! - [`UnwindStrategy`]: Aggressive or opportunistic
//! - [`BalancerConfig`]: Chunk size, poll interval and position source

pub mod balancer;
pub mod error;

pub use balancer::{
    plan_unwind, BalanceOutcome, BalanceState, BalancerConfig, InventoryBalancer, SkipReason,
    UnwindPlan, UnwindStrategy,
};
pub use error::{PositionError, PositionResult};
