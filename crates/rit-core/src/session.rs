//! Simulated session clock.
//!
//! The exchange advances a discrete `tick` counter over a trading period of
//! fixed length. All time-based gating (loop window, late-period tender
//! refusal) is expressed in ticks.

use serde::{Deserialize, Serialize};

/// Discrete simulated-time unit reported by `GET /case`.
pub type Tick = u32;

/// Ticks during which the agent is allowed to act.
///
/// Active iff `start_guard <= tick < end_guard`. The guards keep the agent
/// away from the opening and closing seconds of the period, where the
/// exchange is still setting up or already winding down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingWindow {
    /// First active tick (inclusive).
    pub start_guard: Tick,
    /// First inactive tick at the end of the period (exclusive).
    pub end_guard: Tick,
}

impl TradingWindow {
    pub fn new(start_guard: Tick, end_guard: Tick) -> Self {
        Self {
            start_guard,
            end_guard,
        }
    }

    /// Check whether the agent may act at `tick`.
    #[must_use]
    pub fn contains(&self, tick: Tick) -> bool {
        tick >= self.start_guard && tick < self.end_guard
    }
}
