//! End-of-session summary.
//!
//! Combines the rate limiter's lifetime statistics with the order and tender
//! counters into the report printed when the main loop exits.

use crate::metrics::Metrics;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Final report for one run.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Orders counted by the speed bump (accepted and rejected).
    pub orders_placed: u64,
    pub average_latency_secs: f64,
    /// Running average slack; positive means the agent had to slow down.
    pub average_delay_secs: f64,
    pub orders_rejected: u64,
    pub tenders_accepted: u64,
    pub tenders_declined: u64,
}

impl SessionSummary {
    /// Build the summary from speed bump statistics and the process counters.
    pub fn collect(
        started_at: DateTime<Utc>,
        orders_placed: u64,
        average_latency: Duration,
        average_delay_secs: f64,
    ) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            orders_placed,
            average_latency_secs: average_latency.as_secs_f64(),
            average_delay_secs,
            orders_rejected: Metrics::orders_rejected_total(),
            tenders_accepted: Metrics::tender_decisions("accept"),
            tenders_declined: Metrics::tender_decisions("decline"),
        }
    }

    /// Wall-clock duration of the run.
    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Emit the summary as a single structured log event.
    pub fn log(&self) {
        info!(
            orders_placed = self.orders_placed,
            avg_latency_s = format!("{:.3}", self.average_latency_secs),
            avg_delay_s = format!("{:.3}", self.average_delay_secs),
            orders_rejected = self.orders_rejected,
            tenders_accepted = self.tenders_accepted,
            tenders_declined = self.tenders_declined,
            elapsed_s = self.elapsed().as_secs(),
            "Session summary"
        );
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total orders placed: {}", self.orders_placed)?;
        writeln!(
            f,
            "Average transaction time: {:.3} seconds",
            self.average_latency_secs
        )?;
        writeln!(
            f,
            "Average speed bump delay: {:.3} seconds",
            self.average_delay_secs
        )?;
        writeln!(f, "Rejected orders: {}", self.orders_rejected)?;
        write!(
            f,
            "Tenders accepted/declined: {}/{}",
            self.tenders_accepted, self.tenders_declined
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_formats_three_decimals() {
        let summary = SessionSummary::collect(Utc::now(), 20, Duration::from_millis(150), 0.05);
        let text = summary.to_string();
        assert!(text.contains("Total orders placed: 20"));
        assert!(text.contains("Average transaction time: 0.150 seconds"));
        assert!(text.contains("Average speed bump delay: 0.050 seconds"));
    }

    #[test]
    fn test_summary_serializes() {
        let summary = SessionSummary::collect(Utc::now(), 0, Duration::ZERO, 0.0);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["orders_placed"], 0);
    }
}
