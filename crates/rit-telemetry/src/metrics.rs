//! Prometheus metrics for the RIT agent.
//!
//! Counters for order flow, unwind gating and tender decisions. They live in
//! the default registry for the process lifetime and are read back by
//! [`crate::SessionSummary`] at shutdown.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means a duplicate metric
//! name, which only happens at first use during startup.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_int_gauge_vec, CounterVec, Histogram,
    IntGaugeVec,
};

/// Orders accepted by the exchange.
/// Labels: side (BUY/SELL), type (LIMIT/MARKET)
pub static ORDERS_SUBMITTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "rit_orders_submitted_total",
        "Total orders accepted by the exchange",
        &["side", "type"]
    )
    .unwrap()
});

/// Orders rejected by the exchange or lost in transport.
/// Labels: reason (request/auth/transport/malformed)
pub static ORDERS_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "rit_orders_rejected_total",
        "Total order submissions that failed",
        &["reason"]
    )
    .unwrap()
});

/// Round-trip latency of order submissions in milliseconds.
pub static ORDER_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "rit_order_latency_ms",
        "Order submission round-trip latency in milliseconds",
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 200.0, 300.0, 500.0, 1000.0]
    )
    .unwrap()
});

/// Delay applied by the speed bump after a submission, in milliseconds.
pub static SPEED_BUMP_DELAY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "rit_speed_bump_delay_ms",
        "Sleep applied by the speed bump in milliseconds",
        vec![0.0, 10.0, 25.0, 50.0, 100.0, 150.0, 200.0, 500.0]
    )
    .unwrap()
});

/// Opportunistic unwind cycles that placed nothing.
/// Labels: reason (gate_closed/missing_quote)
pub static UNWIND_SKIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "rit_unwind_skipped_total",
        "Total unwind cycles skipped",
        &["reason"]
    )
    .unwrap()
});

/// Tender decisions.
/// Labels: decision (accept/decline), reason (edge/too_late/thin_edge/no_price)
pub static TENDER_DECISIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "rit_tender_decisions_total",
        "Total tender decisions",
        &["decision", "reason"]
    )
    .unwrap()
});

/// Last observed net position per ticker.
pub static POSITION: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!("rit_position", "Last observed net position", &["ticker"]).unwrap()
});

/// Metrics helper for recording.
pub struct Metrics;

impl Metrics {
    /// Record an order accepted by the exchange.
    pub fn order_submitted(side: &str, order_type: &str) {
        ORDERS_SUBMITTED_TOTAL
            .with_label_values(&[side, order_type])
            .inc();
    }

    /// Record a failed order submission.
    pub fn order_rejected(reason: &str) {
        ORDERS_REJECTED_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record order round-trip latency.
    pub fn order_latency(latency_ms: f64) {
        ORDER_LATENCY_MS.observe(latency_ms);
    }

    /// Record the speed bump delay (0 when no sleep was applied).
    pub fn speed_bump_delay(delay_ms: f64) {
        SPEED_BUMP_DELAY_MS.observe(delay_ms.max(0.0));
    }

    /// Record a skipped unwind cycle.
    pub fn unwind_skipped(reason: &str) {
        UNWIND_SKIPPED_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record a tender decision.
    pub fn tender_decision(decision: &str, reason: &str) {
        TENDER_DECISIONS_TOTAL
            .with_label_values(&[decision, reason])
            .inc();
    }

    /// Record the observed position for a ticker.
    pub fn position(ticker: &str, position: i64) {
        POSITION.with_label_values(&[ticker]).set(position);
    }

    /// Total failed submissions, across all labels.
    pub fn orders_rejected_total() -> u64 {
        sum_counter(&ORDERS_REJECTED_TOTAL)
    }

    /// Total tenders with the given decision, across all reasons.
    pub fn tender_decisions(decision: &str) -> u64 {
        use prometheus::core::Collector;

        TENDER_DECISIONS_TOTAL
            .collect()
            .iter()
            .flat_map(|mf| mf.get_metric())
            .filter(|m| {
                m.get_label()
                    .iter()
                    .any(|l| l.get_name() == "decision" && l.get_value() == decision)
            })
            .map(|m| m.get_counter().get_value() as u64)
            .sum()
    }
}

fn sum_counter(counter: &CounterVec) -> u64 {
    use prometheus::core::Collector;

    counter
        .collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_counter_sums_reasons() {
        let before = Metrics::orders_rejected_total();
        Metrics::order_rejected("request");
        Metrics::order_rejected("transport");
        assert!(Metrics::orders_rejected_total() >= before + 2);
    }

    #[test]
    fn test_tender_decisions_filtered_by_decision() {
        let accepted = Metrics::tender_decisions("accept");
        Metrics::tender_decision("accept", "edge");
        Metrics::tender_decision("decline", "too_late");
        assert!(Metrics::tender_decisions("accept") > accepted);
    }

    #[test]
    fn test_position_gauge() {
        Metrics::position("TEST_GAUGE", -1500);
        assert_eq!(POSITION.with_label_values(&["TEST_GAUGE"]).get(), -1500);
    }
}
