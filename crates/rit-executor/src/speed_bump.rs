//! Adaptive order-rate limiter ("speed bump").
//!
//! The exchange caps submissions at a fixed rate. Each order's round-trip
//! latency `L` is compared with the target interval `T = 1 / rate`; the
//! difference `T - L` is the slack. After every order the limiter sleeps for
//! the running average slack when it is positive, so a run of fast requests
//! is slowed down while slow requests need no extra delay.
//!
//! The integrator is never reset: slack accumulated early in a session
//! keeps influencing the delay for the rest of the run.

use crate::error::{ExecutorError, ExecutorResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

/// Speed bump configuration (`[speed_bump]` section).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedBumpConfig {
    /// Target submission rate in orders per second.
    #[serde(default = "default_target_orders_per_sec")]
    pub target_orders_per_sec: f64,
}

fn default_target_orders_per_sec() -> f64 {
    5.0
}

impl Default for SpeedBumpConfig {
    fn default() -> Self {
        Self {
            target_orders_per_sec: default_target_orders_per_sec(),
        }
    }
}

/// Slack observed for one order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedBumpReading {
    /// `T - L` for this order, in seconds (negative when the order was slow).
    pub slack: f64,
    /// Running average slack over all orders so far, in seconds.
    pub average_slack: f64,
}

impl SpeedBumpReading {
    /// Sleep to apply, if any. Never negative.
    pub fn delay(&self) -> Option<Duration> {
        (self.average_slack > 0.0).then(|| Duration::from_secs_f64(self.average_slack))
    }
}

/// Running-average slack limiter.
#[derive(Debug, Clone)]
pub struct SpeedBump {
    /// `T` in seconds.
    target_interval: f64,
    total_slack: f64,
    total_latency: Duration,
    count: u64,
}

impl SpeedBump {
    pub fn new(config: SpeedBumpConfig) -> ExecutorResult<Self> {
        let rate = config.target_orders_per_sec;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ExecutorError::InvalidConfig(format!(
                "target_orders_per_sec must be positive, got {rate}"
            )));
        }
        // The interval must fit in a Duration, which rules out subnormal rates.
        let target_interval = 1.0 / rate;
        if Duration::try_from_secs_f64(target_interval).is_err() {
            return Err(ExecutorError::InvalidConfig(format!(
                "target_orders_per_sec is too small, got {rate}"
            )));
        }
        Ok(Self {
            target_interval,
            total_slack: 0.0,
            total_latency: Duration::ZERO,
            count: 0,
        })
    }

    /// Target interval between submissions.
    pub fn target_interval(&self) -> Duration {
        Duration::from_secs_f64(self.target_interval)
    }

    /// Fold one observed latency into the running statistics.
    pub fn record(&mut self, latency: Duration) -> SpeedBumpReading {
        let slack = self.target_interval - latency.as_secs_f64();
        self.total_slack += slack;
        self.total_latency += latency;
        self.count += 1;

        SpeedBumpReading {
            slack,
            average_slack: self.total_slack / self.count as f64,
        }
    }

    /// Record `latency`, then sleep the running average slack if positive.
    pub async fn record_and_delay(&mut self, latency: Duration) -> SpeedBumpReading {
        let reading = self.record(latency);
        if let Some(delay) = reading.delay() {
            trace!(delay_ms = delay.as_millis() as u64, "Speed bump sleeping");
            tokio::time::sleep(delay).await;
        }
        reading
    }

    /// Orders observed so far.
    pub fn placed_orders(&self) -> u64 {
        self.count
    }

    /// Mean round-trip latency; zero before the first order.
    pub fn average_latency(&self) -> Duration {
        match u32::try_from(self.count) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total_latency / n,
            Err(_) => Duration::from_secs_f64(self.total_latency.as_secs_f64() / self.count as f64),
        }
    }

    /// Running average slack in seconds; zero before the first order.
    pub fn average_slack(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_slack / self.count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn bump(rate: f64) -> SpeedBump {
        SpeedBump::new(SpeedBumpConfig {
            target_orders_per_sec: rate,
        })
        .unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_average_is_n_t_minus_sum_l_over_n() {
        let mut sb = bump(5.0);
        let latencies = [50u64, 120, 300, 10, 400];
        let mut reading = None;
        for ms in latencies {
            reading = Some(sb.record(Duration::from_millis(ms)));
        }
        let n = latencies.len() as f64;
        let sum_l: f64 = latencies.iter().map(|ms| *ms as f64 / 1000.0).sum();
        let expected = (n * 0.2 - sum_l) / n;

        let reading = reading.unwrap();
        assert!(close(reading.average_slack, expected));
        assert!(close(sb.average_slack(), expected));
        assert_eq!(sb.placed_orders(), 5);
        assert_eq!(sb.average_latency(), Duration::from_millis(176));
    }

    #[test]
    fn test_slow_order_has_negative_slack_and_no_delay() {
        let mut sb = bump(5.0);
        let reading = sb.record(Duration::from_millis(350));
        assert!(close(reading.slack, -0.15));
        assert!(reading.delay().is_none());
    }

    #[test]
    fn test_fast_orders_are_delayed_by_average() {
        let mut sb = bump(5.0);
        let first = sb.record(Duration::from_millis(50));
        assert!(close(first.average_slack, 0.15));
        let second = sb.record(Duration::from_millis(250));
        // (0.15 + -0.05) / 2
        assert!(close(second.average_slack, 0.05));
        let delay = second.delay().unwrap();
        assert!((delay.as_secs_f64() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_history_keeps_influencing_delay() {
        let mut sb = bump(5.0);
        for _ in 0..10 {
            sb.record(Duration::from_millis(500));
        }
        // A fast order after many slow ones still gets no delay.
        let reading = sb.record(Duration::ZERO);
        assert!(reading.slack > 0.0);
        assert!(reading.delay().is_none());
    }

    #[test]
    fn test_empty_stats() {
        let sb = bump(5.0);
        assert_eq!(sb.placed_orders(), 0);
        assert_eq!(sb.average_latency(), Duration::ZERO);
        assert_eq!(sb.average_slack(), 0.0);
        assert_eq!(sb.target_interval().as_millis(), 200);
    }

    #[test]
    fn test_rejects_non_positive_rate() {
        assert!(SpeedBump::new(SpeedBumpConfig {
            target_orders_per_sec: 0.0
        })
        .is_err());
        assert!(SpeedBump::new(SpeedBumpConfig {
            target_orders_per_sec: f64::NAN
        })
        .is_err());
    }

    #[test]
    fn test_rejects_rate_with_unrepresentable_interval() {
        assert!(SpeedBump::new(SpeedBumpConfig {
            target_orders_per_sec: 1e-310
        })
        .is_err());
        assert!(SpeedBump::new(SpeedBumpConfig {
            target_orders_per_sec: 1e-30
        })
        .is_err());
        assert!(SpeedBump::new(SpeedBumpConfig {
            target_orders_per_sec: 0.5
        })
        .is_ok());
    }

    #[test]
    fn test_config_defaults_from_toml() {
        let config: SpeedBumpConfig = toml::from_str("").unwrap();
        assert_eq!(config.target_orders_per_sec, 5.0);
    }

    #[tokio::test]
    async fn test_record_and_delay_sleeps_positive_average() {
        let mut sb = bump(50.0);
        let started = Instant::now();
        let reading = sb.record_and_delay(Duration::ZERO).await;
        assert!(close(reading.average_slack, 0.02));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_record_and_delay_skips_negative_average() {
        let mut sb = bump(50.0);
        let started = Instant::now();
        sb.record_and_delay(Duration::from_secs(1)).await;
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}
