//! Tender configuration.

use crate::error::{TenderError, TenderResult};
use rit_core::{Price, PriceSource, Tick};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Configuration for tender evaluation (`[tender]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenderConfig {
    /// Last tick of the trading period.
    #[serde(default = "default_period_end")]
    pub period_end: Tick,
    /// Tenders arriving within this many ticks of `period_end` are declined.
    #[serde(default = "default_last_seconds")]
    pub last_seconds: Tick,
    /// Minimum edge versus the last price to accept.
    #[serde(default = "default_price_threshold")]
    pub price_threshold: Price,
    /// Per-share commission; widens the limit-unwind gate around the tender price.
    #[serde(default = "default_commission")]
    pub commission: Price,
    /// Wait between polls when no tender is outstanding.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Tickers flattened whenever no tender is outstanding.
    #[serde(default = "default_watch_list")]
    pub watch_list: Vec<String>,
    /// Where the reference price comes from.
    #[serde(default)]
    pub price_source: PriceSource,
}

fn default_period_end() -> Tick {
    300
}

fn default_last_seconds() -> Tick {
    30
}

fn default_price_threshold() -> Price {
    Price::new(Decimal::new(5, 2)) // 0.05
}

fn default_commission() -> Price {
    Price::new(Decimal::new(2, 2)) // 0.02
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_watch_list() -> Vec<String> {
    vec!["CRZY".to_string(), "TAME".to_string()]
}

impl Default for TenderConfig {
    fn default() -> Self {
        Self {
            period_end: default_period_end(),
            last_seconds: default_last_seconds(),
            price_threshold: default_price_threshold(),
            commission: default_commission(),
            poll_interval_ms: default_poll_interval_ms(),
            watch_list: default_watch_list(),
            price_source: PriceSource::default(),
        }
    }
}

impl TenderConfig {
    /// First tick at which tenders are declined without looking at price.
    pub fn cutoff_tick(&self) -> Tick {
        self.period_end.saturating_sub(self.last_seconds)
    }

    pub fn validate(&self) -> TenderResult<()> {
        if self.last_seconds > self.period_end {
            return Err(TenderError::ConfigError(format!(
                "last_seconds ({}) exceeds period_end ({})",
                self.last_seconds, self.period_end
            )));
        }
        if self.price_threshold.inner().is_sign_negative() {
            return Err(TenderError::ConfigError(format!(
                "price_threshold ({}) must be non-negative",
                self.price_threshold
            )));
        }
        if self.commission.inner().is_sign_negative() {
            return Err(TenderError::ConfigError(format!(
                "commission ({}) must be non-negative",
                self.commission
            )));
        }
        Ok(())
    }
}
