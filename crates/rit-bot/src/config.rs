//! Application configuration.

use crate::error::{AppError, AppResult};
use rit_client::{DEFAULT_API_KEY_HEADER, DEFAULT_BASE_URL};
use rit_core::{Price, Tick, TradingWindow};
use rit_executor::SpeedBumpConfig;
use rit_mm::MakerConfig;
use rit_position::BalancerConfig;
use rit_tender::TenderConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Environment variable that overrides `api_key`.
pub const API_KEY_ENV: &str = "RIT_API_KEY";

/// Which strategy the main loop dispatches to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Symmetric two-sided quoting.
    #[default]
    #[value(name = "market_maker")]
    MarketMaker,
    /// Tender evaluation with inventory unwind.
    #[value(name = "tender")]
    Tender,
}

/// Session clock configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// First tick the agent acts on.
    #[serde(default = "default_start_guard")]
    pub start_guard: Tick,
    /// First tick the agent no longer acts on.
    #[serde(default = "default_end_guard")]
    pub end_guard: Tick,
    /// Sleep between market maker polls.
    #[serde(default = "default_loop_interval_ms")]
    pub loop_interval_ms: u64,
}

fn default_start_guard() -> Tick {
    6
}

fn default_end_guard() -> Tick {
    295
}

fn default_loop_interval_ms() -> u64 {
    200
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_guard: default_start_guard(),
            end_guard: default_end_guard(),
            loop_interval_ms: default_loop_interval_ms(),
        }
    }
}

impl SessionConfig {
    pub fn window(&self) -> TradingWindow {
        TradingWindow::new(self.start_guard, self.end_guard)
    }
}

/// Throughput harness configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_ticker")]
    pub ticker: String,
    /// Total shares to send; the harness places `total_volume / order_size` orders.
    #[serde(default = "default_total_volume")]
    pub total_volume: u64,
    #[serde(default = "default_order_size")]
    pub order_size: u64,
    /// Limit price of every test order; far from the market so nothing fills.
    #[serde(default = "default_test_price")]
    pub price: Price,
}

fn default_probe_ticker() -> String {
    "ALGO".to_string()
}

fn default_total_volume() -> u64 {
    20_000
}

fn default_order_size() -> u64 {
    1_000
}

fn default_test_price() -> Price {
    Price::new(Decimal::from(19))
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ticker: default_probe_ticker(),
            total_volume: default_total_volume(),
            order_size: default_order_size(),
            price: default_test_price(),
        }
    }
}

impl ProbeConfig {
    /// Number of orders the harness will place.
    pub fn order_count(&self) -> u64 {
        self.total_volume / self.order_size.max(1)
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// REST API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key; `RIT_API_KEY` overrides it.
    #[serde(default)]
    pub api_key: String,
    /// Header the API key is sent in.
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    /// Strategy run by the main loop.
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub speed_bump: SpeedBumpConfig,
    #[serde(default)]
    pub balancer: BalancerConfig,
    #[serde(default)]
    pub tender: TenderConfig,
    #[serde(default)]
    pub maker: MakerConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key_header() -> String {
    DEFAULT_API_KEY_HEADER.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            api_key_header: default_api_key_header(),
            strategy: Strategy::default(),
            session: SessionConfig::default(),
            speed_bump: SpeedBumpConfig::default(),
            balancer: BalancerConfig::default(),
            tender: TenderConfig::default(),
            maker: MakerConfig::default(),
            probe: ProbeConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load `path` if it exists, otherwise fall back to defaults. Applies the
    /// environment override and validates.
    pub fn load(path: &str) -> AppResult<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            warn!(path, "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env_override(std::env::var(API_KEY_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Replace the API key with `key` when set and non-empty.
    pub fn apply_env_override(&mut self, key: Option<String>) {
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            self.api_key = key;
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.session.start_guard >= self.session.end_guard {
            return Err(AppError::Config(format!(
                "session.start_guard ({}) must be below session.end_guard ({})",
                self.session.start_guard, self.session.end_guard
            )));
        }
        if self.balancer.chunk_size == 0 {
            return Err(AppError::Config(
                "balancer.chunk_size must be positive".to_string(),
            ));
        }
        if self.probe.order_size == 0 {
            return Err(AppError::Config(
                "probe.order_size must be positive".to_string(),
            ));
        }
        self.tender.validate()?;
        self.maker.validate()?;
        Ok(())
    }

    /// Whether requests will go out without a key.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}
