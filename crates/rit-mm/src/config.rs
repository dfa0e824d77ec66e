//! Market making configuration.

use crate::error::{MakerError, MakerResult};
use rit_core::{PositionSource, Price, PriceSource};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market making configuration (`[maker]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakerConfig {
    /// Ticker to quote.
    #[serde(default = "default_ticker")]
    pub ticker: String,

    /// Offset of each quote from the reference price.
    #[serde(default = "default_spread")]
    pub spread: Price,

    /// Quantity of the bid.
    #[serde(default = "default_volume")]
    pub buy_volume: u64,

    /// Quantity of the ask.
    #[serde(default = "default_volume")]
    pub sell_volume: u64,

    /// Absolute position above which quoting switches to corrective mode.
    #[serde(default = "default_position_threshold")]
    pub position_threshold: u64,

    /// Reference price source.
    #[serde(default = "default_price_source")]
    pub price_source: PriceSource,

    /// Net position source.
    #[serde(default = "default_position_source")]
    pub position_source: PositionSource,
}

fn default_ticker() -> String {
    "ALGO".to_string()
}

fn default_spread() -> Price {
    Price::new(Decimal::new(3, 2)) // 0.03
}

fn default_volume() -> u64 {
    1000
}

fn default_position_threshold() -> u64 {
    500
}

fn default_price_source() -> PriceSource {
    PriceSource::HistoryClose
}

fn default_position_source() -> PositionSource {
    PositionSource::Transacted
}

impl Default for MakerConfig {
    fn default() -> Self {
        Self {
            ticker: default_ticker(),
            spread: default_spread(),
            buy_volume: default_volume(),
            sell_volume: default_volume(),
            position_threshold: default_position_threshold(),
            price_source: default_price_source(),
            position_source: default_position_source(),
        }
    }
}

impl MakerConfig {
    pub fn validate(&self) -> MakerResult<()> {
        if self.ticker.is_empty() {
            return Err(MakerError::ConfigError("ticker must not be empty".into()));
        }
        if !self.spread.is_positive() {
            return Err(MakerError::ConfigError(format!(
                "spread ({}) must be positive",
                self.spread
            )));
        }
        if self.buy_volume == 0 || self.sell_volume == 0 {
            return Err(MakerError::ConfigError(
                "buy_volume and sell_volume must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config: MakerConfig = toml::from_str("").unwrap();
        assert_eq!(config, MakerConfig::default());
        assert_eq!(config.spread, Price::new(dec!(0.03)));
        assert_eq!(config.price_source, PriceSource::HistoryClose);
        assert_eq!(config.position_source, PositionSource::Transacted);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_spread() {
        let config = MakerConfig {
            spread: Price::new(dec!(0)),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
