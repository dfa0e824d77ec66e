//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging.
///
/// `RUST_LOG` takes precedence; otherwise `level` applies globally with the
/// agent's own crates at debug. Output is JSON when `RUST_ENV=production`,
/// pretty otherwise.
pub fn init_logging(level: &str) -> TelemetryResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => default_filter(level)?,
    };

    let is_production = std::env::var("RUST_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);

    let result = if is_production {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(true))
            .try_init()
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

fn default_filter(level: &str) -> TelemetryResult<EnvFilter> {
    let directives = format!("{level},rit=debug");
    EnvFilter::try_new(&directives).map_err(|e| TelemetryError::InvalidFilter {
        filter: directives,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_accepts_levels() {
        assert!(default_filter("info").is_ok());
        assert!(default_filter("warn").is_ok());
    }

    #[test]
    fn test_default_filter_rejects_garbage() {
        let err = default_filter("rit=bogus").unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidFilter { .. }));
    }
}
