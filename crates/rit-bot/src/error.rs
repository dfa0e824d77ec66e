//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Exchange error: {0}")]
    Client(#[from] rit_client::ClientError),

    #[error("Executor error: {0}")]
    Executor(#[from] rit_executor::ExecutorError),

    #[error("Position error: {0}")]
    Position(#[from] rit_position::PositionError),

    #[error("Tender error: {0}")]
    Tender(#[from] rit_tender::TenderError),

    #[error("Market maker error: {0}")]
    Maker(#[from] rit_mm::MakerError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] rit_telemetry::TelemetryError),
}

pub type AppResult<T> = Result<T, AppError>;
