//! Tender error types.

use rit_client::ClientError;
use rit_position::PositionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TenderError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Exchange error: {0}")]
    Client(#[from] ClientError),

    #[error(transparent)]
    Position(#[from] PositionError),
}

pub type TenderResult<T> = Result<T, TenderError>;
