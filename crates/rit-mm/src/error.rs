//! Market maker error types.

use rit_client::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MakerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Exchange error: {0}")]
    Client(#[from] ClientError),
}

pub type MakerResult<T> = Result<T, MakerError>;
