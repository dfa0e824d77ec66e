//! Position error types.

use rit_client::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionError {
    /// An exchange error that stops balancing (authentication).
    #[error("Exchange error while balancing: {0}")]
    Client(#[from] ClientError),
}

pub type PositionResult<T> = Result<T, PositionError>;
