//! Executor error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Invalid speed bump config: {0}")]
    InvalidConfig(String),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
