//! Exchange client error types.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// HTTP 401. The API key is wrong; nothing downstream can succeed.
    #[error("Authentication failed: API key rejected")]
    Authentication,

    /// Any other non-2xx response.
    #[error("Request failed with HTTP {status}: {body}")]
    Request { status: u16, body: String },

    /// 2xx response whose body could not be decoded.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Connect, timeout or body read failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP client could not be constructed.
    #[error("Client setup failed: {0}")]
    Setup(String),
}

impl ClientError {
    /// Errors that must stop the agent rather than be retried on the next poll.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Authentication | Self::Setup(_))
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authentication => "auth",
            Self::Request { .. } => "request",
            Self::Malformed(_) => "malformed",
            Self::Transport(_) => "transport",
            Self::Setup(_) => "setup",
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
