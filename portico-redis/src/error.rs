//! Redis error types.

use thiserror::Error;

/// Result type for Redis operations.
pub type Result<T> = std::result::Result<T, RedisError>;

/// Redis errors.
#[derive(Debug, Error)]
pub enum RedisError {
    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Timeout error.
    #[error("Operation timed out")]
    Timeout,

    /// Underlying Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl RedisError {
    /// Check if this error indicates connection loss.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Redis(err) => {
                err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error()
            }
            Self::Timeout => false,
        }
    }

    /// Check if a retry may succeed for this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout) || self.is_connection_error()
    }
}
