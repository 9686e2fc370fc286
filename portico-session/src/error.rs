//! Error types for session operations.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
///
/// These never cross the [`SessionStore`](crate::SessionStore) boundary:
/// store implementations absorb failures, log them, and degrade (a failed
/// load reports "not found", a failed save is dropped). The variants exist
/// for the internal plumbing and the codec/cache seams.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// External cache error
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for external cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors produced by an external cache collaborator.
///
/// A cache miss is not an error; [`CacheClient::get`](crate::CacheClient::get)
/// reports it as `Ok(None)`. Every variant here is a service failure the
/// cache-backed store treats as transient and retries.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Backend error
    #[error("Backend error: {0}")]
    Backend(String),

    /// Operation timeout
    #[error("Operation timed out")]
    Timeout,
}
