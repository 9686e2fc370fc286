//! External cache collaborator seam.

use crate::error::CacheResult;
use async_trait::async_trait;
use std::time::Duration;

/// Byte-oriented client for an external key/value cache service.
///
/// The cache-backed store talks to its remote service exclusively through
/// this trait, which keeps the store testable against scripted fakes and
/// lets backends be swapped without touching store logic.
///
/// A missing key is a normal outcome, not an error: `get` reports it as
/// `Ok(None)`. An `Err` from any method is a service failure the store
/// treats as transient and retries.
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Get the bytes stored at a key, or `None` on a cache miss.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store bytes at a key with an expiration.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;
}
