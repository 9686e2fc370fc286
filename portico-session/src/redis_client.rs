//! Redis realization of the cache collaborator.
//!
//! This module requires the `redis` feature flag (enabled by default).

use crate::cache::CacheClient;
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use portico_redis::{RedisError, RedisService};
use std::sync::Arc;
use std::time::Duration;

/// [`CacheClient`] backed by a shared [`RedisService`].
///
/// # Examples
///
/// ```no_run
/// use portico_redis::{RedisConfig, RedisService};
/// use portico_session::{CacheBackedStore, CacheStoreConfig, RedisCacheClient};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let redis = Arc::new(RedisService::new(RedisConfig::new("redis://localhost:6379")).await?);
/// let client = Arc::new(RedisCacheClient::new(redis));
/// let store = CacheBackedStore::new(client, CacheStoreConfig::default());
/// # let _ = store;
/// # Ok(())
/// # }
/// ```
pub struct RedisCacheClient {
    service: Arc<RedisService>,
}

impl RedisCacheClient {
    /// Create a client over a shared Redis service.
    pub fn new(service: Arc<RedisService>) -> Self {
        Self { service }
    }
}

fn map_err(err: RedisError) -> CacheError {
    match err {
        RedisError::Timeout => CacheError::Timeout,
        err if err.is_connection_error() => CacheError::Connection(err.to_string()),
        err => CacheError::Backend(err.to_string()),
    }
}

#[async_trait]
impl CacheClient for RedisCacheClient {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.service.get_bytes(key).await.map_err(map_err)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        self.service.set_bytes(key, value, ttl).await.map_err(map_err)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.service.delete(key).await.map(|_| ()).map_err(map_err)
    }
}
