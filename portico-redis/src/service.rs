//! Redis service over a multiplexed connection manager.

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::{RedisConfig, RedisError, Result};

/// Redis service providing a shared connection and byte-oriented commands.
///
/// The service wraps a [`ConnectionManager`], which multiplexes commands
/// over a single connection and reconnects transparently. One service
/// instance is meant to be shared (`Arc`) by everything in the process
/// that talks to the same Redis.
pub struct RedisService {
    config: RedisConfig,
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisService {
    /// Connect to Redis with the given configuration.
    ///
    /// Connection establishment is bounded by `config.connection_timeout`.
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.connection_url())
            .map_err(|e| RedisError::Connection(e.to_string()))?;

        let connect = ConnectionManager::new(client);
        let conn = match tokio::time::timeout(config.connection_timeout, connect).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(err)) => {
                warn!(error = %err, "failed to connect to redis");
                return Err(RedisError::Connection(err.to_string()));
            }
            Err(_) => {
                warn!(timeout = ?config.connection_timeout, "timed out connecting to redis");
                return Err(RedisError::Timeout);
            }
        };

        Ok(Self { config, conn })
    }

    /// Get the configuration.
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Get a handle to the shared connection.
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Run a command future under the configured command timeout.
    async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.config.command_timeout, fut).await {
            Ok(res) => Ok(res?),
            Err(_) => {
                warn!(timeout = ?self.config.command_timeout, "redis command timed out");
                Err(RedisError::Timeout)
            }
        }
    }

    /// Check if the connection is healthy.
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.connection();
        let _: String = self
            .run(async move { redis::cmd("PING").query_async(&mut conn).await })
            .await?;
        Ok(())
    }

    /// Get the raw bytes stored at a key. `None` means the key does not exist.
    pub async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection();
        let key = key.to_string();
        self.run(async move { conn.get(key).await }).await
    }

    /// Set raw bytes at a key with an expiration.
    ///
    /// A zero `ttl` stores the value without expiration.
    pub async fn set_bytes(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.connection();
        let key = key.to_string();
        if ttl.is_zero() {
            self.run(async move { conn.set(key, value).await }).await
        } else {
            let secs = ttl.as_secs().max(1);
            self.run(async move { conn.set_ex(key, value, secs).await })
                .await
        }
    }

    /// Delete a key. Returns whether the key existed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection();
        let key = key.to_string();
        let deleted: u32 = self.run(async move { conn.del(key).await }).await?;
        Ok(deleted > 0)
    }
}
