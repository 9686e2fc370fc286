//! # Portico Redis
//!
//! Redis client integration for Portico session stores.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use portico_redis::{RedisConfig, RedisService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RedisConfig::builder()
//!         .url("redis://localhost:6379")
//!         .build();
//!
//!     let redis = RedisService::new(config).await?;
//!     redis.health_check().await?;
//!
//!     redis
//!         .set_bytes("greeting", b"hello".to_vec(), std::time::Duration::from_secs(60))
//!         .await?;
//!     let value = redis.get_bytes("greeting").await?;
//!     assert_eq!(value.as_deref(), Some(b"hello".as_slice()));
//!
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod service;

pub use config::{RedisConfig, RedisConfigBuilder};
pub use error::{RedisError, Result};
pub use service::RedisService;

// Re-export redis crate for convenience
pub use redis;
pub use redis::AsyncCommands;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::config::{RedisConfig, RedisConfigBuilder};
    pub use crate::error::{RedisError, Result};
    pub use crate::service::RedisService;
}
