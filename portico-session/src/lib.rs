//! Server-side session management for Portico.
//!
//! A [`Session`] is a concurrency-safe bundle of attributes identified by a
//! cryptographically random id. Sessions live in a [`SessionStore`]; this
//! crate ships two:
//!
//! - [`MemoryStore`] - in-process map with a background cleaner that evicts
//!   idle sessions
//! - [`CacheBackedStore`] - persists encoded sessions in an external cache
//!   through a pluggable [`CacheClient`], with retries and a local
//!   write-back map
//!
//! A [`SessionManager`] binds a store to an [`IdentityTransport`] (cookies
//! by default) and [`SessionLayer`] wires the whole thing into a tower
//! request pipeline.
//!
//! # Features
//!
//! - `redis` - Redis-backed [`CacheClient`] (enabled by default)
//!
//! # Examples
//!
//! ## In-memory sessions
//!
//! ```
//! use portico_session::{MemoryStore, Session, SessionStore};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let store = Arc::new(MemoryStore::new());
//!
//!     let session = Session::new();
//!     session.set("user_id", 123);
//!     session.set("username", "alice");
//!     store.save(&session).await;
//!
//!     let loaded = store.load(session.id()).await.unwrap();
//!     assert_eq!(loaded.get_as::<i64>("user_id"), Some(123));
//!
//!     store.remove(&session).await;
//!     store.close().await;
//! }
//! ```
//!
//! ## Redis-backed sessions (requires the `redis` feature)
//!
//! ```no_run
//! use portico_redis::{RedisConfig, RedisService};
//! use portico_session::{CacheBackedStore, CacheStoreConfig, RedisCacheClient, Session, SessionStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let redis = Arc::new(RedisService::new(RedisConfig::new("redis://localhost:6379")).await?);
//!     let client = Arc::new(RedisCacheClient::new(redis));
//!     let store = CacheBackedStore::new(client, CacheStoreConfig::default().with_key_prefix("myapp:sess:"));
//!
//!     let session = Session::new();
//!     session.set("user_id", 123);
//!     store.save(&session).await;
//!     store.close().await;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cache_store;
pub mod codec;
pub mod cookie;
pub mod error;
pub mod manager;
pub mod memory;
pub mod middleware;
pub mod session;
pub mod store;

#[cfg(feature = "redis")]
pub mod redis_client;

pub use cache::CacheClient;
pub use cache_store::{CacheBackedStore, CacheStoreConfig, DEFAULT_RETRIES};
pub use codec::{JsonCodec, SessionCodec};
pub use cookie::{CookieConfig, CookieTransport, SameSite};
pub use error::{CacheError, CacheResult, SessionError, SessionResult};
pub use manager::{IdentityTransport, SessionManager};
pub use memory::{MemoryStore, MemoryStoreConfig};
pub use middleware::{SessionLayer, SessionService, session_from};
pub use session::{
    DEFAULT_ID_LENGTH, DEFAULT_TIMEOUT, Session, SessionOptions, SessionSnapshot,
    generate_session_id,
};
pub use store::SessionStore;

#[cfg(feature = "redis")]
pub use redis_client::RedisCacheClient;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::CacheClient;
    pub use crate::cache_store::{CacheBackedStore, CacheStoreConfig};
    pub use crate::cookie::{CookieConfig, CookieTransport, SameSite};
    pub use crate::error::{CacheError, CacheResult, SessionError, SessionResult};
    pub use crate::manager::{IdentityTransport, SessionManager};
    pub use crate::memory::{MemoryStore, MemoryStoreConfig};
    pub use crate::middleware::{SessionLayer, session_from};
    pub use crate::session::{Session, SessionOptions, generate_session_id};
    pub use crate::store::SessionStore;

    #[cfg(feature = "redis")]
    pub use crate::redis_client::RedisCacheClient;
}
