//! # Portico
//!
//! Server-side session management: an opaque per-client session entity
//! with concurrency-safe attribute access, pluggable session stores, and
//! a tower middleware that binds sessions into a request pipeline.
//!
//! This crate is a facade over the workspace members; see
//! [`portico_session`] for the core API and [`portico_redis`] for the
//! Redis integration (feature `redis`, on by default).
//!
//! ## Quick Start
//!
//! ```
//! use portico::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let manager = SessionManager::cookie(Arc::new(MemoryStore::new()));
//!
//! let session = Session::new();
//! session.set("user_id", 123);
//!
//! let mut response = http::HeaderMap::new();
//! manager.save(&session, &mut response).await;
//! assert!(response.contains_key(http::header::SET_COOKIE));
//!
//! let mut request = http::HeaderMap::new();
//! request.insert(
//!     http::header::COOKIE,
//!     format!("sessid={}", session.id()).parse().unwrap(),
//! );
//! let loaded = manager.load(&request).await.unwrap();
//! assert_eq!(loaded.get_as::<i64>("user_id"), Some(123));
//!
//! manager.close().await;
//! # }
//! ```

// Re-export the session core
pub use portico_session::*;

// Re-export the Redis integration
#[cfg(feature = "redis")]
pub use portico_redis;

// Prelude for common imports
pub mod prelude {
    pub use portico_session::prelude::*;

    #[cfg(feature = "redis")]
    pub use portico_redis::{RedisConfig, RedisService};
}
