//! In-process session store with idle eviction.

use crate::session::Session;
use crate::store::SessionStore;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Configuration for [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// How often the background cleaner sweeps for idle sessions.
    pub cleaner_interval: Duration,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            cleaner_interval: Duration::from_secs(60),
        }
    }
}

impl MemoryStoreConfig {
    /// Set the cleaner sweep interval.
    pub fn with_cleaner_interval(mut self, interval: Duration) -> Self {
        self.cleaner_interval = interval;
        self
    }
}

/// In-memory session store.
///
/// Sessions live in a map guarded by a read/write lock. A background
/// cleaner task sweeps the map periodically and evicts every session
/// whose idle timeout has elapsed; every successful [`load`] refreshes a
/// session's access time and thereby extends its life by one timeout
/// window.
///
/// The store must be created inside a Tokio runtime (the cleaner is a
/// spawned task). [`close`] stops the cleaner promptly; dropping the
/// store aborts it as well, so no task outlives the store.
///
/// [`load`]: SessionStore::load
/// [`close`]: SessionStore::close
///
/// # Examples
///
/// ```
/// use portico_session::{MemoryStore, Session, SessionStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MemoryStore::new();
/// let session = Session::new();
/// store.save(&session).await;
/// assert!(store.load(session.id()).await.is_some());
/// store.close().await;
/// # }
/// ```
pub struct MemoryStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    cleaner: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryStore {
    /// Create a store with the default cleaner interval.
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Create a store with the given configuration.
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        let sessions: Arc<RwLock<HashMap<String, Session>>> =
            Arc::new(RwLock::new(HashMap::new()));
        let cleaner = Self::spawn_cleaner(sessions.clone(), config.cleaner_interval);
        Self {
            sessions,
            cleaner: Mutex::new(Some(cleaner)),
        }
    }

    /// Number of sessions currently held.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether the store currently holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    fn spawn_cleaner(
        sessions: Arc<RwLock<HashMap<String, Session>>>,
        interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; skip it so a sweep
            // only ever runs a full interval after startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let mut map = sessions.write();
                let before = map.len();
                map.retain(|_, session| !session.is_expired());
                let evicted = before - map.len();
                if evicted > 0 {
                    debug!(evicted, "evicted idle sessions");
                }
            }
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, id: &str) -> Option<Session> {
        let session = self.sessions.read().get(id).cloned()?;
        session.touch();
        Some(session)
    }

    async fn save(&self, session: &Session) {
        self.sessions
            .write()
            .insert(session.id().to_string(), session.clone());
    }

    async fn remove(&self, session: &Session) {
        self.sessions.write().remove(session.id());
    }

    async fn close(&self) {
        if let Some(cleaner) = self.cleaner.lock().take() {
            cleaner.abort();
        }
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        if let Some(cleaner) = self.cleaner.lock().take() {
            cleaner.abort();
        }
    }
}
