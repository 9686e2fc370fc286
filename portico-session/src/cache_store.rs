//! Session store backed by an external key/value cache service.

use crate::cache::CacheClient;
use crate::codec::{JsonCodec, SessionCodec};
use crate::error::CacheResult;
use crate::session::{Session, SessionSnapshot};
use crate::store::SessionStore;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Default number of attempts per cache operation.
pub const DEFAULT_RETRIES: u32 = 3;

/// Configuration for [`CacheBackedStore`].
#[derive(Debug, Clone)]
pub struct CacheStoreConfig {
    /// Prefix put in front of session ids to build cache keys.
    pub key_prefix: String,
    /// Number of attempts per cache operation before giving up.
    pub retries: u32,
    /// Optional wall-clock bound over a whole retry loop. When set, an
    /// operation stops retrying once this much time has passed, even if
    /// attempts remain.
    pub retry_deadline: Option<Duration>,
}

impl Default for CacheStoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: "sess:".to_string(),
            retries: DEFAULT_RETRIES,
            retry_deadline: None,
        }
    }
}

impl CacheStoreConfig {
    /// Set the cache key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the attempt count. Zero falls back to [`DEFAULT_RETRIES`].
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Bound the total wall-clock time spent retrying one operation.
    pub fn with_retry_deadline(mut self, deadline: Duration) -> Self {
        self.retry_deadline = Some(deadline);
        self
    }
}

/// Session store that persists sessions in an external key/value cache
/// and keeps a local write-back map of sessions recently touched by this
/// process, so repeated loads of a hot session skip the round-trip.
///
/// Transient service failures are retried up to a configured attempt
/// count (optionally bounded by a wall-clock deadline). Exhausted retries
/// degrade per the store contract: a load reports `None`, a save or
/// remove is logged and dropped. [`close`] flushes the write-back map
/// back to the cache, best-effort, to narrow the window in which in-flight
/// mutations are lost on shutdown.
///
/// One coarse async lock serializes every operation on this instance,
/// covering both the write-back map and the network call. That keeps the
/// retry and ordering semantics trivial at the cost of queueing unrelated
/// operations behind network latency; splitting the map lock from the
/// call path is the known alternative if this instance becomes hot.
///
/// [`close`]: SessionStore::close
pub struct CacheBackedStore {
    client: Arc<dyn CacheClient>,
    codec: Arc<dyn SessionCodec>,
    config: CacheStoreConfig,
    local: Mutex<HashMap<String, Session>>,
}

impl CacheBackedStore {
    /// Create a store over the given cache client with the JSON codec.
    pub fn new(client: Arc<dyn CacheClient>, config: CacheStoreConfig) -> Self {
        let mut config = config;
        if config.retries == 0 {
            config.retries = DEFAULT_RETRIES;
        }
        Self {
            client,
            codec: Arc::new(JsonCodec),
            config,
            local: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the codec used to marshal sessions.
    pub fn with_codec(mut self, codec: Arc<dyn SessionCodec>) -> Self {
        self.codec = codec;
        self
    }

    fn cache_key(&self, id: &str) -> String {
        format!("{}{}", self.config.key_prefix, id)
    }

    /// Run a retry loop under the configured deadline, if any. `None`
    /// means the deadline elapsed before the loop finished.
    async fn bounded<T, F>(&self, fut: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        match self.config.retry_deadline {
            Some(deadline) => tokio::time::timeout(deadline, fut).await.ok(),
            None => Some(fut.await),
        }
    }

    /// Fetch and decode a snapshot, retrying transient failures. A cache
    /// miss stops immediately; it is not an error.
    async fn fetch_snapshot(&self, key: &str) -> CacheResult<Option<SessionSnapshot>> {
        let mut attempt = 0;
        loop {
            match self.client.get(key).await {
                Ok(None) => return Ok(None),
                Ok(Some(bytes)) => {
                    return match self.codec.decode(&bytes) {
                        Ok(snapshot) => Ok(Some(snapshot)),
                        Err(err) => {
                            // A corrupt entry can never decode on replay;
                            // treat it as a miss.
                            warn!(key, error = %err, "failed to decode cached session");
                            Ok(None)
                        }
                    };
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.config.retries {
                        return Err(err);
                    }
                    debug!(key, attempt, error = %err, "transient cache failure, retrying");
                }
            }
        }
    }

    /// Encode and write a session to the cache with its timeout as the
    /// expiration, retrying transient failures. Returns whether the write
    /// landed.
    async fn write_session(&self, session: &Session) -> bool {
        let bytes = match self.codec.encode(&session.snapshot()) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(id = session.id(), error = %err, "failed to encode session");
                return false;
            }
        };
        let key = self.cache_key(session.id());
        let ttl = session.timeout();

        let write = async {
            let mut attempt = 0;
            loop {
                match self.client.set(&key, bytes.clone(), ttl).await {
                    Ok(()) => return true,
                    Err(err) => {
                        attempt += 1;
                        if attempt >= self.config.retries {
                            warn!(
                                id = session.id(),
                                attempts = attempt,
                                error = %err,
                                "giving up persisting session"
                            );
                            return false;
                        }
                        debug!(id = session.id(), attempt, "transient cache failure, retrying");
                    }
                }
            }
        };

        match self.bounded(write).await {
            Some(landed) => landed,
            None => {
                warn!(id = session.id(), "session save hit the retry deadline");
                false
            }
        }
    }

    async fn delete_session(&self, id: &str) -> bool {
        let key = self.cache_key(id);
        let delete = async {
            let mut attempt = 0;
            loop {
                match self.client.delete(&key).await {
                    Ok(()) => return true,
                    Err(err) => {
                        attempt += 1;
                        if attempt >= self.config.retries {
                            warn!(id, attempts = attempt, error = %err, "giving up removing session");
                            return false;
                        }
                    }
                }
            }
        };

        match self.bounded(delete).await {
            Some(landed) => landed,
            None => {
                warn!(id, "session remove hit the retry deadline");
                false
            }
        }
    }
}

#[async_trait]
impl SessionStore for CacheBackedStore {
    async fn load(&self, id: &str) -> Option<Session> {
        let mut local = self.local.lock().await;

        // Sessions recently touched by this process skip the round-trip.
        if let Some(session) = local.get(id) {
            session.touch();
            return Some(session.clone());
        }

        let key = self.cache_key(id);
        let snapshot = match self.bounded(self.fetch_snapshot(&key)).await {
            Some(Ok(Some(snapshot))) => snapshot,
            Some(Ok(None)) => return None,
            Some(Err(err)) => {
                warn!(id, error = %err, "giving up loading session from cache");
                return None;
            }
            None => {
                warn!(id, "session load hit the retry deadline");
                return None;
            }
        };

        let session = Session::from_snapshot(snapshot);
        session.touch();
        local.insert(id.to_string(), session.clone());
        Some(session)
    }

    async fn save(&self, session: &Session) {
        let mut local = self.local.lock().await;
        if self.write_session(session).await {
            debug!(id = session.id(), "session saved to cache");
            local.insert(session.id().to_string(), session.clone());
        }
    }

    async fn remove(&self, session: &Session) {
        let mut local = self.local.lock().await;
        if self.delete_session(session.id()).await {
            local.remove(session.id());
        }
    }

    async fn close(&self) {
        // Best-effort flush of everything this process touched; individual
        // failures are already logged by the write path.
        let local = self.local.lock().await;
        join_all(local.values().map(|session| self.write_session(session))).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::session::SessionOptions;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[derive(Default)]
    struct MockClient {
        entries: StdMutex<HashMap<String, Vec<u8>>>,
        fail_remaining: AtomicU32,
        calls: AtomicU32,
        delay: Option<Duration>,
    }

    impl MockClient {
        fn failing(times: u32) -> Self {
            let client = Self::default();
            client.fail_remaining.store(times, Ordering::SeqCst);
            client
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        async fn before_call(&self) -> CacheResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_remaining.load(Ordering::SeqCst) > 0 {
                self.fail_remaining.fetch_sub(1, Ordering::SeqCst);
                return Err(CacheError::Connection("injected failure".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CacheClient for MockClient {
        async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
            self.before_call().await?;
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: Vec<u8>, _ttl: Duration) -> CacheResult<()> {
            self.before_call().await?;
            self.entries.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }

        async fn delete(&self, key: &str) -> CacheResult<()> {
            self.before_call().await?;
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn store_over(client: Arc<MockClient>) -> CacheBackedStore {
        CacheBackedStore::new(client, CacheStoreConfig::default())
    }

    #[tokio::test]
    async fn test_round_trip_through_remote_cache() {
        let client = Arc::new(MockClient::default());
        let writer = store_over(client.clone());
        let reader = store_over(client.clone());

        let session = SessionOptions::new()
            .with_const_attr("user", "alice")
            .build();
        session.set("cart_size", 2);
        writer.save(&session).await;

        let loaded = reader.load(session.id()).await.unwrap();
        assert_eq!(loaded.id(), session.id());
        assert_eq!(loaded.values(), session.values());
        assert_eq!(loaded.const_attr("user"), Some(&"alice".into()));
        // Hydrated from bytes: an independent object with a fresh lock.
        assert!(!loaded.ptr_eq(&session));
        assert!(!loaded.is_new());
    }

    #[tokio::test]
    async fn test_write_back_hit_skips_network() {
        let client = Arc::new(MockClient::default());
        let store = store_over(client.clone());

        let session = Session::new();
        store.save(&session).await;
        assert_eq!(client.calls(), 1);

        let loaded = store.load(session.id()).await.unwrap();
        assert!(loaded.ptr_eq(&session));
        assert_eq!(client.calls(), 1, "write-back hit must not touch the cache");
    }

    #[tokio::test]
    async fn test_miss_stops_immediately() {
        let client = Arc::new(MockClient::default());
        let store = store_over(client.clone());

        assert!(store.load("nope").await.is_none());
        assert_eq!(client.calls(), 1, "a miss is not an error and is never retried");
    }

    #[tokio::test]
    async fn test_save_survives_failures_below_threshold() {
        let client = Arc::new(MockClient::failing(2));
        let store = store_over(client.clone());

        let session = Session::new();
        store.save(&session).await;

        assert_eq!(client.calls(), 3);
        assert_eq!(client.entries.lock().unwrap().len(), 1);
        // The write landed, so the write-back map serves it locally.
        assert!(store.load(session.id()).await.is_some());
    }

    #[tokio::test]
    async fn test_save_exhaustion_is_silent() {
        let client = Arc::new(MockClient::failing(10));
        let store = store_over(client.clone());

        let session = Session::new();
        store.save(&session).await;

        assert_eq!(client.calls(), 3, "save stops after the configured attempts");
        assert!(client.entries.lock().unwrap().is_empty());

        // Nothing was persisted: a cold store sees nothing.
        client.fail_remaining.store(0, Ordering::SeqCst);
        let cold = store_over(client.clone());
        assert!(cold.load(session.id()).await.is_none());
    }

    #[tokio::test]
    async fn test_load_exhaustion_degrades_to_none() {
        let client = Arc::new(MockClient::failing(3));
        let store = store_over(client.clone());

        assert!(store.load("some-id").await.is_none());
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_remove_clears_remote_and_write_back() {
        let client = Arc::new(MockClient::default());
        let store = store_over(client.clone());

        let session = Session::new();
        store.save(&session).await;
        store.remove(&session).await;

        assert!(client.entries.lock().unwrap().is_empty());
        assert!(store.load(session.id()).await.is_none());

        // Removing an id the cache no longer holds is a no-op.
        store.remove(&session).await;
    }

    #[tokio::test]
    async fn test_close_flushes_write_back_map() {
        let client = Arc::new(MockClient::default());
        let store = store_over(client.clone());

        let session = Session::new();
        session.set("k", "v");
        store.save(&session).await;

        // Simulate the remote entry expiring while the local copy lives on.
        client.entries.lock().unwrap().clear();

        store.close().await;
        assert_eq!(client.entries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_deadline_bounds_wall_clock() {
        let client = Arc::new(MockClient {
            delay: Some(Duration::from_millis(20)),
            ..MockClient::default()
        });
        client.fail_remaining.store(u32::MAX, Ordering::SeqCst);

        let store = CacheBackedStore::new(
            client.clone(),
            CacheStoreConfig::default()
                .with_retries(1000)
                .with_retry_deadline(Duration::from_millis(50)),
        );

        let started = Instant::now();
        assert!(store.load("some-id").await.is_none());
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(client.calls() < 1000);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let client = Arc::new(MockClient::default());
        client
            .entries
            .lock()
            .unwrap()
            .insert("sess:bad".to_string(), b"not json".to_vec());

        let store = store_over(client.clone());
        assert!(store.load("bad").await.is_none());
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_falls_back_to_default() {
        let client = Arc::new(MockClient::failing(2));
        let store = CacheBackedStore::new(
            client.clone(),
            CacheStoreConfig::default().with_retries(0),
        );

        let session = Session::new();
        store.save(&session).await;
        assert_eq!(client.entries.lock().unwrap().len(), 1);
    }
}
