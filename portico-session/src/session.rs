//! Session entity and its concurrency-safe state.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default session timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default byte length of the random material behind a session id.
/// URL-safe base64 turns 18 bytes into a 24-character id.
pub const DEFAULT_ID_LENGTH: usize = 18;

/// Generate a new session id from `byte_len` cryptographically secure
/// random bytes, URL-safe base64 encoded.
pub fn generate_session_id(byte_len: usize) -> String {
    let mut buf = vec![0u8; byte_len];
    rand::thread_rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

/// A server-side session: an opaque id plus attribute state shared by
/// every handler working on behalf of the same client.
///
/// `Session` is a cheap clonable handle; clones refer to the same
/// underlying state. Mutable attributes and the access time are guarded
/// by an internal read/write lock, so a session loaded once from a store
/// may be read and written by concurrent request handlers. Constant
/// attributes are set at creation and readable without synchronization.
///
/// # Examples
///
/// ```
/// use portico_session::Session;
///
/// let session = Session::new();
/// session.set("user_id", 123);
/// assert_eq!(session.get("user_id"), Some(123.into()));
/// assert!(session.changed());
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: String,
    created: DateTime<Utc>,
    timeout: Duration,
    const_attrs: HashMap<String, Value>,
    state: RwLock<SessionState>,
}

struct SessionState {
    attrs: HashMap<String, Value>,
    accessed: DateTime<Utc>,
    changed: bool,
}

/// Serializable snapshot of a session, used by stores that persist
/// sessions outside process memory.
///
/// The snapshot deliberately omits the synchronization primitive and the
/// access time: hydrating a snapshot always allocates a fresh lock and
/// stamps the access time with the current instant, so a restored session
/// is live and is never reported as new.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session id
    pub id: String,
    /// Creation time
    pub created: DateTime<Utc>,
    /// Session timeout
    pub timeout: Duration,
    /// Constant attributes specified at creation
    #[serde(default)]
    pub const_attrs: HashMap<String, Value>,
    /// Mutable attributes
    #[serde(default)]
    pub attrs: HashMap<String, Value>,
}

impl Session {
    /// Create a new session with default options: a freshly generated
    /// 24-character id and a 30-minute timeout.
    pub fn new() -> Self {
        SessionOptions::new().build()
    }

    /// Start building a session with explicit options.
    pub fn options() -> SessionOptions {
        SessionOptions::new()
    }

    /// Reconstruct a session from a persisted snapshot.
    ///
    /// The result is an independent session object with its own lock. Its
    /// access time is set to now, so `created < accessed` and
    /// [`is_new`](Self::is_new) reports `false`.
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: snapshot.id,
                created: snapshot.created,
                timeout: snapshot.timeout,
                const_attrs: snapshot.const_attrs,
                state: RwLock::new(SessionState {
                    attrs: snapshot.attrs,
                    accessed: Utc::now(),
                    changed: false,
                }),
            }),
        }
    }

    /// Take a serializable snapshot of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.read();
        SessionSnapshot {
            id: self.inner.id.clone(),
            created: self.inner.created,
            timeout: self.inner.timeout,
            const_attrs: self.inner.const_attrs.clone(),
            attrs: state.attrs.clone(),
        }
    }

    /// The id of the session.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Whether the session is new: no access has been registered since
    /// creation, so the creation and access times are still equal.
    pub fn is_new(&self) -> bool {
        self.inner.created == self.inner.state.read().accessed
    }

    /// Get a constant attribute provided at session creation.
    ///
    /// Constant attributes cannot change during the lifetime of a session,
    /// so they can be read without synchronization. Typical use is the
    /// authenticated user.
    pub fn const_attr(&self, name: &str) -> Option<&Value> {
        self.inner.const_attrs.get(name)
    }

    /// Get the value of an attribute. Safe for concurrent use.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner.state.read().attrs.get(name).cloned()
    }

    /// Get an attribute deserialized into a concrete type.
    ///
    /// Returns `None` if the attribute is absent or does not deserialize
    /// into `T`.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, name: &str) -> Option<T> {
        let value = self.get(name)?;
        serde_json::from_value(value).ok()
    }

    /// Set the value of an attribute. Safe for concurrent use.
    ///
    /// Passing [`Value::Null`] deletes the attribute. Every call marks the
    /// session changed, even when the new value equals the old one.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        let mut state = self.inner.state.write();
        if value.is_null() {
            state.attrs.remove(&name);
        } else {
            state.attrs.insert(name, value);
        }
        state.changed = true;
    }

    /// Remove an attribute, returning its previous value.
    ///
    /// Marks the session changed regardless of whether the attribute
    /// existed.
    pub fn remove(&self, name: &str) -> Option<Value> {
        let mut state = self.inner.state.write();
        let prev = state.attrs.remove(name);
        state.changed = true;
        prev
    }

    /// A snapshot copy of all mutable attributes. Safe for concurrent use.
    ///
    /// The returned map is detached from the session; mutating it has no
    /// effect on session state.
    pub fn values(&self) -> HashMap<String, Value> {
        self.inner.state.read().attrs.clone()
    }

    /// The session creation time.
    pub fn created(&self) -> DateTime<Utc> {
        self.inner.created
    }

    /// The time the session was last accessed.
    pub fn accessed(&self) -> DateTime<Utc> {
        self.inner.state.read().accessed
    }

    /// The session timeout. A session may be evicted automatically once it
    /// has not been accessed for this duration.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Register an access: set the last accessed time to now.
    ///
    /// Stores call this on every successful load; application code does
    /// not need to.
    pub fn touch(&self) {
        self.inner.state.write().accessed = Utc::now();
    }

    /// Whether the idle timeout has elapsed since the last access.
    pub fn is_expired(&self) -> bool {
        let accessed = self.accessed();
        Utc::now()
            .signed_duration_since(accessed)
            .to_std()
            .map(|idle| idle > self.inner.timeout)
            .unwrap_or(false)
    }

    /// Whether any attribute has been written since the session was
    /// created or loaded.
    pub fn changed(&self) -> bool {
        self.inner.state.read().changed
    }

    /// Whether two handles refer to the same session object.
    pub fn ptr_eq(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("created", &self.inner.created)
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

/// Options for creating a [`Session`].
///
/// All fields are optional; defaults are a generated id
/// ([`DEFAULT_ID_LENGTH`] random bytes), the current time, an empty
/// attribute set and [`DEFAULT_TIMEOUT`].
///
/// # Examples
///
/// ```
/// use portico_session::SessionOptions;
/// use std::time::Duration;
///
/// let session = SessionOptions::new()
///     .with_timeout(Duration::from_secs(600))
///     .with_const_attr("user", "alice")
///     .build();
///
/// assert_eq!(session.const_attr("user"), Some(&"alice".into()));
/// assert_eq!(session.timeout(), Duration::from_secs(600));
/// ```
#[derive(Default)]
pub struct SessionOptions {
    id: Option<String>,
    created: Option<DateTime<Utc>>,
    timeout: Option<Duration>,
    id_length: Option<usize>,
    const_attrs: HashMap<String, Value>,
    attrs: HashMap<String, Value>,
}

impl SessionOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a caller-supplied id instead of generating one.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Use a caller-supplied creation time.
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    /// Set the session timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the byte length of the random material behind generated ids.
    pub fn with_id_length(mut self, byte_len: usize) -> Self {
        self.id_length = Some(byte_len);
        self
    }

    /// Add a constant attribute.
    pub fn with_const_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.const_attrs.insert(name.into(), value.into());
        self
    }

    /// Add every entry of `attrs` as a constant attribute.
    pub fn with_const_attrs(mut self, attrs: HashMap<String, Value>) -> Self {
        self.const_attrs.extend(attrs);
        self
    }

    /// Add an initial mutable attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Add every entry of `attrs` as an initial mutable attribute.
    pub fn with_attrs(mut self, attrs: HashMap<String, Value>) -> Self {
        self.attrs.extend(attrs);
        self
    }

    /// Build the session.
    ///
    /// A session built without an explicit creation time has
    /// `created == accessed` exactly and reports
    /// [`is_new`](Session::is_new) until the first
    /// [`touch`](Session::touch).
    pub fn build(self) -> Session {
        let now = Utc::now();
        let id_length = match self.id_length {
            Some(len) if len > 0 => len,
            _ => DEFAULT_ID_LENGTH,
        };
        let id = self.id.unwrap_or_else(|| generate_session_id(id_length));
        let timeout = match self.timeout {
            Some(t) if !t.is_zero() => t,
            _ => DEFAULT_TIMEOUT,
        };

        Session {
            inner: Arc::new(SessionInner {
                id,
                created: self.created.unwrap_or(now),
                timeout,
                const_attrs: self.const_attrs,
                state: RwLock::new(SessionState {
                    attrs: self.attrs,
                    accessed: now,
                    changed: false,
                }),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_unique_and_sized() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let id = generate_session_id(DEFAULT_ID_LENGTH);
            assert_eq!(id.len(), 24);
            let decoded = URL_SAFE_NO_PAD.decode(&id).unwrap();
            assert_eq!(decoded.len(), DEFAULT_ID_LENGTH);
            assert!(seen.insert(id), "duplicate session id generated");
        }
    }

    #[test]
    fn test_generated_id_respects_byte_length() {
        for len in [8, 18, 32, 64] {
            let id = generate_session_id(len);
            let decoded = URL_SAFE_NO_PAD.decode(&id).unwrap();
            assert_eq!(decoded.len(), len);
        }
    }

    #[test]
    fn test_new_session_is_new_until_touched() {
        let session = Session::new();
        assert_eq!(session.created(), session.accessed());
        assert!(session.is_new());
        assert!(!session.changed());

        std::thread::sleep(std::time::Duration::from_millis(5));
        session.touch();
        assert!(session.accessed() > session.created());
        assert!(!session.is_new());
    }

    #[test]
    fn test_set_get_and_null_deletes() {
        let session = Session::new();
        session.set("name", "alice");
        assert_eq!(session.get("name"), Some("alice".into()));
        assert!(session.changed());

        session.set("name", Value::Null);
        assert_eq!(session.get("name"), None);
    }

    #[test]
    fn test_set_marks_changed_even_on_equal_value() {
        let session = SessionOptions::new().with_attr("count", 1).build();
        assert!(!session.changed());

        session.set("count", 1);
        assert!(session.changed());
    }

    #[test]
    fn test_remove_returns_previous_value() {
        let session = Session::new();
        session.set("k", "v");
        assert_eq!(session.remove("k"), Some("v".into()));
        assert_eq!(session.remove("k"), None);
        assert!(session.changed());
    }

    #[test]
    fn test_values_snapshot_is_detached() {
        let session = Session::new();
        session.set("a", 1);

        let mut values = session.values();
        values.insert("b".to_string(), 2.into());

        assert_eq!(session.get("b"), None);
        assert_eq!(session.values().len(), 1);
    }

    #[test]
    fn test_const_attrs_are_fixed() {
        let session = SessionOptions::new()
            .with_const_attr("user", "alice")
            .build();
        assert_eq!(session.const_attr("user"), Some(&"alice".into()));
        assert_eq!(session.const_attr("missing"), None);
        // Const attrs never show up among mutable values.
        assert!(session.values().is_empty());
    }

    #[test]
    fn test_typed_get() {
        let session = Session::new();
        session.set("count", 42);
        assert_eq!(session.get_as::<i64>("count"), Some(42));
        assert_eq!(session.get_as::<String>("count"), None);
    }

    #[test]
    fn test_concurrent_writers_lose_no_updates() {
        let session = Session::new();
        let threads = 8;
        let keys_per_thread = 50;

        std::thread::scope(|scope| {
            for t in 0..threads {
                let session = session.clone();
                scope.spawn(move || {
                    for k in 0..keys_per_thread {
                        session.set(format!("t{}-k{}", t, k), k as i64);
                    }
                });
            }
        });

        let values = session.values();
        assert_eq!(values.len(), threads * keys_per_thread);
        for t in 0..threads {
            for k in 0..keys_per_thread {
                assert_eq!(values.get(&format!("t{}-k{}", t, k)), Some(&(k as i64).into()));
            }
        }
    }

    #[test]
    fn test_snapshot_round_trip() {
        let session = SessionOptions::new()
            .with_const_attr("user", "alice")
            .with_timeout(Duration::from_secs(120))
            .build();
        session.set("cart", vec![1, 2, 3]);

        std::thread::sleep(std::time::Duration::from_millis(5));
        let restored = Session::from_snapshot(session.snapshot());

        assert_eq!(restored.id(), session.id());
        assert_eq!(restored.created(), session.created());
        assert_eq!(restored.timeout(), session.timeout());
        assert_eq!(restored.values(), session.values());
        assert_eq!(restored.const_attr("user"), Some(&"alice".into()));
        // Hydration stamps a fresh access time: restored sessions are not new.
        assert!(!restored.is_new());
        assert!(restored.accessed() > restored.created());
        assert!(!restored.changed());
        assert!(!restored.ptr_eq(&session));
    }

    #[test]
    fn test_expiry() {
        let session = SessionOptions::new()
            .with_timeout(Duration::from_millis(10))
            .build();
        assert!(!session.is_expired());
        std::thread::sleep(std::time::Duration::from_millis(30));
        assert!(session.is_expired());

        session.touch();
        assert!(!session.is_expired());
    }
}
