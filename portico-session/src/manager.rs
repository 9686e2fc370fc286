//! Session manager: binds a store to an identity transport.

use crate::cookie::CookieTransport;
use crate::session::Session;
use crate::store::SessionStore;
use http::HeaderMap;
use std::sync::Arc;

/// Carries the session id between client and server.
///
/// The manager treats this as an opaque capability: something that can
/// pull a candidate id out of inbound request headers and record or clear
/// an id on outbound response headers. The concrete realization in this
/// crate is [`CookieTransport`]; operating on header maps keeps the seam
/// independent of any particular body or framework type.
pub trait IdentityTransport: Send + Sync {
    /// Extract a candidate session id from inbound request headers.
    fn extract(&self, headers: &HeaderMap) -> Option<String>;

    /// Record an id on outbound response headers so a future request can
    /// present it again.
    fn record(&self, id: &str, headers: &mut HeaderMap);

    /// Clear any recorded id on outbound response headers.
    fn clear(&self, headers: &mut HeaderMap);
}

/// Binds one [`SessionStore`] to one [`IdentityTransport`], producing the
/// request-scoped load/save/remove operations.
///
/// A manager is an explicitly constructed, caller-owned value: build one
/// at startup and pass it (usually as `Arc<SessionManager>`) to whatever
/// wires the request pipeline.
///
/// # Examples
///
/// ```
/// use portico_session::{MemoryStore, Session, SessionManager};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let manager = SessionManager::cookie(Arc::new(MemoryStore::new()));
///
/// let session = Session::new();
/// session.set("user_id", 123);
///
/// let mut response_headers = http::HeaderMap::new();
/// manager.save(&session, &mut response_headers).await;
/// assert!(response_headers.contains_key(http::header::SET_COOKIE));
/// # manager.close().await;
/// # }
/// ```
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    transport: Arc<dyn IdentityTransport>,
}

impl SessionManager {
    /// Create a manager over an explicit store and transport.
    pub fn new(store: Arc<dyn SessionStore>, transport: Arc<dyn IdentityTransport>) -> Self {
        Self { store, transport }
    }

    /// Create a manager using the default cookie transport.
    pub fn cookie(store: Arc<dyn SessionStore>) -> Self {
        Self::new(store, Arc::new(CookieTransport::new()))
    }

    /// Load the session identified by the inbound request headers.
    ///
    /// Returns `None` when the transport finds no candidate id or the
    /// store holds no session for it. No session is fabricated here; that
    /// is the middleware's (or the caller's) job.
    pub async fn load(&self, headers: &HeaderMap) -> Option<Session> {
        let id = self.transport.extract(headers)?;
        self.store.load(&id).await
    }

    /// Record the session id on the outbound response and save the
    /// session to the store.
    pub async fn save(&self, session: &Session, headers: &mut HeaderMap) {
        self.transport.record(session.id(), headers);
        self.store.save(session).await;
    }

    /// Clear any recorded id on the outbound response and remove the
    /// session from the store.
    pub async fn remove(&self, session: &Session, headers: &mut HeaderMap) {
        self.transport.clear(headers);
        self.store.remove(session).await;
    }

    /// Close the underlying store.
    pub async fn close(&self) {
        self.store.close().await;
    }
}
