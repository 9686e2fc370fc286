//! Session store trait definition.

use crate::session::Session;
use async_trait::async_trait;

/// A session store holds sessions and makes them retrievable by id on
/// the server side.
///
/// # Failure contract
///
/// Store operations never surface errors to the caller. A load that fails
/// inside the store (after retries, where applicable) reports `None`; a
/// save or remove that fails is logged and dropped. This one-way contract
/// keeps the request pipeline fire-and-forget: a session that could not
/// be persisted simply does not come back on the next load.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session with the given id.
    ///
    /// A successful load registers an access on the session, extending its
    /// idle window. Returns `None` if the store holds no session with this
    /// id (expired, removed, or never saved).
    async fn load(&self, id: &str) -> Option<Session>;

    /// Save a session to the store, inserting or overwriting the entry
    /// for its id.
    async fn save(&self, session: &Session);

    /// Remove a session from the store. Removing an id the store does not
    /// hold is a no-op.
    async fn remove(&self, session: &Session);

    /// Close the store, releasing any resources that were allocated
    /// (background tasks, buffered writes).
    async fn close(&self);
}
