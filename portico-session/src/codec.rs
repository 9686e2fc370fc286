//! Pluggable codec used to marshal sessions for external storage.

use crate::error::{SessionError, SessionResult};
use crate::session::SessionSnapshot;

/// Encode/decode capability turning a session snapshot into bytes and
/// back. A codec is selected at store construction time; store code is
/// agnostic to the format.
pub trait SessionCodec: Send + Sync {
    /// Encode a snapshot into bytes.
    fn encode(&self, snapshot: &SessionSnapshot) -> SessionResult<Vec<u8>>;

    /// Decode bytes into a snapshot.
    fn decode(&self, bytes: &[u8]) -> SessionResult<SessionSnapshot>;
}

/// JSON codec backed by `serde_json`. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl SessionCodec for JsonCodec {
    fn encode(&self, snapshot: &SessionSnapshot) -> SessionResult<Vec<u8>> {
        serde_json::to_vec(snapshot).map_err(|e| SessionError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> SessionResult<SessionSnapshot> {
        serde_json::from_slice(bytes).map_err(|e| SessionError::Deserialization(e.to_string()))
    }
}
