//! Session identity.
//!
//! A `SessionId` names one conversation from `start` to its last turn. It is
//! the aggregate id of every session event, the correlation id on every
//! envelope the conversation publishes, and the key an external store files
//! snapshots under. On the wire it is a bare hyphenated UUID string.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one guided conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Fresh random id for a new conversation.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_conversation_gets_its_own_id() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn displays_as_hyphenated_uuid() {
        let shown = SessionId::new().to_string();
        assert_eq!(shown.len(), 36);
        assert_eq!(shown.matches('-').count(), 4);
    }

    #[test]
    fn stored_as_bare_string_and_read_back() {
        let id = SessionId::new();
        let json = serde_json::to_string(&id).unwrap();

        assert_eq!(json, format!("\"{}\"", id));
        assert_eq!(serde_json::from_str::<SessionId>(&json).unwrap(), id);
    }

    #[test]
    fn malformed_stored_id_is_rejected() {
        assert!(serde_json::from_str::<SessionId>("\"session-7\"").is_err());
    }
}
