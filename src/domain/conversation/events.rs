//! Session lifecycle events.
//!
//! - `SessionStarted` - first question asked
//! - `SessionCompleted` - last reachable step passed
//! - `SessionCancelled` - abandoned before completion

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{EventId, Percentage, SessionId, Timestamp};

// ════════════════════════════════════════════════════════════════════════════
// SessionStarted
// ════════════════════════════════════════════════════════════════════════════

/// Published when a session leaves `NotStarted`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStarted {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub template_id: String,
    pub template_version: String,
    /// Step the session opened on.
    pub first_step_id: String,
    pub started_at: Timestamp,
}

crate::domain_event!(
    SessionStarted,
    event_type = "session.started.v1",
    schema_version = 1,
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = started_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SessionCompleted
// ════════════════════════════════════════════════════════════════════════════

/// Published when the last reachable step is passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCompleted {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub template_id: String,
    /// Number of fields holding a value, including explicit blanks.
    pub answered_fields: usize,
    pub completed_at: Timestamp,
}

crate::domain_event!(
    SessionCompleted,
    event_type = "session.completed.v1",
    schema_version = 1,
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = completed_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SessionCancelled
// ════════════════════════════════════════════════════════════════════════════

/// Published when a session is cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCancelled {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub template_id: String,
    /// Step the user was on, if the session had started.
    pub step_id: Option<String>,
    pub completion: Percentage,
    pub cancelled_at: Timestamp,
}

crate::domain_event!(
    SessionCancelled,
    event_type = "session.cancelled.v1",
    schema_version = 1,
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = cancelled_at,
    event_id = event_id
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainEvent, SerializableDomainEvent};

    #[test]
    fn started_event_envelope() {
        let session_id = SessionId::new();
        let event = SessionStarted {
            event_id: EventId::new(),
            session_id,
            template_id: "dmv-renewal".into(),
            template_version: "1.0".into(),
            first_step_id: "personal".into(),
            started_at: Timestamp::now(),
        };

        let envelope = event.to_envelope().unwrap();
        assert_eq!(envelope.event_type, "session.started.v1");
        assert_eq!(envelope.aggregate_id, session_id.to_string());
        assert_eq!(envelope.aggregate_type, "Session");
        assert_eq!(envelope.payload["first_step_id"], "personal");
    }

    #[test]
    fn cancelled_event_carries_completion() {
        let event = SessionCancelled {
            event_id: EventId::new(),
            session_id: SessionId::new(),
            template_id: "ds-160".into(),
            step_id: None,
            completion: Percentage::new(40),
            cancelled_at: Timestamp::now(),
        };

        assert_eq!(event.schema_version(), 1);
        let envelope = event.to_envelope().unwrap();
        assert_eq!(envelope.payload["completion"], 40);
        assert!(envelope.payload["step_id"].is_null());
    }
}
