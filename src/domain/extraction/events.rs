//! Tier fallback event.

use serde::{Deserialize, Serialize};

use super::request::TierKind;
use crate::domain::foundation::{EventId, SessionId, Timestamp};

/// Why a tier was passed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    Unavailable,
    Failed,
    TimedOut,
}

/// Published each time the chain moves past a tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierFallback {
    pub event_id: EventId,
    pub session_id: SessionId,
    pub from_tier: TierKind,
    pub to_tier: TierKind,
    pub reason: FallbackReason,
    /// Error text when the tier failed.
    pub detail: Option<String>,
    pub occurred_at: Timestamp,
}

crate::domain_event!(
    TierFallback,
    event_type = "extraction.tier_fallback.v1",
    schema_version = 1,
    aggregate_id = session_id,
    aggregate_type = "Session",
    occurred_at = occurred_at,
    event_id = event_id
);

impl TierFallback {
    pub fn new(
        session_id: SessionId,
        from_tier: TierKind,
        to_tier: TierKind,
        reason: FallbackReason,
        detail: Option<String>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            session_id,
            from_tier,
            to_tier,
            reason,
            detail,
            occurred_at: Timestamp::now(),
        }
    }
}
