//! In-memory event bus.
//!
//! Captures every published envelope in order and forwards it to any
//! subscribed listeners. Used by tests and by hosts that only need to
//! observe the engine inside one process.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

/// Listener invoked synchronously for each matching envelope.
pub type EventListener = Arc<dyn Fn(&EventEnvelope) + Send + Sync>;

/// In-memory event bus.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// bus.publish(envelope).await?;
///
/// assert_eq!(bus.event_count(), 1);
/// assert!(bus.has_event("session.started.v1"));
/// ```
#[derive(Default)]
pub struct InMemoryEventBus {
    listeners: RwLock<HashMap<String, Vec<EventListener>>>,
    published: RwLock<Vec<EventEnvelope>>,
    failing: AtomicBool,
}

impl InMemoryEventBus {
    /// Creates a new empty event bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls `listener` for every envelope of `event_type`.
    pub fn subscribe(&self, event_type: &str, listener: EventListener) {
        write(&self.listeners)
            .entry(event_type.to_string())
            .or_default()
            .push(listener);
    }

    /// Makes every publish fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    // === Test Helpers ===

    /// Returns all published events in publish order.
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        read(&self.published).clone()
    }

    /// Event types in publish order.
    pub fn event_types(&self) -> Vec<String> {
        read(&self.published).iter().map(|e| e.event_type.clone()).collect()
    }

    /// Returns events of a specific type.
    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        read(&self.published)
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    /// Returns events for a specific aggregate.
    pub fn events_for_aggregate(&self, aggregate_id: &str) -> Vec<EventEnvelope> {
        read(&self.published)
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect()
    }

    /// Clears all published events.
    pub fn clear(&self) {
        write(&self.published).clear();
    }

    /// Returns count of published events.
    pub fn event_count(&self) -> usize {
        read(&self.published).len()
    }

    /// Checks if a specific event type was published.
    pub fn has_event(&self, event_type: &str) -> bool {
        read(&self.published).iter().any(|e| e.event_type == event_type)
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::new(ErrorCode::PublishFailed, "event bus unavailable")
                .with_detail("event_type", event.event_type.clone()));
        }

        let listeners = read(&self.listeners)
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();
        for listener in listeners {
            listener(&event);
        }

        write(&self.published).push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::extraction::{FallbackReason, TierFallback, TierKind};
    use crate::domain::foundation::{SerializableDomainEvent, SessionId};
    use std::sync::atomic::AtomicUsize;

    fn envelope(session_id: SessionId) -> EventEnvelope {
        TierFallback::new(session_id, TierKind::Model, TierKind::Rules, FallbackReason::Unavailable, None)
            .to_envelope()
            .unwrap()
    }

    #[tokio::test]
    async fn publish_stores_event() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope(SessionId::new())).await.unwrap();

        assert_eq!(bus.event_count(), 1);
        assert!(bus.has_event("extraction.tier_fallback.v1"));
    }

    #[tokio::test]
    async fn events_for_aggregate_filters_correctly() {
        let bus = InMemoryEventBus::new();
        let session = SessionId::new();
        bus.publish(envelope(session)).await.unwrap();
        bus.publish(envelope(SessionId::new())).await.unwrap();

        assert_eq!(bus.events_for_aggregate(&session.to_string()).len(), 1);
        assert_eq!(bus.events_of_type("extraction.tier_fallback.v1").len(), 2);
    }

    #[tokio::test]
    async fn listener_receives_published_event() {
        let bus = InMemoryEventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        bus.subscribe(
            "extraction.tier_fallback.v1",
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        bus.publish(envelope(SessionId::new())).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn publish_all_keeps_order() {
        let bus = InMemoryEventBus::new();
        let first = envelope(SessionId::new());
        let second = envelope(SessionId::new());
        let ids = vec![first.event_id.clone(), second.event_id.clone()];

        bus.publish_all(vec![first, second]).await.unwrap();

        let published: Vec<_> = bus.published_events().into_iter().map(|e| e.event_id).collect();
        assert_eq!(published, ids);
    }

    #[tokio::test]
    async fn failing_bus_rejects_and_stores_nothing() {
        let bus = InMemoryEventBus::new();
        bus.set_failing(true);

        let err = bus.publish(envelope(SessionId::new())).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PublishFailed);
        assert_eq!(bus.event_count(), 0);
    }

    #[tokio::test]
    async fn clear_removes_all_events() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope(SessionId::new())).await.unwrap();
        bus.clear();
        assert_eq!(bus.event_count(), 0);
    }
}
