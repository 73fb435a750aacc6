//! FormConversation - async service owning one conversation session.
//!
//! Serializes turns, runs the tier chain outside the domain, supports
//! cancelling an in-flight turn and publishes lifecycle events.
//!
//! # Concurrency
//!
//! - One turn at a time: a `submit` while another is running returns
//!   `EngineError::Busy` and leaves the answers untouched
//! - `cancel_turn` drops the running extraction; nothing it produced is
//!   merged, even if it would have finished later
//! - Reads (`snapshot`, `status`) wait for the running turn to finish

use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use super::errors::EngineError;
use crate::adapters::tiers::{ChainOutcome, TierChain};
use crate::config::ConversationConfig;
use crate::domain::conversation::{
    ConversationSession, SessionSnapshot, SessionStatus, TurnOutcome,
};
use crate::domain::foundation::{Percentage, SerializableDomainEvent, SessionId};
use crate::domain::template::Template;
use crate::domain::validation::TypedValue;
use crate::ports::EventPublisher;

/// One guided conversation over one template.
pub struct FormConversation {
    session_id: SessionId,
    session: Mutex<ConversationSession>,
    chain: Arc<TierChain>,
    publisher: Arc<dyn EventPublisher>,
    /// Bumped to cancel the running turn.
    cancel_tx: watch::Sender<u64>,
}

impl FormConversation {
    /// Creates a conversation with a fresh session.
    pub fn new(
        template: Arc<Template>,
        config: &ConversationConfig,
        chain: Arc<TierChain>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        let session = ConversationSession::new(template)
            .with_step_restriction(config.restrict_updates_to_step);
        Self::from_session(session, chain, publisher)
    }

    /// Wraps an existing (e.g. restored) session.
    pub fn from_session(
        session: ConversationSession,
        chain: Arc<TierChain>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        let (cancel_tx, _) = watch::channel(0);
        Self {
            session_id: session.id(),
            session: Mutex::new(session),
            chain,
            publisher,
            cancel_tx,
        }
    }

    /// Restores a session from a snapshot and wraps it.
    pub fn restore(
        template: Arc<Template>,
        snapshot: SessionSnapshot,
        chain: Arc<TierChain>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<Self, EngineError> {
        let session = ConversationSession::restore(template, snapshot)?;
        Ok(Self::from_session(session, chain, publisher))
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Starts the session and returns the first question.
    pub async fn start(&self) -> Result<TurnOutcome, EngineError> {
        let mut session = self.session.try_lock().map_err(|_| EngineError::Busy)?;
        let outcome = session.start()?;

        self.publish(&session.started_event()).await;
        if outcome.is_completed() {
            self.publish(&session.completed_event()).await;
        }
        Ok(outcome)
    }

    /// Runs one turn: tier chain, validation, merge, navigation.
    ///
    /// # Errors
    ///
    /// - `Busy` if another turn is running
    /// - `TurnCancelled` if `cancel_turn` or `cancel` interrupted this turn
    /// - `Session(InvalidState)` unless the session is in progress
    pub async fn submit(&self, utterance: &str) -> Result<TurnOutcome, EngineError> {
        let mut session = self.session.try_lock().map_err(|_| EngineError::Busy)?;
        let request = session.extraction_request(utterance)?;
        let mut cancelled = self.cancel_tx.subscribe();

        let chain_outcome: ChainOutcome = tokio::select! {
            outcome = self.chain.extract(self.session_id, &request) => outcome,
            _ = cancelled.changed() => {
                info!(session_id = %self.session_id, "turn cancelled, discarding extraction");
                return Err(EngineError::TurnCancelled);
            }
        };

        for fallback in &chain_outcome.fallbacks {
            self.publish(fallback).await;
        }
        if cancelled.has_changed().unwrap_or(false) {
            info!(session_id = %self.session_id, "turn cancelled while publishing, discarding extraction");
            return Err(EngineError::TurnCancelled);
        }

        let outcome = session.apply_extraction(chain_outcome.result, Some(chain_outcome.tier))?;
        if outcome.is_completed() {
            self.publish(&session.completed_event()).await;
        }
        Ok(outcome)
    }

    /// Replaces one answer (review edits included).
    pub async fn edit_answer(&self, field_id: &str, raw: &str) -> Result<TypedValue, EngineError> {
        let mut session = self.session.try_lock().map_err(|_| EngineError::Busy)?;
        Ok(session.edit_answer(field_id, raw)?)
    }

    /// Interrupts the running turn, if any. The session stays usable.
    pub fn cancel_turn(&self) {
        self.cancel_tx.send_modify(|generation| *generation += 1);
    }

    /// Interrupts the running turn and cancels the session.
    pub async fn cancel(&self) -> Result<(), EngineError> {
        self.cancel_turn();
        let mut session = self.session.lock().await;
        session.cancel()?;
        self.publish(&session.cancelled_event()).await;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn status(&self) -> SessionStatus {
        self.session.lock().await.status()
    }

    pub async fn completion(&self) -> Percentage {
        self.session.lock().await.completion()
    }

    /// Serializable state for an external store.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Publishes one event correlated to this session; failures are
    /// logged, never surfaced.
    async fn publish<E>(&self, event: &E)
    where
        E: SerializableDomainEvent + Sync,
    {
        let result = match event.to_envelope() {
            Ok(envelope) => {
                let envelope = envelope.with_correlation_id(self.session_id.to_string());
                self.publisher.publish(envelope).await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(
                session_id = %self.session_id,
                event_type = event.event_type(),
                event_id = %event.event_id(),
                error = %e,
                "event publish failed"
            );
        }
    }
}
