//! Tier Chain - ordered fallback across extraction tiers.
//!
//! Tries tiers in fixed priority (model, retrieval, rules). Unavailable
//! tiers are skipped; an available tier that errors or exceeds the
//! per-tier timeout falls through to the next. The rule tier is the
//! terminal fallback and is always present.
//!
//! With a context index configured, snippets are fetched once per turn and
//! attached to the request before any tier runs, so the model tier sees the
//! same context as the retrieval tier.
//!
//! # Example
//!
//! ```ignore
//! let chain = TierChain::new()
//!     .with_tier(Arc::new(ModelTier::new(model)))
//!     .with_tier(Arc::new(RetrievalTier::new(index.clone())))
//!     .with_context_index(index, 3, 0.0)
//!     .with_event_callback(callback);
//!
//! let outcome = chain.extract(session_id, &request).await;
//! ```

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::rule::RuleTier;
use crate::domain::extraction::{
    ExtractionRequest, ExtractionResult, FallbackReason, TierFallback, TierKind,
};
use crate::domain::foundation::SessionId;
use crate::ports::{ContentIndex, ExtractionError, ExtractionTier};

/// Callback for receiving tier fallback events.
pub trait TierEventCallback: Send + Sync {
    fn on_fallback(&self, event: TierFallback);
}

/// No-op event callback for when event tracking isn't needed.
#[derive(Debug, Clone, Copy)]
pub struct NoOpEventCallback;

impl TierEventCallback for NoOpEventCallback {
    fn on_fallback(&self, _event: TierFallback) {}
}

/// What happened to one tier during a chain run.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Succeeded,
    Unavailable,
    Failed(ExtractionError),
}

/// One entry of the attempt log.
#[derive(Debug, Clone, PartialEq)]
pub struct TierAttempt {
    pub tier: TierKind,
    pub outcome: AttemptOutcome,
}

/// Result of a chain run.
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub result: ExtractionResult,
    /// Tier whose proposals are in `result`.
    pub tier: TierKind,
    /// Every tier considered, in order.
    pub attempts: Vec<TierAttempt>,
    /// Events raised for each tier passed over.
    pub fallbacks: Vec<TierFallback>,
}

impl ChainOutcome {
    pub fn fell_back(&self) -> bool {
        !self.fallbacks.is_empty()
    }
}

/// Priority-ordered tier fallback.
pub struct TierChain {
    tiers: Vec<Arc<dyn ExtractionTier>>,
    terminal: RuleTier,
    tier_timeout: Option<Duration>,
    event_callback: Arc<dyn TierEventCallback>,
    context: Option<ContextSource>,
}

/// Where per-turn context snippets come from.
struct ContextSource {
    index: Arc<dyn ContentIndex>,
    top_k: usize,
    min_similarity: f32,
}

impl Default for TierChain {
    fn default() -> Self {
        Self::new()
    }
}

impl TierChain {
    /// Creates a chain holding only the rule tier.
    pub fn new() -> Self {
        Self {
            tiers: vec![Arc::new(RuleTier::new())],
            terminal: RuleTier::new(),
            tier_timeout: None,
            event_callback: Arc::new(NoOpEventCallback),
            context: None,
        }
    }

    /// Adds a tier, replacing any tier of the same kind.
    pub fn with_tier(mut self, tier: Arc<dyn ExtractionTier>) -> Self {
        let kind = tier.kind();
        self.tiers.retain(|t| t.kind() != kind);
        self.tiers.push(tier);
        self.tiers.sort_by_key(|t| priority(t.kind()));
        self
    }

    /// Caps each tier's `extract`; exceeding it counts as tier failure.
    pub fn with_tier_timeout(mut self, timeout: Duration) -> Self {
        self.tier_timeout = Some(timeout);
        self
    }

    /// Sets the event callback for receiving fallback events.
    pub fn with_event_callback(mut self, callback: Arc<dyn TierEventCallback>) -> Self {
        self.event_callback = callback;
        self
    }

    /// Fetches up to `top_k` snippets scoring at least `min_similarity` once
    /// per turn and attaches them to the request every tier receives.
    pub fn with_context_index(
        mut self,
        index: Arc<dyn ContentIndex>,
        top_k: usize,
        min_similarity: f32,
    ) -> Self {
        self.context = Some(ContextSource {
            index,
            top_k,
            min_similarity: min_similarity.clamp(0.0, 1.0),
        });
        self
    }

    /// Tier kinds in the order they are tried.
    pub fn kinds(&self) -> Vec<TierKind> {
        self.tiers.iter().map(|t| t.kind()).collect()
    }

    /// Runs the chain. Never fails: if every tier errors, the built-in rule
    /// heuristics answer.
    pub async fn extract(&self, session_id: SessionId, request: &ExtractionRequest) -> ChainOutcome {
        let enriched = self.with_retrieved_context(request).await;
        let request = enriched.as_ref().unwrap_or(request);
        let mut attempts = Vec::with_capacity(self.tiers.len());
        let mut fallbacks = Vec::new();

        for (position, tier) in self.tiers.iter().enumerate() {
            let kind = tier.kind();
            let next = self
                .tiers
                .get(position + 1)
                .map(|t| t.kind())
                .unwrap_or(TierKind::Rules);

            if !tier.is_available() {
                debug!(tier = %kind, "tier unavailable, skipping");
                attempts.push(TierAttempt {
                    tier: kind,
                    outcome: AttemptOutcome::Unavailable,
                });
                fallbacks.push(self.fall_back(session_id, kind, next, FallbackReason::Unavailable, None));
                continue;
            }

            debug!(tier = %kind, "tier selected");
            match self.run(tier.as_ref(), request).await {
                Ok(result) => {
                    attempts.push(TierAttempt {
                        tier: kind,
                        outcome: AttemptOutcome::Succeeded,
                    });
                    return ChainOutcome {
                        result,
                        tier: kind,
                        attempts,
                        fallbacks,
                    };
                }
                Err(err) => {
                    let reason = if err.is_timeout() {
                        FallbackReason::TimedOut
                    } else {
                        FallbackReason::Failed
                    };
                    warn!(tier = %kind, to = %next, error = %err, "tier failed, falling back");
                    fallbacks.push(self.fall_back(session_id, kind, next, reason, Some(err.to_string())));
                    attempts.push(TierAttempt {
                        tier: kind,
                        outcome: AttemptOutcome::Failed(err),
                    });
                }
            }
        }

        warn!("every tier failed, using built-in rules");
        ChainOutcome {
            result: self.terminal.extract_now(request),
            tier: TierKind::Rules,
            attempts,
            fallbacks,
        }
    }

    /// The request with snippets attached, or `None` when no index is
    /// configured, it is not ready, or it found nothing.
    async fn with_retrieved_context(&self, request: &ExtractionRequest) -> Option<ExtractionRequest> {
        let source = self.context.as_ref()?;
        if !source.index.is_ready() || !request.context.is_empty() {
            return None;
        }
        match source.index.search(&request.utterance, source.top_k).await {
            Ok(mut snippets) => {
                snippets.retain(|s| s.similarity >= source.min_similarity);
                debug!(snippets = snippets.len(), "attached retrieved context");
                (!snippets.is_empty()).then(|| request.clone().with_context(snippets))
            }
            Err(err) => {
                warn!(error = %err, "context retrieval failed, continuing without context");
                None
            }
        }
    }

    async fn run(
        &self,
        tier: &dyn ExtractionTier,
        request: &ExtractionRequest,
    ) -> Result<ExtractionResult, ExtractionError> {
        match self.tier_timeout {
            Some(limit) => tokio::time::timeout(limit, tier.extract(request))
                .await
                .map_err(|_| ExtractionError::TimedOut {
                    after_ms: limit.as_millis() as u64,
                })?,
            None => tier.extract(request).await,
        }
    }

    fn fall_back(
        &self,
        session_id: SessionId,
        from: TierKind,
        to: TierKind,
        reason: FallbackReason,
        detail: Option<String>,
    ) -> TierFallback {
        let event = TierFallback::new(session_id, from, to, reason, detail);
        self.event_callback.on_fallback(event.clone());
        event
    }
}

fn priority(kind: TierKind) -> usize {
    TierKind::PRIORITY
        .iter()
        .position(|k| *k == kind)
        .unwrap_or(TierKind::PRIORITY.len())
}
