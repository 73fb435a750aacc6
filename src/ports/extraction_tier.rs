//! Extraction Tier Port - One strategy for turning an utterance into
//! proposed field values.
//!
//! Tiers are interchangeable: the model tier, the retrieval tier and the
//! rule tier all implement this trait, and the tier chain tries them in
//! priority order. Proposals are never trusted; the session validates
//! every one before merging.

use async_trait::async_trait;

use super::content_index::IndexError;
use super::language_model::ModelError;
use crate::domain::extraction::{ExtractionRequest, ExtractionResult, TierKind};

/// Port for a single extraction strategy.
#[async_trait]
pub trait ExtractionTier: Send + Sync {
    /// Which tier this is.
    fn kind(&self) -> TierKind;

    /// Returns true if `extract` can be attempted now.
    fn is_available(&self) -> bool;

    /// Propose field values for the request.
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult, ExtractionError>;
}

/// Extraction tier errors. Absorbed by the tier chain, never shown to users.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractionError {
    #[error("{0} tier unavailable")]
    Unavailable(TierKind),

    #[error("malformed model output: {0}")]
    MalformedModelOutput(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Retrieval(#[from] IndexError),

    #[error("timed out after {after_ms}ms")]
    TimedOut { after_ms: u64 },
}

impl ExtractionError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedModelOutput(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}
