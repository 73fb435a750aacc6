//! Retrieval tier - rule heuristics with retrieved reference context.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::domain::extraction::{ExtractionRequest, ExtractionResult, RuleExtractor, TierKind};
use crate::ports::{ContentIndex, ExtractionError, ExtractionTier};

/// Default number of snippets fetched per utterance.
pub const DEFAULT_TOP_K: usize = 3;

/// Fetches the closest snippets for the utterance, attaches them to the
/// request, then runs the rule heuristics over the enriched request. A
/// request that already carries context is used as is.
pub struct RetrievalTier {
    index: Arc<dyn ContentIndex>,
    rules: RuleExtractor,
    top_k: usize,
    min_similarity: f32,
}

impl RetrievalTier {
    pub fn new(index: Arc<dyn ContentIndex>) -> Self {
        Self {
            index,
            rules: RuleExtractor::new(),
            top_k: DEFAULT_TOP_K,
            min_similarity: 0.0,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Snippets scoring below this are dropped.
    pub fn with_min_similarity(mut self, min: f32) -> Self {
        self.min_similarity = min.clamp(0.0, 1.0);
        self
    }
}

#[async_trait]
impl ExtractionTier for RetrievalTier {
    fn kind(&self) -> TierKind {
        TierKind::Retrieval
    }

    fn is_available(&self) -> bool {
        self.index.is_ready()
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult, ExtractionError> {
        if !self.is_available() {
            return Err(ExtractionError::Unavailable(TierKind::Retrieval));
        }

        if !request.context.is_empty() {
            return Ok(self.rules.extract(request));
        }

        let mut snippets = self.index.search(&request.utterance, self.top_k).await?;
        snippets.retain(|s| s.similarity >= self.min_similarity);
        debug!(snippets = snippets.len(), top_k = self.top_k, "retrieval tier attached context");

        let enriched = request.clone().with_context(snippets);
        Ok(self.rules.extract(&enriched))
    }
}
