//! Wiring the tier chain from configuration.

use std::sync::Arc;

use crate::adapters::tiers::{ModelTier, RetrievalTier, TierChain, TierEventCallback};
use crate::config::ExtractionConfig;
use crate::ports::{ContentIndex, LanguageModel};

/// Optional collaborators for the upper tiers.
#[derive(Default, Clone)]
pub struct TierSources {
    pub model: Option<Arc<dyn LanguageModel>>,
    pub index: Option<Arc<dyn ContentIndex>>,
    pub callback: Option<Arc<dyn TierEventCallback>>,
}

/// Builds a chain with every tier the host supplied, configured from
/// `config`. The rule tier is always present. A supplied index also feeds
/// per-turn context to every tier.
pub fn build_tier_chain(config: &ExtractionConfig, sources: TierSources) -> TierChain {
    let mut chain = TierChain::new();

    if let Some(model) = sources.model {
        chain = chain.with_tier(Arc::new(
            ModelTier::new(model)
                .with_max_tokens(config.model_max_tokens)
                .with_temperature(config.model_temperature),
        ));
    }
    if let Some(index) = sources.index {
        chain = chain
            .with_tier(Arc::new(
                RetrievalTier::new(Arc::clone(&index))
                    .with_top_k(config.retrieval_top_k)
                    .with_min_similarity(config.min_similarity),
            ))
            .with_context_index(index, config.retrieval_top_k, config.min_similarity);
    }
    if let Some(timeout) = config.tier_timeout() {
        chain = chain.with_tier_timeout(timeout);
    }
    if let Some(callback) = sources.callback {
        chain = chain.with_event_callback(callback);
    }
    chain
}
