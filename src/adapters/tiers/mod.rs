//! Extraction tier adapters and the fallback chain.
//!
//! - `ModelTier` - language model with structured response parsing
//! - `RetrievalTier` - content index snippets plus rule heuristics
//! - `RuleTier` - rule heuristics alone, always available
//! - `TierChain` - priority ordering, fallback and the attempt log

mod chain;
mod model;
mod retrieval;
mod rule;

pub use chain::{
    AttemptOutcome, ChainOutcome, NoOpEventCallback, TierAttempt, TierChain, TierEventCallback,
};
pub use model::ModelTier;
pub use retrieval::{RetrievalTier, DEFAULT_TOP_K};
pub use rule::RuleTier;
