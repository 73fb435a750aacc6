//! Adapters - Implementations of port interfaces.
//!
//! - `tiers` - Extraction tiers and the fallback chain
//! - `model` - Language model implementations (mock)
//! - `index` - Content index implementations (in-memory)
//! - `events` - Event bus implementations (in-memory)
//! - `storage` - Template store implementations (filesystem)

pub mod events;
pub mod index;
pub mod model;
pub mod storage;
pub mod tiers;

pub use events::InMemoryEventBus;
pub use index::InMemoryContentIndex;
pub use model::MockLanguageModel;
pub use storage::FileTemplateStore;
pub use tiers::{ChainOutcome, ModelTier, RetrievalTier, RuleTier, TierChain};
