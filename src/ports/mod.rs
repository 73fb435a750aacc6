//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Extraction Ports
//!
//! - `ExtractionTier` - One strategy turning an utterance into proposals
//! - `LanguageModel` - On-device inference behind the model tier
//! - `ContentIndex` - Similarity search behind the retrieval tier
//!
//! ## Host Ports
//!
//! - `EventPublisher` - Port for publishing domain events
//! - `TemplateStore` - Source of template documents

mod content_index;
mod event_publisher;
mod extraction_tier;
mod language_model;
mod template_store;

pub use content_index::{ContentIndex, IndexError};
pub use event_publisher::EventPublisher;
pub use extraction_tier::{ExtractionError, ExtractionTier};
pub use language_model::{
    GenerationRequest, GenerationResponse, LanguageModel, ModelError, ModelInfo,
};
pub use template_store::{StoreError, TemplateStore};
