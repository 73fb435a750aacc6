//! Content Index Port - Similarity search over reference material.
//!
//! Backs the retrieval tier. Implementations hold pre-embedded snippets
//! (form instructions, agency FAQs) and return the closest matches for an
//! utterance. The embedding model is the implementation's business.

use async_trait::async_trait;

use crate::domain::extraction::RetrievedSnippet;

/// Port for retrieving context snippets.
#[async_trait]
pub trait ContentIndex: Send + Sync {
    /// Returns true once the index can answer queries.
    fn is_ready(&self) -> bool;

    /// Up to `limit` snippets, most similar first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedSnippet>, IndexError>;
}

/// Content index errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndexError {
    #[error("index not ready")]
    NotReady,

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("search failed: {0}")]
    Search(String),
}
