//! In-memory content index.
//!
//! Scores snippets by cosine similarity over lower-cased term counts. Good
//! enough for tests and small reference sets; hosts with an embedding model
//! plug their own `ContentIndex` in instead.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::debug;

use crate::domain::extraction::RetrievedSnippet;
use crate::ports::{ContentIndex, IndexError};

#[derive(Debug, Clone)]
struct Entry {
    text: String,
    source: String,
    terms: HashMap<String, f32>,
}

/// Term-vector index held in memory.
#[derive(Debug)]
pub struct InMemoryContentIndex {
    entries: RwLock<Vec<Entry>>,
    ready: AtomicBool,
}

impl Default for InMemoryContentIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryContentIndex {
    /// Creates an empty, ready index.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            ready: AtomicBool::new(true),
        }
    }

    /// Adds a snippet.
    pub fn with_snippet(self, text: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(text, source);
        self
    }

    pub fn insert(&self, text: impl Into<String>, source: impl Into<String>) {
        let text = text.into();
        let entry = Entry {
            terms: term_vector(&text),
            text,
            source: source.into(),
        };
        match self.entries.write() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentIndex for InMemoryContentIndex {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedSnippet>, IndexError> {
        if !self.is_ready() {
            return Err(IndexError::NotReady);
        }

        let query_terms = term_vector(query);
        let entries = self
            .entries
            .read()
            .map_err(|_| IndexError::Search("index lock poisoned".to_string()))?;

        let mut scored: Vec<(f32, &Entry)> = entries
            .iter()
            .map(|e| (cosine_similarity(&query_terms, &e.terms), e))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(limit);

        debug!(hits = scored.len(), limit, "content index searched");

        Ok(scored
            .into_iter()
            .map(|(score, e)| RetrievedSnippet::new(e.text.clone(), e.source.clone(), score))
            .collect())
    }
}

fn term_vector(text: &str) -> HashMap<String, f32> {
    let mut terms = HashMap::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1)
    {
        *terms.entry(word.to_lowercase()).or_insert(0.0) += 1.0;
    }
    terms
}

/// Cosine similarity between two sparse vectors, 0.0 when either is empty.
fn cosine_similarity(a: &HashMap<String, f32>, b: &HashMap<String, f32>) -> f32 {
    let dot: f32 = a
        .iter()
        .filter_map(|(term, x)| b.get(term).map(|y| x * y))
        .sum();
    let norm_a = a.values().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.values().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
