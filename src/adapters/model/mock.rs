//! Mock Language Model for testing.
//!
//! Provides a configurable implementation of the LanguageModel port so
//! tests and demos run without an inference runtime.
//!
//! # Features
//!
//! - Pre-configured responses (consumed in order)
//! - Simulated delays for busy and timeout testing
//! - Error injection for fallback testing
//! - Load state toggling
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let model = MockLanguageModel::new()
//!     .with_response(r#"{"updates": [{"fieldId": "dob", "value": "01/15/1990"}]}"#)
//!     .with_delay(Duration::from_millis(100));
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{GenerationRequest, GenerationResponse, LanguageModel, ModelError, ModelInfo};

/// Mock language model for testing.
#[derive(Debug, Clone)]
pub struct MockLanguageModel {
    /// Pre-configured responses (consumed in order).
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Reported by `is_loaded`.
    loaded: Arc<AtomicBool>,
    info: ModelInfo,
    /// Simulated latency per request.
    delay: Duration,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<GenerationRequest>>>,
}

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Success(String),
    Error(ModelError),
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLanguageModel {
    /// Creates a loaded mock with no queued responses.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            loaded: Arc::new(AtomicBool::new(true)),
            info: ModelInfo::new("mock", "mock-q4", 4096),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates a mock that reports no resident weights.
    pub fn unloaded() -> Self {
        let model = Self::new();
        model.set_loaded(false);
        model
    }

    /// Adds a successful response to the queue.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        lock(&self.responses).push_back(MockResponse::Success(content.into()));
        self
    }

    /// Adds an error response to the queue.
    pub fn with_error(self, error: ModelError) -> Self {
        lock(&self.responses).push_back(MockResponse::Error(error));
        self
    }

    /// Sets simulated latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_model_info(mut self, info: ModelInfo) -> Self {
        self.info = info;
        self
    }

    /// Loads or unloads the model; shared by every clone.
    pub fn set_loaded(&self, loaded: bool) {
        self.loaded.store(loaded, Ordering::SeqCst);
    }

    /// Returns the number of generate calls made.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Returns all recorded requests.
    pub fn get_calls(&self) -> Vec<GenerationRequest> {
        lock(&self.calls).clone()
    }

    /// Gets the next response or an empty proposal set.
    fn next_response(&self) -> MockResponse {
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| MockResponse::Success(r#"{"updates": []}"#.to_string()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ModelError> {
        lock(&self.calls).push(request);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match self.next_response() {
            MockResponse::Success(content) => Ok(GenerationResponse::new(content)),
            MockResponse::Error(err) => Err(err),
        }
    }

    fn model_info(&self) -> ModelInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest::new("system", "User said: hello")
    }

    #[tokio::test]
    async fn returns_configured_responses_in_order() {
        let model = MockLanguageModel::new()
            .with_response("first")
            .with_response("second");

        assert_eq!(model.generate(request()).await.unwrap().content, "first");
        assert_eq!(model.generate(request()).await.unwrap().content, "second");
    }

    #[tokio::test]
    async fn returns_empty_proposals_when_queue_exhausted() {
        let model = MockLanguageModel::new();
        let response = model.generate(request()).await.unwrap();
        assert_eq!(response.content, r#"{"updates": []}"#);
    }

    #[tokio::test]
    async fn returns_configured_error() {
        let model = MockLanguageModel::new().with_error(ModelError::inference("oom"));
        assert_eq!(
            model.generate(request()).await.unwrap_err(),
            ModelError::inference("oom")
        );
    }

    #[tokio::test]
    async fn tracks_calls() {
        let model = MockLanguageModel::new();
        model.generate(request()).await.unwrap();
        model.generate(request()).await.unwrap();

        assert_eq!(model.call_count(), 2);
        assert_eq!(model.get_calls()[0].user_prompt, "User said: hello");
    }

    #[tokio::test]
    async fn respects_delay() {
        let model = MockLanguageModel::new().with_delay(Duration::from_millis(50));

        let start = std::time::Instant::now();
        model.generate(request()).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn load_state_is_shared_between_clones() {
        let model = MockLanguageModel::new();
        let clone = model.clone();
        clone.set_loaded(false);

        assert!(!model.is_loaded());
        assert!(!MockLanguageModel::unloaded().is_loaded());
    }
}
