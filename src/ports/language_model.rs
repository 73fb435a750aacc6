//! Language Model Port - Interface for on-device text generation.
//!
//! This port abstracts the inference runtime behind the model extraction
//! tier. The engine never loads weights itself; a host application hands in
//! an implementation that reports whether a model is resident and turns a
//! prompt pair into text.
//!
//! # Design
//!
//! - One shared handle (`Arc<dyn LanguageModel>`) serves many sessions
//! - Generation is a single non-streaming call
//! - Errors are coarse; the tier chain only needs to know "this failed"
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//!
//! struct Resident;
//!
//! #[async_trait]
//! impl LanguageModel for Resident {
//!     fn is_loaded(&self) -> bool { true }
//!     async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ModelError> {
//!         Ok(GenerationResponse::new(r#"{"updates": []}"#))
//!     }
//!     fn model_info(&self) -> ModelInfo { ModelInfo::new("resident", "q4", 4096) }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for on-device language model inference.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns true when weights are resident and `generate` can run.
    fn is_loaded(&self) -> bool;

    /// Generate a completion for one prompt pair.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ModelError>;

    /// Model name, variant and context size.
    fn model_info(&self) -> ModelInfo;
}

/// Request for one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Policy text guiding the model.
    pub system_prompt: String,
    /// Per-turn prompt.
    pub user_prompt: String,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Temperature (0.0 = deterministic).
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    /// Creates a request with no sampling overrides.
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Sets the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Sets the temperature.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }
}

/// Generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResponse {
    pub content: String,
    /// Tokens produced, when the runtime reports it.
    pub generated_tokens: Option<u32>,
}

impl GenerationResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            generated_tokens: None,
        }
    }
}

/// Model identity and capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name (e.g., "phi-3-mini").
    pub name: String,
    /// Quantization or build variant.
    pub variant: String,
    /// Maximum context window size in tokens.
    pub max_context_tokens: u32,
}

impl ModelInfo {
    pub fn new(name: impl Into<String>, variant: impl Into<String>, max_context_tokens: u32) -> Self {
        Self {
            name: name.into(),
            variant: variant.into(),
            max_context_tokens,
        }
    }
}

/// Language model errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// No weights are resident.
    #[error("model not loaded")]
    NotLoaded,

    /// Prompt exceeds the context window.
    #[error("context too long: {tokens} tokens exceeds {max} limit")]
    ContextTooLong {
        /// Actual token count.
        tokens: u32,
        /// Maximum allowed.
        max: u32,
    },

    /// The runtime failed during generation.
    #[error("inference failed: {0}")]
    Inference(String),
}

impl ModelError {
    /// Creates a context too long error.
    pub fn context_too_long(tokens: u32, max: u32) -> Self {
        Self::ContextTooLong { tokens, max }
    }

    /// Creates an inference error.
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn LanguageModel) {}

    #[test]
    fn generation_request_builder_works() {
        let request = GenerationRequest::new("Be precise", "User said: hi")
            .with_max_tokens(256)
            .with_temperature(0.1);

        assert_eq!(request.system_prompt, "Be precise");
        assert_eq!(request.user_prompt, "User said: hi");
        assert_eq!(request.max_tokens, Some(256));
        assert_eq!(request.temperature, Some(0.1));
    }

    #[test]
    fn model_error_displays_correctly() {
        assert_eq!(ModelError::NotLoaded.to_string(), "model not loaded");
        assert_eq!(
            ModelError::context_too_long(5000, 4096).to_string(),
            "context too long: 5000 tokens exceeds 4096 limit"
        );
        assert_eq!(
            ModelError::inference("out of memory").to_string(),
            "inference failed: out of memory"
        );
    }
}
