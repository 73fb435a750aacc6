//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("retrieval_top_k must be between 1 and {max}")]
    InvalidTopK { max: usize },

    #[error("min_similarity must be within 0.0..=1.0")]
    InvalidSimilarity,

    #[error("model_temperature must be within 0.0..=2.0")]
    InvalidTemperature,

    #[error("model_max_tokens must be positive")]
    InvalidMaxTokens,

    #[error("tier_timeout_ms must be positive when set")]
    InvalidTimeout,

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),
}
