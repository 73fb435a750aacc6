//! Extraction tier configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Upper bound for snippets fetched per utterance.
pub const MAX_TOP_K: usize = 50;

/// Settings for the model and retrieval tiers and the chain
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractionConfig {
    /// Snippets fetched by the retrieval tier
    #[serde(default = "default_top_k")]
    pub retrieval_top_k: usize,

    /// Snippets below this similarity are dropped
    #[serde(default)]
    pub min_similarity: f32,

    /// Generation cap for the model tier
    #[serde(default = "default_max_tokens")]
    pub model_max_tokens: u32,

    /// Sampling temperature for the model tier
    #[serde(default = "default_temperature")]
    pub model_temperature: f32,

    /// Per-tier timeout; unset means none
    #[serde(default)]
    pub tier_timeout_ms: Option<u64>,
}

impl ExtractionConfig {
    /// Per-tier timeout as Duration
    pub fn tier_timeout(&self) -> Option<Duration> {
        self.tier_timeout_ms.map(Duration::from_millis)
    }

    /// Validate extraction configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.retrieval_top_k == 0 || self.retrieval_top_k > MAX_TOP_K {
            return Err(ValidationError::InvalidTopK { max: MAX_TOP_K });
        }
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(ValidationError::InvalidSimilarity);
        }
        if !(0.0..=2.0).contains(&self.model_temperature) {
            return Err(ValidationError::InvalidTemperature);
        }
        if self.model_max_tokens == 0 {
            return Err(ValidationError::InvalidMaxTokens);
        }
        if self.tier_timeout_ms == Some(0) {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            retrieval_top_k: default_top_k(),
            min_similarity: 0.0,
            model_max_tokens: default_max_tokens(),
            model_temperature: default_temperature(),
            tier_timeout_ms: None,
        }
    }
}

fn default_top_k() -> usize {
    3
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.retrieval_top_k, 3);
        assert_eq!(config.model_max_tokens, 512);
        assert_eq!(config.tier_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_duration() {
        let config = ExtractionConfig {
            tier_timeout_ms: Some(1500),
            ..Default::default()
        };
        assert_eq!(config.tier_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let zero_k = ExtractionConfig {
            retrieval_top_k: 0,
            ..Default::default()
        };
        assert_eq!(zero_k.validate(), Err(ValidationError::InvalidTopK { max: MAX_TOP_K }));

        let similarity = ExtractionConfig {
            min_similarity: 1.5,
            ..Default::default()
        };
        assert_eq!(similarity.validate(), Err(ValidationError::InvalidSimilarity));

        let timeout = ExtractionConfig {
            tier_timeout_ms: Some(0),
            ..Default::default()
        };
        assert_eq!(timeout.validate(), Err(ValidationError::InvalidTimeout));
    }
}
