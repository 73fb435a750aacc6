//! Engine configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `FORMLY` prefix and nested values use double underscores as separators.
//! Every section has defaults, so an empty environment is a valid setup.
//!
//! # Example
//!
//! ```no_run
//! use formly_engine::config::EngineConfig;
//!
//! let config = EngineConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Retrieval fetches {} snippets", config.extraction.retrieval_top_k);
//! ```

mod conversation;
mod error;
mod extraction;
mod logging;

pub use conversation::ConversationConfig;
pub use error::{ConfigError, ValidationError};
pub use extraction::{ExtractionConfig, MAX_TOP_K};
pub use logging::{LogFormat, LoggingConfig};

use serde::Deserialize;

/// Root engine configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Tier chain settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Session behaviour
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Tracing subscriber settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `FORMLY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `FORMLY__EXTRACTION__RETRIEVAL_TOP_K=5` -> `extraction.retrieval_top_k = 5`
    /// - `FORMLY__LOGGING__FORMAT=json` -> `logging.format = json`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("FORMLY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first out-of-range value.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.extraction.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
