//! Model tier - asks the on-device language model for proposals.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::domain::extraction::{
    ExtractionRequest, ExtractionResult, PromptPair, ResponseParser, TierKind,
};
use crate::ports::{ExtractionError, ExtractionTier, GenerationRequest, LanguageModel};

/// Extraction through a `LanguageModel`.
///
/// Available only while the model reports resident weights. Output that
/// does not parse into proposals is a tier failure, so the chain moves on.
pub struct ModelTier {
    model: Arc<dyn LanguageModel>,
    parser: ResponseParser,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl ModelTier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            parser: ResponseParser::new(),
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    fn generation_request(&self, request: &ExtractionRequest) -> GenerationRequest {
        let prompts = PromptPair::for_request(request);
        let mut generation = GenerationRequest::new(prompts.system, prompts.user);
        if let Some(max) = self.max_tokens {
            generation = generation.with_max_tokens(max);
        }
        if let Some(temp) = self.temperature {
            generation = generation.with_temperature(temp);
        }
        generation
    }
}

#[async_trait]
impl ExtractionTier for ModelTier {
    fn kind(&self) -> TierKind {
        TierKind::Model
    }

    fn is_available(&self) -> bool {
        self.model.is_loaded()
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult, ExtractionError> {
        if !self.is_available() {
            return Err(ExtractionError::Unavailable(TierKind::Model));
        }

        let response = self.model.generate(self.generation_request(request)).await?;
        let result = self
            .parser
            .parse(&response.content)
            .map_err(|e| ExtractionError::malformed(e.to_string()))?;

        debug!(
            model = %self.model.model_info().name,
            proposals = result.updates.len(),
            "model tier produced proposals"
        );
        Ok(result)
    }
}
