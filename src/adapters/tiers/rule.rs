//! Rule tier - deterministic keyword and pattern heuristics.

use async_trait::async_trait;

use crate::domain::extraction::{ExtractionRequest, ExtractionResult, RuleExtractor, TierKind};
use crate::ports::{ExtractionError, ExtractionTier};

/// Always available; never fails, may propose nothing.
#[derive(Debug, Clone, Default)]
pub struct RuleTier {
    rules: RuleExtractor,
}

impl RuleTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous form used as the chain's last resort.
    pub fn extract_now(&self, request: &ExtractionRequest) -> ExtractionResult {
        self.rules.extract(request)
    }
}

#[async_trait]
impl ExtractionTier for RuleTier {
    fn kind(&self) -> TierKind {
        TierKind::Rules
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult, ExtractionError> {
        Ok(self.extract_now(request))
    }
}
