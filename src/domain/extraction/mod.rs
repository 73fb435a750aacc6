//! Answer extraction.
//!
//! Request and result types shared by every extraction tier, the model
//! prompt and response handling, and the deterministic rule heuristics.

mod events;
mod prompt;
mod request;
mod response;
mod rules;

pub use events::{FallbackReason, TierFallback};
pub use prompt::{user_prompt, PromptPair, DEFAULT_SYSTEM_PROMPT};
pub use request::{
    ExtractionRequest, ExtractionResult, ProposedUpdate, RetrievedSnippet, TierKind,
};
pub use response::{
    ResponseError, ResponseParser, ResponseSanitizer, SanitizationError, MAX_RESPONSE_LENGTH,
    MAX_VALUE_LENGTH,
};
pub use rules::RuleExtractor;
