//! Application layer - services and command handlers.
//!
//! This layer runs domain operations against ports: it owns the async
//! boundary, serializes turns and publishes events.

mod errors;
mod form_conversation;
mod load_template;
mod setup;

pub use errors::EngineError;
pub use form_conversation::FormConversation;
pub use load_template::{LoadTemplateCommand, LoadTemplateHandler, LoadTemplateResult};
pub use setup::{build_tier_chain, TierSources};
