//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, events)
//! - `template` - Template documents, parsing, steps and conditional logic
//! - `validation` - Typed values and per-field constraint checks
//! - `conversation` - Session aggregate, answers and navigation
//! - `extraction` - Tier request/result types, prompts and rule heuristics

pub mod conversation;
pub mod extraction;
pub mod foundation;
pub mod template;
pub mod validation;
