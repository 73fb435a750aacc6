//! Template model.
//!
//! Parses a declarative form definition (field schema, conversation steps,
//! step rules, conditional logic, review block) into an immutable
//! [`Template`]. Every cross reference is resolved at parse time.

mod aggregate;
mod condition;
mod document;
mod errors;
mod events;
mod field;
mod parser;
mod review;
mod step;

pub use aggregate::Template;
pub use condition::{CompareOp, Condition, Literal};
pub use errors::{ParseError, ParseReason, TemplateError};
pub use events::TemplateLoaded;
pub use field::{CompiledPattern, Field, FieldType, Section, ValidationRuleSet};
pub use review::{AdditionalFee, Checklist, FeeDetail, FeeInfo, Review, TemplateMetadata};
pub use step::{
    ConditionalAction, ConditionalRule, ConversationStep, StepRule, StepRuleKind,
};
