//! Template errors.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Why a template document was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseReason {
    #[error("document is not valid JSON or YAML: {0}")]
    Syntax(String),

    #[error("missing required key '{0}'")]
    MissingKey(String),

    #[error("duplicate field id '{0}'")]
    DuplicateFieldId(String),

    #[error("duplicate step id '{0}'")]
    DuplicateStepId(String),

    #[error("unknown field type '{0}'")]
    UnknownFieldType(String),

    #[error("choice field '{0}' declares no options")]
    ChoiceWithoutOptions(String),

    #[error("reference to undeclared field '{0}'")]
    UndeclaredField(String),

    #[error("reference to unknown step '{0}'")]
    UnknownStep(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("date constraint '{constraint}' on non-date field '{field}'")]
    DateConstraintOnNonDate { field: String, constraint: String },

    #[error("malformed version '{0}'")]
    MalformedVersion(String),

    #[error("malformed condition: {0}")]
    MalformedCondition(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("unknown step rule '{0}'")]
    UnknownRule(String),

    #[error("step rule '{0}' needs a value")]
    RuleMissingValue(String),

    #[error("conversation flow declares no steps")]
    NoSteps,
}

/// A structural error with the document path it was found at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} (at {path})")]
pub struct ParseError {
    pub reason: ParseReason,
    /// Dotted path such as `schema.sections[0].fields[2].type`.
    pub path: String,
}

impl ParseError {
    pub fn new(reason: ParseReason, path: impl Into<String>) -> Self {
        Self {
            reason,
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("step not found: {0}")]
    StepNotFound(String),

    #[error("field not found: {0}")]
    FieldNotFound(String),
}

impl From<TemplateError> for DomainError {
    fn from(err: TemplateError) -> Self {
        let code = match &err {
            TemplateError::Parse(_) => ErrorCode::TemplateMalformed,
            TemplateError::StepNotFound(_) => ErrorCode::StepNotFound,
            TemplateError::FieldNotFound(_) => ErrorCode::FieldNotFound,
        };
        let domain = DomainError::new(code, err.to_string());
        match err {
            TemplateError::Parse(p) => domain.with_detail("path", p.path),
            _ => domain,
        }
    }
}
