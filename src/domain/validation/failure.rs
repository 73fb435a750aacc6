//! Structured validation failures.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::template::FieldType;

/// The constraint that rejected a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "limit", rename_all = "camelCase")]
pub enum Constraint {
    Pattern(String),
    MinLength(usize),
    MaxLength(usize),
    MinAge(u32),
    MaxAge(u32),
    MaxDaysAgo(i64),
    MinDaysFromNow(i64),
}

impl Constraint {
    /// Document key of the constraint, as written in templates.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Pattern(_) => "pattern",
            Self::MinLength(_) => "minLength",
            Self::MaxLength(_) => "maxLength",
            Self::MinAge(_) => "minAge",
            Self::MaxAge(_) => "maxAge",
            Self::MaxDaysAgo(_) => "maxDaysAgo",
            Self::MinDaysFromNow(_) => "minDaysFromNow",
        }
    }

    /// Message used when the template does not supply one.
    pub fn default_message(&self, label: &str) -> String {
        match self {
            Self::Pattern(_) => format!("{} is not in the expected format", label),
            Self::MinLength(n) => format!("{} must be at least {} characters", label, n),
            Self::MaxLength(n) => format!("{} must be at most {} characters", label, n),
            Self::MinAge(n) => format!("You must be at least {} years old", n),
            Self::MaxAge(n) => format!("You must be at most {} years old", n),
            Self::MaxDaysAgo(n) => format!("{} must be within the last {} days", label, n),
            Self::MinDaysFromNow(n) => {
                format!("{} must be at least {} days from today", label, n)
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(p) => write!(f, "pattern {}", p),
            Self::MinLength(n) => write!(f, "minLength {}", n),
            Self::MaxLength(n) => write!(f, "maxLength {}", n),
            Self::MinAge(n) => write!(f, "minAge {}", n),
            Self::MaxAge(n) => write!(f, "maxAge {}", n),
            Self::MaxDaysAgo(n) => write!(f, "maxDaysAgo {}", n),
            Self::MinDaysFromNow(n) => write!(f, "minDaysFromNow {}", n),
        }
    }
}

/// Why a raw value was not accepted for a field.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "failure", rename_all = "camelCase")]
pub enum ValidationFailure {
    #[error("{field_id} is required")]
    MissingRequired { field_id: String },

    #[error("{field_id} is not a valid {expected}: {reason}")]
    TypeMismatch {
        field_id: String,
        expected: FieldType,
        reason: String,
    },

    #[error("{field_id} violates {constraint}: {message}")]
    ConstraintViolated {
        field_id: String,
        constraint: Constraint,
        message: String,
    },
}

impl ValidationFailure {
    pub fn field_id(&self) -> &str {
        match self {
            Self::MissingRequired { field_id }
            | Self::TypeMismatch { field_id, .. }
            | Self::ConstraintViolated { field_id, .. } => field_id,
        }
    }

    /// The violated constraint, if the failure came from the rule set.
    pub fn constraint(&self) -> Option<&Constraint> {
        match self {
            Self::ConstraintViolated { constraint, .. } => Some(constraint),
            _ => None,
        }
    }

    /// Clarification text addressed to the user.
    pub fn clarification(&self, label: &str) -> String {
        match self {
            Self::MissingRequired { .. } => format!("{} is required.", label),
            Self::TypeMismatch { reason, .. } => {
                format!("That doesn't look like a valid {} ({}).", label, reason)
            }
            Self::ConstraintViolated { message, .. } => message.clone(),
        }
    }
}
