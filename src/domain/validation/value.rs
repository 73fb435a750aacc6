//! Typed field values held in the answer map.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::template::FieldType;

/// A validated, typed field value.
///
/// Every variant has a canonical string form (see [`TypedValue::canonical`])
/// which validates back to the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TypedValue {
    Text(String),
    Date(NaiveDate),
    Number(f64),
    /// The declared option, in the template's spelling.
    Choice(String),
    Boolean(bool),
    Email(String),
    /// Digits only, with a leading `+` when the user gave one.
    Phone(String),
    /// An optional field the user explicitly left blank.
    Empty,
}

impl TypedValue {
    /// Canonical string form.
    pub fn canonical(&self) -> String {
        match self {
            Self::Text(s) | Self::Choice(s) | Self::Email(s) | Self::Phone(s) => s.clone(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Number(n) => n.to_string(),
            Self::Boolean(b) => if *b { "yes" } else { "no" }.to_string(),
            Self::Empty => String::new(),
        }
    }

    /// The field type this value satisfies, `None` for `Empty`.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Self::Text(_) => Some(FieldType::Text),
            Self::Date(_) => Some(FieldType::Date),
            Self::Number(_) => Some(FieldType::Number),
            Self::Choice(_) => Some(FieldType::Choice),
            Self::Boolean(_) => Some(FieldType::Boolean),
            Self::Email(_) => Some(FieldType::Email),
            Self::Phone(_) => Some(FieldType::Phone),
            Self::Empty => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Truthiness used by presence checks in conditional logic.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Empty => false,
            Self::Boolean(b) => *b,
            Self::Text(s) => !s.is_empty(),
            _ => true,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}
