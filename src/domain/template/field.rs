//! Field schema: sections, fields, field types and per-field constraints.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of field types a template may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Date,
    Number,
    Choice,
    Boolean,
    Email,
    Phone,
}

impl FieldType {
    /// Resolves a document type name, accepting the common aliases form
    /// authors use. Returns `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "text" | "string" | "textarea" | "longtext" => Some(Self::Text),
            "date" => Some(Self::Date),
            "number" | "integer" | "currency" => Some(Self::Number),
            "choice" | "select" | "radio" | "dropdown" => Some(Self::Choice),
            "boolean" | "bool" | "yesno" | "checkbox" => Some(Self::Boolean),
            "email" => Some(Self::Email),
            "phone" | "tel" => Some(Self::Phone),
            _ => None,
        }
    }

    /// Canonical document name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Date => "date",
            Self::Number => "number",
            Self::Choice => "choice",
            Self::Boolean => "boolean",
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A regular expression compiled once at template load.
#[derive(Debug, Clone)]
pub struct CompiledPattern(Regex);

impl CompiledPattern {
    /// Compiles `source`, anchoring nothing: authors write `^...$` themselves.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// Per-field constraints. Every present constraint must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationRuleSet {
    pub pattern: Option<CompiledPattern>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub max_days_ago: Option<i64>,
    pub min_days_from_now: Option<i64>,
    /// Author-supplied message shown for any violated constraint.
    pub message: Option<String>,
}

impl ValidationRuleSet {
    /// True when any constraint is relative to the current date.
    pub fn has_date_constraints(&self) -> bool {
        self.min_age.is_some()
            || self.max_age.is_some()
            || self.max_days_ago.is_some()
            || self.min_days_from_now.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && !self.has_date_constraints()
    }
}

/// A single form field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub id: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    /// Declared options, only populated for `choice` fields.
    pub options: Vec<String>,
    pub validation: Option<ValidationRuleSet>,
    /// Hint for extraction tiers. Never consulted by validation.
    pub ai_prompt: Option<String>,
}

impl Field {
    /// Minimal constructor used by tests and programmatic templates.
    pub fn new(id: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            field_type,
            required: false,
            options: Vec::new(),
            validation: None,
            ai_prompt: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_validation(mut self, rules: ValidationRuleSet) -> Self {
        self.validation = Some(rules);
        self
    }
}

/// An ordered group of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub description: String,
    pub fields: Vec<Field>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_accepts_aliases() {
        assert_eq!(FieldType::from_name("select"), Some(FieldType::Choice));
        assert_eq!(FieldType::from_name("Yes_No"), Some(FieldType::Boolean));
        assert_eq!(FieldType::from_name("tel"), Some(FieldType::Phone));
        assert_eq!(FieldType::from_name("TEXT"), Some(FieldType::Text));
    }

    #[test]
    fn field_type_rejects_unknown_names() {
        assert_eq!(FieldType::from_name("signature"), None);
    }

    #[test]
    fn field_type_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&FieldType::Choice).unwrap(), "\"choice\"");
    }

    #[test]
    fn compiled_patterns_compare_by_source() {
        let a = CompiledPattern::new(r"^\d{5}$").unwrap();
        let b = CompiledPattern::new(r"^\d{5}$").unwrap();
        assert_eq!(a, b);
        assert!(a.is_match("12345"));
        assert!(!a.is_match("1234"));
    }

    #[test]
    fn rule_set_reports_date_constraints() {
        let rules = ValidationRuleSet {
            min_age: Some(18),
            ..Default::default()
        };
        assert!(rules.has_date_constraints());
        assert!(!rules.is_empty());
        assert!(ValidationRuleSet::default().is_empty());
    }
}
