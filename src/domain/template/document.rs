//! Wire shape of template documents.
//!
//! Everything the parser checks by hand is optional here so that a missing
//! key is reported with its document path instead of a bare serde message.

use serde::Deserialize;

use super::errors::{ParseError, ParseReason};
use super::review::Review;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawTemplate {
    pub metadata: Option<RawMetadata>,
    pub schema: Option<RawSchema>,
    pub conversation_flow: Option<RawFlow>,
    #[serde(default)]
    pub review: Review,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawMetadata {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub version: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub estimated_time: u32,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub language_support: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawSchema {
    pub sections: Option<Vec<RawSection>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawSection {
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawField {
    pub id: Option<String>,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
    pub validation: Option<RawValidation>,
    pub ai_prompt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawValidation {
    pub pattern: Option<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub max_days_ago: Option<i64>,
    pub min_days_from_now: Option<i64>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawFlow {
    pub steps: Option<Vec<RawStep>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawStep {
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub expected_fields: Vec<String>,
    #[serde(default)]
    pub validation_rules: Vec<RawStepRule>,
    #[serde(default)]
    pub conditional_logic: Vec<RawConditional>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawStepRule {
    pub field: Option<String>,
    pub rule: Option<String>,
    pub value: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawConditional {
    pub condition: Option<String>,
    pub action: Option<String>,
    /// Branch target when not written inline as `branch:<step>`.
    #[serde(alias = "step", alias = "goto")]
    pub target: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub documents: Vec<String>,
}

/// Decodes JSON (first significant byte `{`) or YAML.
/// Accepts `1.0` as well as `"1.0"`; YAML reads an unquoted version as a
/// number.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Int(u64),
        Float(f64),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|v| match v {
        Scalar::Text(s) => s,
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(f) => f.to_string(),
    }))
}

pub(super) fn decode(bytes: &[u8]) -> Result<RawTemplate, ParseError> {
    let is_json = bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{');

    let result = if is_json {
        serde_json::from_slice(bytes).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_slice(bytes).map_err(|e| e.to_string())
    };

    result.map_err(|reason| ParseError::new(ParseReason::Syntax(reason), "$"))
}
