//! Model response sanitization and parsing.
//!
//! Model output is untrusted text. It is cleaned, the first JSON object is
//! located (bare, inside a code fence, or embedded in prose) and read into an
//! [`ExtractionResult`].

use serde_json::Value;
use thiserror::Error;

use super::request::{ExtractionResult, ProposedUpdate};

/// Maximum accepted response length (100KB).
pub const MAX_RESPONSE_LENGTH: usize = 100_000;

/// Maximum length of a single proposed value.
pub const MAX_VALUE_LENGTH: usize = 2_000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SanitizationError {
    #[error("Response too long: {actual} bytes exceeds maximum of {max} bytes")]
    TooLong { max: usize, actual: usize },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("Sanitization failed: {0}")]
    Sanitization(#[from] SanitizationError),

    #[error("No JSON object in response")]
    NoJson,

    #[error("JSON parse error: {0}")]
    Json(String),

    #[error("Unexpected response shape: {0}")]
    Shape(String),
}

/// Strips control characters and prompt-injection markers.
#[derive(Debug, Clone, Default)]
pub struct ResponseSanitizer {
    additional_patterns: Vec<String>,
}

impl ResponseSanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_additional_patterns(mut self, patterns: Vec<String>) -> Self {
        self.additional_patterns = patterns;
        self
    }

    pub fn sanitize(&self, response: &str) -> Result<String, SanitizationError> {
        if response.len() > MAX_RESPONSE_LENGTH {
            return Err(SanitizationError::TooLong {
                max: MAX_RESPONSE_LENGTH,
                actual: response.len(),
            });
        }

        let cleaned: String = response
            .chars()
            .filter(|c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
            .collect();

        Ok(self.strip_injection_markers(&cleaned))
    }

    fn strip_injection_markers(&self, s: &str) -> String {
        const MARKERS: [&str; 11] = [
            "```system",
            "```assistant",
            "[INST]",
            "[/INST]",
            "<|system|>",
            "<|assistant|>",
            "<|user|>",
            "<|im_start|>",
            "<|im_end|>",
            "<<SYS>>",
            "<</SYS>>",
        ];

        let mut result = s.to_string();
        for marker in MARKERS {
            result = result.replace(marker, "");
        }
        for pattern in &self.additional_patterns {
            result = result.replace(pattern.as_str(), "");
        }
        result
    }
}

/// Reads model output into an [`ExtractionResult`].
#[derive(Debug, Clone, Default)]
pub struct ResponseParser {
    sanitizer: ResponseSanitizer,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sanitizer(sanitizer: ResponseSanitizer) -> Self {
        Self { sanitizer }
    }

    /// Accepts `updates` either as `[{"fieldId", "value"}]` or as a
    /// `{fieldId: value}` object. Null values are dropped.
    pub fn parse(&self, response: &str) -> Result<ExtractionResult, ResponseError> {
        let sanitized = self.sanitizer.sanitize(response)?;
        let json = locate_json(&sanitized).ok_or(ResponseError::NoJson)?;
        let value: Value =
            serde_json::from_str(&json).map_err(|e| ResponseError::Json(e.to_string()))?;
        let Value::Object(root) = value else {
            return Err(ResponseError::Shape("top level is not an object".to_string()));
        };

        let updates = match root.get("updates") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(read_update)
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .flatten()
                .collect(),
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(field_id, v)| scalar_text(v).map(|raw| ProposedUpdate::new(field_id, raw)))
                .collect(),
            Some(_) => return Err(ResponseError::Shape("updates must be a list".to_string())),
        };

        let notes = match root.get("notes") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(s)) => vec![clean_text(s)],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(clean_text)
                .filter(|s| !s.is_empty())
                .collect(),
            Some(_) => return Err(ResponseError::Shape("notes must be a list".to_string())),
        };

        let next_step_id = root
            .get("nextStepId")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(ExtractionResult {
            updates,
            notes,
            next_step_id,
        })
    }
}

fn read_update(item: &Value) -> Result<Option<ProposedUpdate>, ResponseError> {
    let field_id = item
        .get("fieldId")
        .or_else(|| item.get("field_id"))
        .and_then(Value::as_str)
        .ok_or_else(|| ResponseError::Shape("update without fieldId".to_string()))?;
    Ok(item
        .get("value")
        .and_then(scalar_text)
        .map(|raw| ProposedUpdate::new(field_id, raw)))
}

/// String form of a scalar JSON value.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(clean_text(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn clean_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    let trimmed = out.trim();
    match trimmed.char_indices().nth(MAX_VALUE_LENGTH) {
        Some((cut, _)) => trimmed[..cut].to_string(),
        None => trimmed.to_string(),
    }
}

/// Finds the JSON object in a response: fenced block first, then the first
/// balanced `{...}`.
fn locate_json(response: &str) -> Option<String> {
    let trimmed = response.trim();

    for fence in ["```json", "```JSON", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let body_start = start + fence.len();
            if let Some(len) = trimmed[body_start..].find("```") {
                let body = trimmed[body_start..body_start + len].trim();
                if body.starts_with('{') {
                    return Some(body.to_string());
                }
            }
        }
    }

    let start = trimmed.find('{')?;
    balanced_object(trimmed, start)
}

fn balanced_object(s: &str, start: usize) -> Option<String> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (offset, c) in s[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(s[start..start + offset + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
