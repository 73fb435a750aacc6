//! Prompt construction for the model tier.

use super::request::ExtractionRequest;

/// Policy prompt used when a template does not supply its own.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are Formly, an offline-first form-filling assistant running on-device. Follow these rules:
- Only use the provided schema, user answers, and retrieved context to propose updates.
- When you need to write output, respond as compact JSON with the shape:
  { \"updates\": [{\"fieldId\": string, \"value\": any}], \"nextStepId\": string, \"notes\": string[] }
- Validate all values against field types and constraints; if invalid, request a corrected value.
- Never include personal data not explicitly provided by the user.
- Operate entirely on-device. If a capability is unavailable, fall back to rules + RAG and ask concise clarifying questions.";

/// System and user prompt for one model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

impl PromptPair {
    pub fn for_request(request: &ExtractionRequest) -> Self {
        Self {
            system: request
                .template
                .system_prompt()
                .unwrap_or(DEFAULT_SYSTEM_PROMPT)
                .to_string(),
            user: user_prompt(request),
        }
    }
}

/// Builds the user prompt: template, step, missing fields with hints, known
/// answers, retrieved context and the utterance.
pub fn user_prompt(request: &ExtractionRequest) -> String {
    let step = request.step();

    let missing = request
        .missing_fields()
        .map(|field| {
            let mut entry = format!("{} ({}, {})", field.id, field.label, field.field_type);
            if !field.options.is_empty() {
                entry.push_str(&format!(" options: {}", field.options.join(" | ")));
            }
            if let Some(hint) = &field.ai_prompt {
                entry.push_str(&format!(" hint: {}", hint));
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("; ");

    let known = request
        .answers
        .iter()
        .map(|(id, value)| format!("{}: {}", id, value.canonical()))
        .collect::<Vec<_>>()
        .join(", ");

    let context = request
        .context
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "Template: {}\nStep: {}\nMissing fields: {}\nKnown answers: {}\nRelevant context: {}\nUser said: {}",
        request.template.name(),
        step.title,
        missing,
        known,
        context,
        request.utterance.trim(),
    )
}
