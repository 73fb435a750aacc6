//! Inputs and outputs of one extraction call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::domain::conversation::AnswerMap;
use crate::domain::template::{ConversationStep, Field, Template, TemplateError};

/// Which strategy produced (or failed to produce) a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    Model,
    Retrieval,
    Rules,
}

impl TierKind {
    /// Fixed selection priority, best first.
    pub const PRIORITY: [TierKind; 3] = [TierKind::Model, TierKind::Retrieval, TierKind::Rules];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Retrieval => "retrieval",
            Self::Rules => "rules",
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A piece of retrieved reference content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedSnippet {
    pub text: String,
    pub source: String,
    /// In `[0, 1]`.
    pub similarity: f32,
}

impl RetrievedSnippet {
    pub fn new(text: impl Into<String>, source: impl Into<String>, similarity: f32) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            similarity: similarity.clamp(0.0, 1.0),
        }
    }
}

/// Read-only snapshot handed to a tier.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub template: Arc<Template>,
    step_index: usize,
    pub answers: AnswerMap,
    pub utterance: String,
    pub context: Vec<RetrievedSnippet>,
}

impl ExtractionRequest {
    pub fn new(
        template: Arc<Template>,
        step_id: &str,
        answers: AnswerMap,
        utterance: impl Into<String>,
    ) -> Result<Self, TemplateError> {
        let step_index = template.step_index(step_id)?;
        Ok(Self {
            template,
            step_index,
            answers,
            utterance: utterance.into(),
            context: Vec::new(),
        })
    }

    pub fn with_context(mut self, context: Vec<RetrievedSnippet>) -> Self {
        self.context = context;
        self
    }

    pub fn step(&self) -> &ConversationStep {
        // Index resolved against this template in `new`.
        &self.template.steps()[self.step_index]
    }

    /// Expected fields of the current step that are still unanswered.
    pub fn missing_fields(&self) -> impl Iterator<Item = &Field> {
        self.step()
            .missing_fields(&self.answers)
            .filter_map(|id| self.template.field(id))
    }

    /// The field the user was most recently asked about.
    pub fn prompted_field(&self) -> Option<&Field> {
        self.missing_fields().next()
    }
}

/// One proposed field value, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedUpdate {
    pub field_id: String,
    pub raw_value: String,
}

impl ProposedUpdate {
    pub fn new(field_id: impl Into<String>, raw_value: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            raw_value: raw_value.into(),
        }
    }
}

/// What a tier proposes for one utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub updates: Vec<ProposedUpdate>,
    #[serde(default)]
    pub notes: Vec<String>,
    /// Advisory only.
    pub next_step_id: Option<String>,
}

impl ExtractionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_update(mut self, field_id: impl Into<String>, raw_value: impl Into<String>) -> Self {
        self.updates.push(ProposedUpdate::new(field_id, raw_value));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_next_step(mut self, step_id: impl Into<String>) -> Self {
        self.next_step_id = Some(step_id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.notes.is_empty()
    }
}
