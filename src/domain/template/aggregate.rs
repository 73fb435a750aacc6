//! The loaded, immutable form template.

use super::errors::TemplateError;
use super::field::{Field, Section};
use super::review::{Review, TemplateMetadata};
use super::step::ConversationStep;

/// A parsed form template. Read-only once built; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    metadata: TemplateMetadata,
    sections: Vec<Section>,
    steps: Vec<ConversationStep>,
    review: Review,
    system_prompt: Option<String>,
}

impl Template {
    /// Assembles a template from already-checked parts.
    pub(super) fn from_parts(
        metadata: TemplateMetadata,
        sections: Vec<Section>,
        steps: Vec<ConversationStep>,
        review: Review,
        system_prompt: Option<String>,
    ) -> Self {
        Self {
            metadata,
            sections,
            steps,
            review,
            system_prompt,
        }
    }

    /// Parses a JSON or YAML template document.
    pub fn parse(bytes: &[u8]) -> Result<Self, TemplateError> {
        super::parser::parse(bytes).map_err(TemplateError::from)
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    pub fn metadata(&self) -> &TemplateMetadata {
        &self.metadata
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn review(&self) -> &Review {
        &self.review
    }

    /// Template-specific system prompt for the model tier, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// All fields in document order. Restartable: clone the iterator or call
    /// again.
    pub fn fields(&self) -> impl Iterator<Item = &Field> + Clone + '_ {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields().find(|f| f.id == id)
    }

    /// Like [`Template::field`] but as an error.
    pub fn require_field(&self, id: &str) -> Result<&Field, TemplateError> {
        self.field(id)
            .ok_or_else(|| TemplateError::FieldNotFound(id.to_string()))
    }

    pub fn steps(&self) -> &[ConversationStep] {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Result<&ConversationStep, TemplateError> {
        self.steps
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| TemplateError::StepNotFound(id.to_string()))
    }

    pub fn step_index(&self, id: &str) -> Result<usize, TemplateError> {
        self.steps
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| TemplateError::StepNotFound(id.to_string()))
    }

    pub fn step_at(&self, index: usize) -> Option<&ConversationStep> {
        self.steps.get(index)
    }
}
