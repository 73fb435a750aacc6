//! Per-turn output.

use serde::{Deserialize, Serialize};

use crate::domain::extraction::TierKind;
use crate::domain::foundation::Percentage;
use crate::domain::template::{ConversationStep, Field, FieldType};
use crate::domain::validation::TypedValue;

/// The next question for the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub step_id: String,
    pub step_title: String,
    /// `None` when the step has nothing left to ask but could not advance.
    pub field_id: Option<String>,
    pub text: String,
}

impl Prompt {
    pub fn for_field(step: &ConversationStep, field: &Field) -> Self {
        let text = match field.field_type {
            FieldType::Choice => format!("{}? ({})", field.label, field.options.join(", ")),
            FieldType::Boolean => format!("{}? (yes or no)", field.label),
            FieldType::Date => format!("What is your {}? (MM/DD/YYYY)", field.label.to_lowercase()),
            _ => format!("What is your {}?", field.label.to_lowercase()),
        };
        Self {
            step_id: step.id.clone(),
            step_title: step.title.clone(),
            field_id: Some(field.id.clone()),
            text,
        }
    }

    /// Prompt for a step whose fields are all answered but which is held
    /// back, e.g. by a failed step rule.
    pub fn for_step(step: &ConversationStep) -> Self {
        let text = if step.description.is_empty() {
            step.title.clone()
        } else {
            step.description.clone()
        };
        Self {
            step_id: step.id.clone(),
            step_title: step.title.clone(),
            field_id: None,
            text,
        }
    }
}

/// What the session does after a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NextAction {
    Ask(Prompt),
    Completed,
}

impl NextAction {
    pub fn prompt(&self) -> Option<&Prompt> {
        match self {
            Self::Ask(p) => Some(p),
            Self::Completed => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// A value merged into the answers this turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedUpdate {
    pub field_id: String,
    pub value: TypedValue,
}

/// Result of one `submit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    /// In proposal order; a field proposed twice appears once, at its last
    /// position.
    pub accepted: Vec<AcceptedUpdate>,
    pub notes: Vec<String>,
    pub next: NextAction,
    pub completion: Percentage,
    /// Tier whose proposals were applied.
    pub tier: Option<TierKind>,
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        self.next.is_completed()
    }

    pub fn accepted_value(&self, field_id: &str) -> Option<&TypedValue> {
        self.accepted
            .iter()
            .find(|u| u.field_id == field_id)
            .map(|u| &u.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step() -> ConversationStep {
        ConversationStep {
            id: "contact".into(),
            title: "Contact".into(),
            description: String::new(),
            expected_fields: vec!["phone".into()],
            validation_rules: vec![],
            conditional_logic: vec![],
        }
    }

    #[test]
    fn prompt_text_depends_on_type() {
        let choice = Field::new("class", "License class", FieldType::Choice).with_options(["A", "C"]);
        assert_eq!(Prompt::for_field(&step(), &choice).text, "License class? (A, C)");

        let phone = Field::new("phone", "Phone number", FieldType::Phone);
        let prompt = Prompt::for_field(&step(), &phone);
        assert_eq!(prompt.text, "What is your phone number?");
        assert_eq!(prompt.field_id.as_deref(), Some("phone"));
    }

    #[test]
    fn step_prompt_falls_back_to_title() {
        let prompt = Prompt::for_step(&step());
        assert_eq!(prompt.text, "Contact");
        assert!(prompt.field_id.is_none());
    }

    #[test]
    fn next_action_serializes_tagged() {
        let json = serde_json::to_value(NextAction::Completed).unwrap();
        assert_eq!(json["kind"], "completed");
    }
}
