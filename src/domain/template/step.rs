//! Conversation steps, their cross-field rules and conditional logic.

use std::fmt;

use super::condition::Condition;
use super::field::CompiledPattern;
use crate::domain::conversation::AnswerMap;
use crate::domain::validation::TypedValue;

/// What a matched conditional rule does.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalAction {
    /// Leave the step without requiring its fields.
    Skip,
    /// Jump to the named step.
    BranchTo(String),
    /// Tell the user to bring documents; then advance normally.
    RequireDocuments(Vec<String>),
    /// Show a note; then advance normally.
    ShowMessage,
}

impl ConditionalAction {
    /// Resolves a document action name. Accepts `skip`, `branch:<step>`,
    /// `branch-to`/`goto` (with a separate target), `require-document(s)` and
    /// `show-message`, ignoring case, `_` and `-`.
    pub fn from_parts(
        action: &str,
        target: Option<&str>,
        documents: &[String],
    ) -> Result<Self, String> {
        let (name, inline_target) = match action.split_once(':') {
            Some((name, rest)) => (name, Some(rest.trim())),
            None => (action, None),
        };
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "skip" | "skipstep" => Ok(Self::Skip),
            "branch" | "branchto" | "goto" | "jump" => inline_target
                .or(target)
                .filter(|t| !t.is_empty())
                .map(|t| Self::BranchTo(t.to_string()))
                .ok_or_else(|| format!("action '{}' needs a target step", action)),
            "requiredocument" | "requiredocuments" => Ok(Self::RequireDocuments(documents.to_vec())),
            "showmessage" | "message" | "info" | "warn" | "warning" => Ok(Self::ShowMessage),
            _ => Err(format!("unknown action '{}'", action)),
        }
    }

    /// True for actions that move the cursor themselves.
    pub fn is_navigational(&self) -> bool {
        matches!(self, Self::Skip | Self::BranchTo(_))
    }
}

/// One entry of a step's conditional logic.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalRule {
    pub condition: Condition,
    /// Condition as written, kept for logs.
    pub source: String,
    pub action: ConditionalAction,
    pub message: Option<String>,
}

impl ConditionalRule {
    pub fn matches(&self, answers: &AnswerMap) -> bool {
        self.condition.evaluate(answers)
    }

    /// Note text shown to the user when the rule fires, if any.
    pub fn note(&self) -> Option<String> {
        match (&self.action, &self.message) {
            (ConditionalAction::RequireDocuments(docs), message) if !docs.is_empty() => {
                let list = docs.join(", ");
                Some(match message {
                    Some(m) => format!("{} Documents needed: {}.", m, list),
                    None => format!("Please have these documents ready: {}.", list),
                })
            }
            (_, Some(m)) => Some(m.clone()),
            _ => None,
        }
    }
}

/// The closed set of cross-field step rules.
#[derive(Debug, Clone, PartialEq)]
pub enum StepRuleKind {
    Required,
    Equals(String),
    NotEquals(String),
    Pattern(CompiledPattern),
    /// The field's date precedes the named field's date.
    Before(String),
    After(String),
    SameAs(String),
}

impl StepRuleKind {
    /// Field the rule compares against, for reference checks at load.
    pub fn other_field(&self) -> Option<&str> {
        match self {
            Self::Before(f) | Self::After(f) | Self::SameAs(f) => Some(f),
            _ => None,
        }
    }
}

impl fmt::Display for StepRuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("required"),
            Self::Equals(v) => write!(f, "equals {}", v),
            Self::NotEquals(v) => write!(f, "notEquals {}", v),
            Self::Pattern(p) => write!(f, "pattern {}", p.as_str()),
            Self::Before(o) => write!(f, "before {}", o),
            Self::After(o) => write!(f, "after {}", o),
            Self::SameAs(o) => write!(f, "sameAs {}", o),
        }
    }
}

/// A rule evaluated when leaving a step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRule {
    pub field: String,
    pub kind: StepRuleKind,
    pub message: Option<String>,
}

impl StepRule {
    /// Checks the rule against the answers.
    ///
    /// Comparisons with an unanswered operand pass; only `required` insists on
    /// an answer.
    pub fn check(&self, answers: &AnswerMap) -> bool {
        let value = answers.get(&self.field).filter(|v| !v.is_empty());

        match &self.kind {
            StepRuleKind::Required => value.is_some(),
            StepRuleKind::Equals(expected) => {
                value.map_or(true, |v| v.canonical().eq_ignore_ascii_case(expected.trim()))
            }
            StepRuleKind::NotEquals(expected) => {
                value.map_or(true, |v| !v.canonical().eq_ignore_ascii_case(expected.trim()))
            }
            StepRuleKind::Pattern(pattern) => {
                value.map_or(true, |v| pattern.is_match(&v.canonical()))
            }
            StepRuleKind::Before(other) | StepRuleKind::After(other) => {
                let lhs = value.and_then(TypedValue::as_date);
                let rhs = answers.get(other).and_then(TypedValue::as_date);
                match (lhs, rhs) {
                    (Some(a), Some(b)) if matches!(self.kind, StepRuleKind::Before(_)) => a < b,
                    (Some(a), Some(b)) => a > b,
                    _ => true,
                }
            }
            StepRuleKind::SameAs(other) => {
                match (value, answers.get(other).filter(|v| !v.is_empty())) {
                    (Some(a), Some(b)) => a.canonical().eq_ignore_ascii_case(&b.canonical()),
                    _ => true,
                }
            }
        }
    }

    /// Message for a failed check.
    pub fn failure_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("{} failed check: {}", self.field, self.kind))
    }
}

/// One step of the conversation flow.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationStep {
    pub id: String,
    pub title: String,
    pub description: String,
    pub expected_fields: Vec<String>,
    pub validation_rules: Vec<StepRule>,
    pub conditional_logic: Vec<ConditionalRule>,
}

impl ConversationStep {
    pub fn expects(&self, field_id: &str) -> bool {
        self.expected_fields.iter().any(|f| f == field_id)
    }

    /// Expected fields not yet in `answers`, in declaration order.
    pub fn missing_fields<'a>(&'a self, answers: &'a AnswerMap) -> impl Iterator<Item = &'a str> {
        self.expected_fields
            .iter()
            .map(String::as_str)
            .filter(move |f| !answers.is_answered(f))
    }

    pub fn is_fully_answered(&self, answers: &AnswerMap) -> bool {
        self.missing_fields(answers).next().is_none()
    }

    /// The first matching conditional rule, when it skips or branches.
    pub fn navigation(&self, answers: &AnswerMap) -> Option<&ConditionalRule> {
        self.conditional_logic
            .iter()
            .find(|r| r.matches(answers))
            .filter(|r| r.action.is_navigational())
    }

    /// First rule that fails, if any.
    pub fn first_failed_rule(&self, answers: &AnswerMap) -> Option<&StepRule> {
        self.validation_rules.iter().find(|r| !r.check(answers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> TypedValue {
        TypedValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    mod actions {
        use super::*;

        #[test]
        fn parses_action_names_loosely() {
            assert_eq!(ConditionalAction::from_parts("Skip", None, &[]), Ok(ConditionalAction::Skip));
            assert_eq!(
                ConditionalAction::from_parts("show_message", None, &[]),
                Ok(ConditionalAction::ShowMessage)
            );
            assert_eq!(
                ConditionalAction::from_parts("branch:employment", None, &[]),
                Ok(ConditionalAction::BranchTo("employment".into()))
            );
            assert_eq!(
                ConditionalAction::from_parts("branch-to", Some("review"), &[]),
                Ok(ConditionalAction::BranchTo("review".into()))
            );
        }

        #[test]
        fn branch_without_target_is_rejected() {
            assert!(ConditionalAction::from_parts("goto", None, &[]).is_err());
            assert!(ConditionalAction::from_parts("explode", None, &[]).is_err());
        }

        #[test]
        fn document_note_lists_documents() {
            let rule = ConditionalRule {
                condition: Condition::parse("hasRealId").unwrap(),
                source: "hasRealId".into(),
                action: ConditionalAction::RequireDocuments(vec!["Passport".into(), "Utility bill".into()]),
                message: None,
            };
            assert_eq!(
                rule.note().unwrap(),
                "Please have these documents ready: Passport, Utility bill."
            );
        }
    }

    mod navigation {
        use super::*;

        fn step(logic: &[(&str, ConditionalAction)]) -> ConversationStep {
            ConversationStep {
                id: "license".into(),
                title: "License".into(),
                description: String::new(),
                expected_fields: vec!["licenseNumber".into()],
                validation_rules: Vec::new(),
                conditional_logic: logic
                    .iter()
                    .map(|(source, action)| ConditionalRule {
                        condition: Condition::parse(source).unwrap(),
                        source: (*source).into(),
                        action: action.clone(),
                        message: None,
                    })
                    .collect(),
            }
        }

        #[test]
        fn matching_skip_applies_before_fields_are_answered() {
            let mut answers = AnswerMap::new();
            answers.insert("hasLicense", TypedValue::Boolean(false));
            let s = step(&[("hasLicense == false", ConditionalAction::Skip)]);

            assert!(!s.is_fully_answered(&answers));
            assert_eq!(s.navigation(&answers).map(|r| &r.action), Some(&ConditionalAction::Skip));
        }

        #[test]
        fn first_matching_rule_decides() {
            let mut answers = AnswerMap::new();
            answers.insert("hasLicense", TypedValue::Boolean(false));
            let s = step(&[
                ("hasLicense == false", ConditionalAction::ShowMessage),
                ("hasLicense == false", ConditionalAction::Skip),
            ]);

            assert!(s.navigation(&answers).is_none());
        }

        #[test]
        fn unmatched_condition_gives_nothing() {
            let s = step(&[("hasLicense == false", ConditionalAction::BranchTo("contact".into()))]);
            assert!(s.navigation(&AnswerMap::new()).is_none());
        }
    }

    mod rules {
        use super::*;

        fn rule(field: &str, kind: StepRuleKind) -> StepRule {
            StepRule { field: field.into(), kind, message: None }
        }

        #[test]
        fn required_rejects_empty() {
            let mut answers = AnswerMap::new();
            answers.insert("ssn", TypedValue::Empty);
            assert!(!rule("ssn", StepRuleKind::Required).check(&answers));
        }

        #[test]
        fn before_and_after_compare_dates() {
            let mut answers = AnswerMap::new();
            answers.insert("start", date(2026, 1, 1));
            answers.insert("end", date(2026, 6, 1));
            assert!(rule("start", StepRuleKind::Before("end".into())).check(&answers));
            assert!(!rule("start", StepRuleKind::After("end".into())).check(&answers));
        }

        #[test]
        fn comparisons_pass_when_operand_missing() {
            let mut answers = AnswerMap::new();
            answers.insert("start", date(2026, 1, 1));
            assert!(rule("start", StepRuleKind::Before("end".into())).check(&answers));
            assert!(rule("email", StepRuleKind::SameAs("confirmEmail".into())).check(&answers));
        }

        #[test]
        fn same_as_ignores_case() {
            let mut answers = AnswerMap::new();
            answers.insert("email", TypedValue::Email("a@b.co".into()));
            answers.insert("confirmEmail", TypedValue::Email("A@B.co".into()));
            assert!(rule("email", StepRuleKind::SameAs("confirmEmail".into())).check(&answers));
        }

        #[test]
        fn default_failure_message_names_rule() {
            let r = rule("country", StepRuleKind::NotEquals("Narnia".into()));
            assert_eq!(r.failure_message(), "country failed check: notEquals Narnia");
        }
    }
}
