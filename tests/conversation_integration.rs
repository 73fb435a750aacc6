//! Integration tests for guided form conversations.
//!
//! These tests drive the public API end to end:
//! 1. A template is parsed (or loaded through a store)
//! 2. A FormConversation runs turns through the tier chain
//! 3. Proposals are validated and merged, conditional logic navigates
//! 4. Lifecycle and fallback events reach the event bus
//!
//! Uses the mock model, the in-memory index and the in-memory bus, so no
//! inference runtime is needed.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use formly_engine::adapters::tiers::AttemptOutcome;
use formly_engine::adapters::{
    InMemoryContentIndex, InMemoryEventBus, MockLanguageModel, ModelTier, RetrievalTier, TierChain,
};
use formly_engine::application::{
    build_tier_chain, EngineError, FormConversation, LoadTemplateCommand, LoadTemplateHandler,
    TierSources,
};
use formly_engine::config::{ConversationConfig, ExtractionConfig};
use formly_engine::domain::conversation::{AnswerMap, SessionStatus};
use formly_engine::domain::extraction::{ExtractionRequest, TierKind};
use formly_engine::domain::foundation::{Percentage, SessionId};
use formly_engine::domain::template::Template;
use formly_engine::domain::validation::TypedValue;
use formly_engine::ports::{StoreError, TemplateStore};

// =============================================================================
// Test Infrastructure
// =============================================================================

fn parse(doc: serde_json::Value) -> Arc<Template> {
    Arc::new(Template::parse(doc.to_string().as_bytes()).expect("template parses"))
}

/// One step, one required date of birth with `minAge: 18`.
fn age_check_template() -> Arc<Template> {
    parse(json!({
        "metadata": {"id": "age-check", "name": "Age check", "version": "1.0"},
        "schema": {"sections": [{"id": "s", "title": "Applicant", "fields": [
            {"id": "dob", "label": "Date of birth", "type": "date", "required": true,
             "validation": {"minAge": 18}}
        ]}]},
        "conversationFlow": {"steps": [
            {"id": "birth", "title": "Birth", "expectedFields": ["dob"]}
        ]}
    }))
}

/// Identity, an optional license step skipped when the applicant has none,
/// then contact details.
fn license_template() -> Arc<Template> {
    parse(json!({
        "metadata": {"id": "dmv-renewal", "name": "DMV Renewal", "version": "3.0"},
        "schema": {"sections": [{"id": "s", "title": "Applicant", "fields": [
            {"id": "fullName", "label": "Full name", "type": "text", "required": true},
            {"id": "hasLicense", "label": "Current license", "type": "boolean", "required": true},
            {"id": "licenseNumber", "label": "License number", "type": "text", "required": true},
            {"id": "contactEmail", "label": "Email", "type": "email", "required": true},
            {"id": "homeAddress", "label": "Home address", "type": "text"}
        ]}]},
        "conversationFlow": {"steps": [
            {"id": "identity", "title": "Identity", "expectedFields": ["fullName"]},
            {"id": "license", "title": "License", "expectedFields": ["hasLicense", "licenseNumber"],
             "conditionalLogic": [
                 {"condition": "hasLicense == false", "action": "skip"}
             ]},
            {"id": "contact", "title": "Contact", "expectedFields": ["contactEmail", "homeAddress"]}
        ]}
    }))
}

fn conversation(template: Arc<Template>, chain: TierChain) -> (FormConversation, Arc<InMemoryEventBus>) {
    let bus = Arc::new(InMemoryEventBus::new());
    let conversation = FormConversation::new(
        template,
        &ConversationConfig::default(),
        Arc::new(chain),
        bus.clone(),
    );
    (conversation, bus)
}

fn slow_model(response: &str, delay: Duration) -> TierChain {
    let model = MockLanguageModel::new().with_response(response).with_delay(delay);
    TierChain::new().with_tier(Arc::new(ModelTier::new(Arc::new(model))))
}

// =============================================================================
// Validation through a full turn
// =============================================================================

#[tokio::test]
async fn adult_birth_date_completes_single_step_form() {
    let (conversation, bus) = conversation(age_check_template(), TierChain::new());
    conversation.start().await.unwrap();

    let outcome = conversation.submit("01/15/1990").await.unwrap();

    assert!(outcome.is_completed());
    assert_eq!(outcome.completion, Percentage::HUNDRED);
    assert!(matches!(outcome.accepted_value("dob"), Some(TypedValue::Date(_))));
    assert_eq!(conversation.status().await, SessionStatus::Completed);
    assert!(bus.has_event("session.completed.v1"));
}

#[tokio::test]
async fn minor_birth_date_is_rejected_and_reprompted() {
    let (conversation, bus) = conversation(age_check_template(), TierChain::new());
    conversation.start().await.unwrap();

    let outcome = conversation.submit("01/15/2015").await.unwrap();

    assert!(outcome.accepted.is_empty());
    assert_eq!(outcome.notes, vec!["You must be at least 18 years old".to_string()]);
    let prompt = outcome.next.prompt().unwrap();
    assert_eq!(prompt.step_id, "birth");
    assert_eq!(prompt.field_id.as_deref(), Some("dob"));
    assert!(conversation.snapshot().await.answers.is_empty());
    assert!(!bus.has_event("session.completed.v1"));
}

// =============================================================================
// Proposals outside the current step
// =============================================================================

#[tokio::test]
async fn address_outside_current_step_is_not_merged() {
    let (conversation, _) = conversation(license_template(), TierChain::new());
    conversation.start().await.unwrap();

    let outcome = conversation
        .submit("my address is 12 Main St, Austin TX")
        .await
        .unwrap();

    assert!(outcome.accepted.is_empty());
    assert_eq!(outcome.notes, vec!["I'll ask about your home address later.".to_string()]);
    assert_eq!(outcome.next.prompt().unwrap().field_id.as_deref(), Some("fullName"));
    assert!(conversation.snapshot().await.answers.is_empty());
}

// =============================================================================
// Tier fallback
// =============================================================================

#[tokio::test]
async fn malformed_model_output_falls_back_to_rules() {
    let model = MockLanguageModel::new().with_response("Sure! The name is Ada.");
    let index = InMemoryContentIndex::new();
    index.set_ready(false);
    let chain = TierChain::new()
        .with_tier(Arc::new(ModelTier::new(Arc::new(model.clone()))))
        .with_tier(Arc::new(RetrievalTier::new(Arc::new(index))));

    let request = ExtractionRequest::new(
        license_template(),
        "identity",
        AnswerMap::new(),
        "Ada Lovelace",
    )
    .unwrap();
    let outcome = chain.extract(SessionId::new(), &request).await;

    assert_eq!(outcome.tier, TierKind::Rules);
    assert_eq!(model.call_count(), 1);
    assert_eq!(outcome.attempts.len(), 3);
    assert!(matches!(outcome.attempts[0].outcome, AttemptOutcome::Failed(_)));
    assert_eq!(outcome.attempts[1].outcome, AttemptOutcome::Unavailable);
    assert_eq!(outcome.attempts[2].outcome, AttemptOutcome::Succeeded);
    assert_eq!(outcome.result.updates.len(), 1);
    assert_eq!(outcome.result.updates[0].field_id, "fullName");
}

#[tokio::test]
async fn model_failure_is_absorbed_by_the_turn() {
    let model = MockLanguageModel::new().with_response("not json at all");
    let chain = TierChain::new().with_tier(Arc::new(ModelTier::new(Arc::new(model))));
    let (conversation, bus) = conversation(license_template(), chain);
    conversation.start().await.unwrap();

    let outcome = conversation.submit("Ada Lovelace").await.unwrap();

    assert_eq!(outcome.tier, Some(TierKind::Rules));
    assert_eq!(
        outcome.accepted_value("fullName"),
        Some(&TypedValue::Text("Ada Lovelace".into()))
    );
    assert_eq!(bus.events_of_type("extraction.tier_fallback.v1").len(), 1);
}

#[tokio::test]
async fn unloaded_model_is_never_invoked() {
    let model = MockLanguageModel::unloaded();
    let chain = TierChain::new().with_tier(Arc::new(ModelTier::new(Arc::new(model.clone()))));
    let (conversation, _) = conversation(license_template(), chain);
    conversation.start().await.unwrap();

    conversation.submit("Ada Lovelace").await.unwrap();

    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn model_proposals_are_validated_before_merge() {
    let model = MockLanguageModel::new().with_response(
        r#"{"updates": [{"fieldId": "fullName", "value": "Ada Lovelace"},
                        {"fieldId": "favouriteColour", "value": "green"}]}"#,
    );
    let chain = TierChain::new().with_tier(Arc::new(ModelTier::new(Arc::new(model))));
    let (conversation, _) = conversation(license_template(), chain);
    conversation.start().await.unwrap();

    let outcome = conversation.submit("I'm Ada and I like green").await.unwrap();

    assert_eq!(outcome.tier, Some(TierKind::Model));
    assert_eq!(outcome.accepted.len(), 1);
    assert_eq!(conversation.snapshot().await.answers.len(), 1);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn second_submit_while_first_in_flight_is_busy() {
    let chain = slow_model(
        r#"{"updates": [{"fieldId": "fullName", "value": "Ada Lovelace"}]}"#,
        Duration::from_millis(100),
    );
    let (conversation, _) = conversation(license_template(), chain);
    conversation.start().await.unwrap();

    let (first, second) = tokio::join!(conversation.submit("I'm Ada"), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        conversation.submit("I'm Grace").await
    });

    assert_eq!(second.unwrap_err(), EngineError::Busy);
    assert!(first.is_ok());
    let answers = conversation.snapshot().await.answers;
    assert_eq!(answers.len(), 1);
    assert_eq!(answers.get("fullName"), Some(&TypedValue::Text("Ada Lovelace".into())));
}

#[tokio::test]
async fn cancelled_turn_leaves_answers_untouched() {
    let chain = slow_model(
        r#"{"updates": [{"fieldId": "fullName", "value": "Ada Lovelace"}]}"#,
        Duration::from_millis(100),
    );
    let (conversation, _) = conversation(license_template(), chain);
    conversation.start().await.unwrap();

    let (result, _) = tokio::join!(conversation.submit("I'm Ada"), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        conversation.cancel_turn();
    });

    assert_eq!(result.unwrap_err(), EngineError::TurnCancelled);
    assert!(conversation.snapshot().await.answers.is_empty());

    let retry = conversation.submit("Ada Lovelace").await.unwrap();
    assert!(retry.accepted_value("fullName").is_some());
}

#[tokio::test]
async fn tier_timeout_falls_back_to_rules() {
    let model = MockLanguageModel::new()
        .with_response(r#"{"updates": []}"#)
        .with_delay(Duration::from_millis(200));
    let chain = TierChain::new()
        .with_tier(Arc::new(ModelTier::new(Arc::new(model))))
        .with_tier_timeout(Duration::from_millis(20));
    let (conversation, _) = conversation(license_template(), chain);
    conversation.start().await.unwrap();

    let outcome = conversation.submit("Ada Lovelace").await.unwrap();

    assert_eq!(outcome.tier, Some(TierKind::Rules));
    assert!(outcome.accepted_value("fullName").is_some());
}

// =============================================================================
// Navigation and completion
// =============================================================================

#[tokio::test]
async fn skipped_step_does_not_block_completion() {
    let (conversation, bus) = conversation(license_template(), TierChain::new());
    conversation.start().await.unwrap();

    conversation.submit("Ada Lovelace").await.unwrap();
    let after_license = conversation.submit("no").await.unwrap();
    assert_eq!(after_license.next.prompt().unwrap().step_id, "contact");

    conversation.submit("ada@example.com").await.unwrap();
    let done = conversation.submit("I live at 12 Main St").await.unwrap();

    assert!(done.is_completed());
    assert_eq!(done.completion, Percentage::HUNDRED);
    let snapshot = conversation.snapshot().await;
    assert_eq!(snapshot.left_early_steps, vec!["license".to_string()]);
    assert!(snapshot.answers.get("licenseNumber").is_none());
    assert_eq!(
        bus.event_types(),
        vec!["session.started.v1", "session.completed.v1"]
    );
}

#[tokio::test]
async fn license_holder_is_asked_for_number() {
    let (conversation, _) = conversation(license_template(), TierChain::new());
    conversation.start().await.unwrap();

    conversation.submit("Ada Lovelace").await.unwrap();
    let outcome = conversation.submit("yes").await.unwrap();

    let prompt = outcome.next.prompt().unwrap();
    assert_eq!(prompt.step_id, "license");
    assert_eq!(prompt.field_id.as_deref(), Some("licenseNumber"));
    assert!(outcome.completion < Percentage::HUNDRED);
}

#[tokio::test]
async fn review_edit_after_completion_keeps_form_complete() {
    let (conversation, _) = conversation(age_check_template(), TierChain::new());
    conversation.start().await.unwrap();
    conversation.submit("01/15/1990").await.unwrap();

    let edited = conversation.edit_answer("dob", "1985-03-02").await.unwrap();

    assert!(matches!(edited, TypedValue::Date(_)));
    assert_eq!(conversation.status().await, SessionStatus::Completed);
    assert!(conversation.edit_answer("dob", "03/02/2020").await.is_err());
}

// =============================================================================
// Wiring from configuration and stores
// =============================================================================

struct SingleTemplateStore(&'static str);

#[async_trait::async_trait]
impl TemplateStore for SingleTemplateStore {
    async fn fetch(&self, template_id: &str) -> Result<Vec<u8>, StoreError> {
        if template_id == "age-check" {
            Ok(self.0.as_bytes().to_vec())
        } else {
            Err(StoreError::NotFound(template_id.to_string()))
        }
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(vec!["age-check".to_string()])
    }
}

const AGE_CHECK_YAML: &str = r#"
metadata:
  id: age-check
  name: Age check
  version: 2
schema:
  sections:
    - id: s
      title: Applicant
      fields:
        - id: dob
          label: Date of birth
          type: date
          required: true
          validation:
            minAge: 18
conversationFlow:
  steps:
    - id: birth
      title: Birth
      expectedFields: [dob]
"#;

#[tokio::test]
async fn loaded_template_drives_configured_conversation() {
    let bus = Arc::new(InMemoryEventBus::new());
    let handler = LoadTemplateHandler::new(Arc::new(SingleTemplateStore(AGE_CHECK_YAML)), bus.clone());
    let loaded = handler
        .handle(LoadTemplateCommand {
            template_id: "age-check".to_string(),
        })
        .await
        .unwrap();

    let sources = TierSources {
        model: Some(Arc::new(MockLanguageModel::unloaded())),
        index: Some(Arc::new(
            InMemoryContentIndex::new().with_snippet("Enter your date of birth as MM/DD/YYYY.", "faq"),
        )),
        callback: None,
    };
    let chain = build_tier_chain(&ExtractionConfig::default(), sources);
    let conversation = FormConversation::new(
        loaded.template,
        &ConversationConfig::default(),
        Arc::new(chain),
        bus.clone(),
    );
    conversation.start().await.unwrap();

    let outcome = conversation.submit("my date of birth is 01/15/1990").await.unwrap();

    assert_eq!(outcome.tier, Some(TierKind::Retrieval));
    assert!(outcome.is_completed());
    assert!(outcome.notes.iter().any(|n| n.starts_with("See also (faq)")));
    assert!(bus.has_event("template.loaded.v1"));
}

#[tokio::test]
async fn unknown_template_is_not_found() {
    let handler = LoadTemplateHandler::new(
        Arc::new(SingleTemplateStore(AGE_CHECK_YAML)),
        Arc::new(InMemoryEventBus::new()),
    );
    let result = handler
        .handle(LoadTemplateCommand {
            template_id: "passport".to_string(),
        })
        .await;

    assert!(matches!(result, Err(EngineError::Store(StoreError::NotFound(_)))));
}
