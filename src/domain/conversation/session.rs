//! Conversation session aggregate.
//!
//! A session walks one user through one template. It owns the step cursor
//! and the answers, and is the only writer of either.
//!
//! # Aggregate Boundary
//!
//! - Tier proposals enter only through [`ConversationSession::apply_extraction`]
//!   and are validated before they touch the answers
//! - Navigation (conditional logic, step rules, advancement) happens here
//! - The session never awaits; the async service around it does

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::answers::AnswerMap;
use super::errors::SessionError;
use super::events::{SessionCancelled, SessionCompleted, SessionStarted};
use super::state::SessionStatus;
use super::turn::{AcceptedUpdate, NextAction, Prompt, TurnOutcome};
use crate::domain::extraction::{ExtractionRequest, ExtractionResult, TierKind};
use crate::domain::foundation::{EventId, Percentage, SessionId, StateMachine, Timestamp};
use crate::domain::template::{ConditionalAction, ConversationStep, Template, TemplateError};
use crate::domain::validation::{validate, TypedValue};

/// Conversation session - drives one template to completion.
///
/// # Invariants
///
/// - `cursor` indexes an existing step whenever `status` is `InProgress`
/// - every key in `answers` is a field declared by `template`
/// - `bypassed` holds steps jumped over by a forward branch
/// - `left_early` holds steps exited through skip or branch
#[derive(Debug, Clone)]
pub struct ConversationSession {
    id: SessionId,
    template: Arc<Template>,
    status: SessionStatus,
    cursor: usize,
    answers: AnswerMap,
    bypassed: BTreeSet<usize>,
    left_early: BTreeSet<usize>,
    restrict_updates_to_step: bool,
    created_at: Timestamp,
    started_at: Option<Timestamp>,
    updated_at: Timestamp,
}

impl ConversationSession {
    /// Creates a session in `NotStarted`.
    pub fn new(template: Arc<Template>) -> Self {
        Self::with_id(SessionId::new(), template)
    }

    pub fn with_id(id: SessionId, template: Arc<Template>) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            template,
            status: SessionStatus::NotStarted,
            cursor: 0,
            answers: AnswerMap::new(),
            bypassed: BTreeSet::new(),
            left_early: BTreeSet::new(),
            restrict_updates_to_step: true,
            created_at: now,
            started_at: None,
            updated_at: now,
        }
    }

    /// When false, proposals for fields outside the current step are
    /// validated and merged instead of deferred.
    pub fn with_step_restriction(mut self, restrict: bool) -> Self {
        self.restrict_updates_to_step = restrict;
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// The step being asked, while in progress.
    pub fn current_step(&self) -> Option<&ConversationStep> {
        match self.status {
            SessionStatus::InProgress => self.template.step_at(self.cursor),
            _ => None,
        }
    }

    /// Ids of steps jumped over by a branch.
    pub fn bypassed_steps(&self) -> Vec<&str> {
        self.step_ids(&self.bypassed)
    }

    /// Ids of steps left through skip or branch.
    pub fn left_early_steps(&self) -> Vec<&str> {
        self.step_ids(&self.left_early)
    }

    fn step_ids(&self, indices: &BTreeSet<usize>) -> Vec<&str> {
        indices
            .iter()
            .filter_map(|i| self.template.step_at(*i))
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Share of reachable expected fields that hold a value.
    ///
    /// Steps bypassed by a branch are not reachable; unanswered fields of
    /// steps left early are not expected. Recomputed on every call.
    pub fn completion(&self) -> Percentage {
        let mut expected = 0;
        let mut answered = 0;

        for (index, step) in self.template.steps().iter().enumerate() {
            if self.bypassed.contains(&index) {
                continue;
            }
            let left_early = self.left_early.contains(&index);
            for field in &step.expected_fields {
                let is_answered = self.answers.is_answered(field);
                if left_early && !is_answered {
                    continue;
                }
                expected += 1;
                if is_answered {
                    answered += 1;
                }
            }
        }

        Percentage::from_ratio(answered, expected)
    }

    /// The question currently pending, or completion.
    pub fn next_action(&self) -> Result<NextAction, SessionError> {
        match self.status {
            SessionStatus::Completed => Ok(NextAction::Completed),
            SessionStatus::InProgress => {
                let step = self.step_at_cursor()?;
                let prompt = step
                    .missing_fields(&self.answers)
                    .find_map(|id| self.template.field(id))
                    .map(|field| Prompt::for_field(step, field))
                    .unwrap_or_else(|| Prompt::for_step(step));
                Ok(NextAction::Ask(prompt))
            }
            other => Err(SessionError::invalid_state("prompt from", other)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Moves to the first step and returns its question.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless `NotStarted`
    pub fn start(&mut self) -> Result<TurnOutcome, SessionError> {
        self.transition(SessionStatus::InProgress, "start")?;
        self.cursor = 0;
        self.started_at = Some(Timestamp::now());
        info!(
            session_id = %self.id,
            template_id = %self.template.id(),
            "session started"
        );

        let mut notes = Vec::new();
        self.settle(&mut notes)?;
        self.touch();

        Ok(TurnOutcome {
            accepted: Vec::new(),
            notes,
            next: self.next_action()?,
            completion: self.completion(),
            tier: None,
        })
    }

    /// Cancels an unfinished session.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if already completed or cancelled
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.transition(SessionStatus::Cancelled, "cancel")?;
        info!(session_id = %self.id, "session cancelled");
        self.touch();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Turns
    // ─────────────────────────────────────────────────────────────────────────

    /// Snapshot handed to the extraction tiers for one utterance.
    pub fn extraction_request(&self, utterance: &str) -> Result<ExtractionRequest, SessionError> {
        self.ensure_in_progress("submit to")?;
        let step = self.step_at_cursor()?;
        Ok(ExtractionRequest::new(
            Arc::clone(&self.template),
            &step.id,
            self.answers.clone(),
            utterance,
        )?)
    }

    /// Validates and merges a tier's proposals, then decides where to go.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless `InProgress`
    pub fn apply_extraction(
        &mut self,
        result: ExtractionResult,
        tier: Option<TierKind>,
    ) -> Result<TurnOutcome, SessionError> {
        self.ensure_in_progress("submit to")?;
        let template = Arc::clone(&self.template);
        let step = template
            .step_at(self.cursor)
            .ok_or_else(|| TemplateError::StepNotFound(format!("#{}", self.cursor)))?;

        let mut accepted: Vec<AcceptedUpdate> = Vec::new();
        let mut notes = Vec::new();
        let mut deferred: Vec<&str> = Vec::new();

        for proposal in &result.updates {
            let Some(field) = template.field(&proposal.field_id) else {
                debug!(field_id = %proposal.field_id, "dropping proposal for undeclared field");
                continue;
            };

            if self.restrict_updates_to_step && !step.expects(&field.id) {
                debug!(
                    field_id = %field.id,
                    step_id = %step.id,
                    "deferring proposal outside current step"
                );
                if !deferred.contains(&field.id.as_str()) {
                    deferred.push(&field.id);
                }
                continue;
            }

            match validate(field, &proposal.raw_value) {
                Ok(value) => {
                    accepted.retain(|u| u.field_id != field.id);
                    self.answers.insert(field.id.clone(), value.clone());
                    accepted.push(AcceptedUpdate {
                        field_id: field.id.clone(),
                        value,
                    });
                }
                Err(failure) => {
                    info!(field_id = %field.id, %failure, "proposal rejected by validation");
                    notes.push(failure.clarification(&field.label));
                }
            }
        }

        for field_id in deferred {
            if let Some(field) = template.field(field_id) {
                let note = if self.answers.is_answered(field_id) {
                    format!("{} was already provided; you can change it during review.", field.label)
                } else {
                    format!("I'll ask about your {} later.", field.label.to_lowercase())
                };
                notes.push(note);
            }
        }

        notes.extend(result.notes);

        self.evaluate_current(result.next_step_id.as_deref(), &mut notes)?;
        self.settle(&mut notes)?;
        self.touch();

        Ok(TurnOutcome {
            accepted,
            notes,
            next: self.next_action()?,
            completion: self.completion(),
            tier,
        })
    }

    /// Replaces one answer after validating it.
    ///
    /// Allowed while in progress and after completion (review edits).
    ///
    /// # Errors
    ///
    /// - `InvalidState` if not started or cancelled
    /// - `Template(FieldNotFound)` for an undeclared field
    /// - `Validation` if the value is rejected; the old answer is kept
    pub fn edit_answer(&mut self, field_id: &str, raw: &str) -> Result<TypedValue, SessionError> {
        match self.status {
            SessionStatus::InProgress | SessionStatus::Completed => {}
            other => return Err(SessionError::invalid_state("edit", other)),
        }

        let field = self.template.require_field(field_id)?;
        let value = validate(field, raw)?;
        let previous = self.answers.insert(field_id, value.clone());
        debug!(field_id, replaced = previous.is_some(), "answer edited");
        self.touch();
        Ok(value)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────────

    /// Runs conditional logic and default advancement for the current step.
    /// Returns true if the cursor moved or the session completed.
    fn evaluate_current(
        &mut self,
        advisory_next: Option<&str>,
        notes: &mut Vec<String>,
    ) -> Result<bool, SessionError> {
        let template = Arc::clone(&self.template);
        let step = self.step_at_cursor_in(&template)?;
        let from = self.cursor;

        for rule in &step.conditional_logic {
            if !rule.matches(&self.answers) {
                continue;
            }
            debug!(step_id = %step.id, condition = %rule.source, "conditional rule matched");
            if let Some(note) = rule.note() {
                notes.push(note);
            }
            match &rule.action {
                ConditionalAction::Skip => {
                    self.left_early.insert(from);
                    self.advance_to(from + 1)?;
                    return Ok(true);
                }
                ConditionalAction::BranchTo(target) => {
                    let index = template.step_index(target)?;
                    self.left_early.insert(from);
                    self.advance_to(index)?;
                    return Ok(index != from);
                }
                ConditionalAction::RequireDocuments(_) | ConditionalAction::ShowMessage => break,
            }
        }

        if !step.is_fully_answered(&self.answers) {
            return Ok(false);
        }

        if let Some(rule) = step.first_failed_rule(&self.answers) {
            info!(step_id = %step.id, field_id = %rule.field, rule = %rule.kind, "step rule failed");
            self.answers.remove(&rule.field);
            notes.push(rule.failure_message());
            return Ok(false);
        }

        let next = advisory_next
            .and_then(|id| template.step_index(id).ok())
            .filter(|index| *index > from)
            .unwrap_or(from + 1);
        self.advance_to(next)?;
        Ok(true)
    }

    /// Keeps evaluating while the current step has nothing left to ask or
    /// skips/branches on entry. Bounded so branch cycles stop.
    fn settle(&mut self, notes: &mut Vec<String>) -> Result<(), SessionError> {
        let mut budget = self.template.steps().len() + 1;
        while self.status == SessionStatus::InProgress && budget > 0 {
            let step = self.step_at_cursor()?;
            let ready = step.is_fully_answered(&self.answers) || step.navigation(&self.answers).is_some();
            if !ready || !self.evaluate_current(None, notes)? {
                break;
            }
            budget -= 1;
        }
        Ok(())
    }

    fn advance_to(&mut self, target: usize) -> Result<(), SessionError> {
        let from = self.cursor;

        if target >= self.template.steps().len() {
            self.transition(SessionStatus::Completed, "complete")?;
            info!(session_id = %self.id, answered = self.answers.len(), "session completed");
            return Ok(());
        }

        if target > from + 1 {
            self.bypassed.extend(from + 1..target);
        }
        self.bypassed.remove(&target);
        self.left_early.remove(&target);
        self.cursor = target;

        info!(
            session_id = %self.id,
            from_step = %self.template.steps()[from].id,
            to_step = %self.template.steps()[target].id,
            "step transition"
        );
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn transition(&mut self, target: SessionStatus, operation: &'static str) -> Result<(), SessionError> {
        self.status = self
            .status
            .transition_to(target)
            .map_err(|_| SessionError::invalid_state(operation, self.status))?;
        Ok(())
    }

    fn ensure_in_progress(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.status.accepts_input() {
            Ok(())
        } else {
            Err(SessionError::invalid_state(operation, self.status))
        }
    }

    fn step_at_cursor(&self) -> Result<&ConversationStep, SessionError> {
        self.step_at_cursor_in(&self.template)
    }

    fn step_at_cursor_in<'t>(&self, template: &'t Template) -> Result<&'t ConversationStep, SessionError> {
        template
            .step_at(self.cursor)
            .ok_or_else(|| TemplateError::StepNotFound(format!("#{}", self.cursor)).into())
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    pub fn started_event(&self) -> SessionStarted {
        SessionStarted {
            event_id: EventId::new(),
            session_id: self.id,
            template_id: self.template.id().to_string(),
            template_version: self.template.version().to_string(),
            first_step_id: self
                .template
                .step_at(0)
                .map(|s| s.id.clone())
                .unwrap_or_default(),
            started_at: self.started_at.unwrap_or(self.created_at),
        }
    }

    pub fn completed_event(&self) -> SessionCompleted {
        SessionCompleted {
            event_id: EventId::new(),
            session_id: self.id,
            template_id: self.template.id().to_string(),
            answered_fields: self.answers.len(),
            completed_at: self.updated_at,
        }
    }

    pub fn cancelled_event(&self) -> SessionCancelled {
        let step_id = self
            .started_at
            .and_then(|_| self.template.step_at(self.cursor))
            .map(|s| s.id.clone());
        SessionCancelled {
            event_id: EventId::new(),
            session_id: self.id,
            template_id: self.template.id().to_string(),
            step_id,
            completion: self.completion(),
            cancelled_at: self.updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────────

    /// Serializable state for an external store.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            template_id: self.template.id().to_string(),
            template_version: self.template.version().to_string(),
            status: self.status,
            current_step_id: self.current_step().map(|s| s.id.clone()),
            answers: self.answers.clone(),
            bypassed_steps: self.bypassed_steps().into_iter().map(String::from).collect(),
            left_early_steps: self.left_early_steps().into_iter().map(String::from).collect(),
            restrict_updates_to_step: self.restrict_updates_to_step,
            created_at: self.created_at,
            started_at: self.started_at,
            updated_at: self.updated_at,
        }
    }

    /// Rebuilds a session from a snapshot taken against the same template.
    ///
    /// # Errors
    ///
    /// - `SnapshotMismatch` for a different template id or version, an
    ///   in-progress snapshot without a step, or an undeclared answer
    /// - `Template(StepNotFound)` for an unknown step id
    pub fn restore(template: Arc<Template>, snapshot: SessionSnapshot) -> Result<Self, SessionError> {
        if snapshot.template_id != template.id() || snapshot.template_version != template.version() {
            return Err(SessionError::SnapshotMismatch(format!(
                "snapshot is for {}@{}, template is {}@{}",
                snapshot.template_id,
                snapshot.template_version,
                template.id(),
                template.version()
            )));
        }
        if let Some((field_id, _)) = snapshot.answers.iter().find(|(id, _)| template.field(id).is_none()) {
            return Err(SessionError::SnapshotMismatch(format!("undeclared field '{}'", field_id)));
        }

        let cursor = match (&snapshot.status, &snapshot.current_step_id) {
            (SessionStatus::InProgress, Some(step_id)) => template.step_index(step_id)?,
            (SessionStatus::InProgress, None) => {
                return Err(SessionError::SnapshotMismatch(
                    "in-progress snapshot has no current step".to_string(),
                ))
            }
            _ => 0,
        };
        let indices = |ids: &[String]| -> Result<BTreeSet<usize>, TemplateError> {
            ids.iter().map(|id| template.step_index(id)).collect()
        };
        let bypassed = indices(&snapshot.bypassed_steps)?;
        let left_early = indices(&snapshot.left_early_steps)?;

        Ok(Self {
            id: snapshot.session_id,
            template,
            status: snapshot.status,
            cursor,
            answers: snapshot.answers,
            bypassed,
            left_early,
            restrict_updates_to_step: snapshot.restrict_updates_to_step,
            created_at: snapshot.created_at,
            started_at: snapshot.started_at,
            updated_at: snapshot.updated_at,
        })
    }
}

/// Persisted form of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub template_id: String,
    pub template_version: String,
    pub status: SessionStatus,
    pub current_step_id: Option<String>,
    pub answers: AnswerMap,
    #[serde(default)]
    pub bypassed_steps: Vec<String>,
    #[serde(default)]
    pub left_early_steps: Vec<String>,
    #[serde(default = "default_restrict")]
    pub restrict_updates_to_step: bool,
    pub created_at: Timestamp,
    #[serde(default)]
    pub started_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

fn default_restrict() -> bool {
    true
}
