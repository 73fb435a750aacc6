//! Template document parsing and structural checks.
//!
//! A template either parses completely or not at all: every reference is
//! resolved here so the conversation never meets an undeclared field or step.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use super::aggregate::Template;
use super::condition::Condition;
use super::document::{self, RawConditional, RawField, RawStep, RawStepRule, RawValidation};
use super::errors::{ParseError, ParseReason};
use super::field::{CompiledPattern, Field, FieldType, Section, ValidationRuleSet};
use super::review::TemplateMetadata;
use super::step::{ConditionalAction, ConditionalRule, ConversationStep, StepRule, StepRuleKind};

static VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+(\.\d+){0,2}(-[0-9A-Za-z][0-9A-Za-z.-]*)?$").expect("version regex")
});

type ParseResult<T> = Result<T, ParseError>;

fn require<T>(value: Option<T>, key: &str, path: &str) -> ParseResult<T> {
    value.ok_or_else(|| {
        ParseError::new(ParseReason::MissingKey(key.to_string()), format!("{}.{}", path, key))
    })
}

fn require_text(value: Option<String>, key: &str, path: &str) -> ParseResult<String> {
    require(value.filter(|v| !v.trim().is_empty()), key, path)
}

/// Parses a template document.
pub fn parse(bytes: &[u8]) -> ParseResult<Template> {
    let raw = document::decode(bytes)?;

    let metadata = parse_metadata(raw.metadata)?;

    let schema = require(raw.schema, "schema", "$")?;
    let raw_sections = require(schema.sections, "sections", "schema")?;
    let sections = parse_sections(raw_sections)?;
    let field_ids: HashSet<&str> = sections
        .iter()
        .flat_map(|s| s.fields.iter())
        .map(|f| f.id.as_str())
        .collect();

    let flow = require(raw.conversation_flow, "conversationFlow", "$")?;
    let raw_steps = require(flow.steps, "steps", "conversationFlow")?;
    if raw_steps.is_empty() {
        return Err(ParseError::new(ParseReason::NoSteps, "conversationFlow.steps"));
    }

    // Step ids first, so branches may point forward.
    let mut step_ids = HashSet::new();
    for (i, step) in raw_steps.iter().enumerate() {
        let path = format!("conversationFlow.steps[{}]", i);
        let id = require_text(step.id.clone(), "id", &path)?;
        if !step_ids.insert(id.clone()) {
            return Err(ParseError::new(ParseReason::DuplicateStepId(id), format!("{}.id", path)));
        }
    }

    let steps = raw_steps
        .into_iter()
        .enumerate()
        .map(|(i, raw)| parse_step(raw, i, &field_ids, &step_ids))
        .collect::<ParseResult<Vec<_>>>()?;

    let system_prompt = raw.system_prompt.filter(|p| !p.trim().is_empty());

    Ok(Template::from_parts(metadata, sections, steps, raw.review, system_prompt))
}

fn parse_metadata(raw: Option<document::RawMetadata>) -> ParseResult<TemplateMetadata> {
    let raw = require(raw, "metadata", "$")?;
    let id = require_text(raw.id, "id", "metadata")?;
    let name = require_text(raw.name, "name", "metadata")?;
    let version = require_text(raw.version, "version", "metadata")?;
    if !VERSION.is_match(version.trim()) {
        return Err(ParseError::new(ParseReason::MalformedVersion(version), "metadata.version"));
    }

    Ok(TemplateMetadata {
        id,
        name,
        version: version.trim().to_string(),
        category: raw.category,
        description: raw.description,
        estimated_time: raw.estimated_time,
        difficulty: raw.difficulty,
        language_support: raw.language_support,
    })
}

fn parse_sections(raw: Vec<document::RawSection>) -> ParseResult<Vec<Section>> {
    let mut seen = HashSet::new();
    let mut sections = Vec::with_capacity(raw.len());

    for (i, section) in raw.into_iter().enumerate() {
        let path = format!("schema.sections[{}]", i);
        let id = require_text(section.id, "id", &path)?;
        let title = require_text(section.title, "title", &path)?;

        let mut fields = Vec::with_capacity(section.fields.len());
        for (j, raw_field) in section.fields.into_iter().enumerate() {
            let field_path = format!("{}.fields[{}]", path, j);
            let field = parse_field(raw_field, &field_path)?;
            if !seen.insert(field.id.clone()) {
                return Err(ParseError::new(
                    ParseReason::DuplicateFieldId(field.id),
                    format!("{}.id", field_path),
                ));
            }
            fields.push(field);
        }

        sections.push(Section {
            id,
            title,
            description: section.description,
            fields,
        });
    }

    Ok(sections)
}

fn parse_field(raw: RawField, path: &str) -> ParseResult<Field> {
    let id = require_text(raw.id, "id", path)?;
    let label = require_text(raw.label, "label", path)?;
    let type_name = require_text(raw.field_type, "type", path)?;
    let field_type = FieldType::from_name(&type_name).ok_or_else(|| {
        ParseError::new(ParseReason::UnknownFieldType(type_name.clone()), format!("{}.type", path))
    })?;

    let options: Vec<String> = raw
        .options
        .into_iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    if field_type == FieldType::Choice && options.is_empty() {
        return Err(ParseError::new(
            ParseReason::ChoiceWithoutOptions(id),
            format!("{}.options", path),
        ));
    }

    let validation = raw
        .validation
        .map(|v| parse_validation(v, &id, field_type, &format!("{}.validation", path)))
        .transpose()?
        .filter(|rules| !rules.is_empty() || rules.message.is_some());

    Ok(Field {
        id,
        label,
        field_type,
        required: raw.required,
        options: if field_type == FieldType::Choice { options } else { Vec::new() },
        validation,
        ai_prompt: raw.ai_prompt.filter(|p| !p.trim().is_empty()),
    })
}

fn parse_validation(
    raw: RawValidation,
    field_id: &str,
    field_type: FieldType,
    path: &str,
) -> ParseResult<ValidationRuleSet> {
    let pattern = raw
        .pattern
        .map(|p| {
            CompiledPattern::new(&p).map_err(|e| {
                ParseError::new(ParseReason::InvalidPattern(e.to_string()), format!("{}.pattern", path))
            })
        })
        .transpose()?;

    let rules = ValidationRuleSet {
        pattern,
        min_length: raw.min_length,
        max_length: raw.max_length,
        min_age: raw.min_age,
        max_age: raw.max_age,
        max_days_ago: raw.max_days_ago,
        min_days_from_now: raw.min_days_from_now,
        message: raw.message,
    };

    if field_type != FieldType::Date {
        let date_keys = [
            ("minAge", rules.min_age.is_some()),
            ("maxAge", rules.max_age.is_some()),
            ("maxDaysAgo", rules.max_days_ago.is_some()),
            ("minDaysFromNow", rules.min_days_from_now.is_some()),
        ];
        if let Some((key, _)) = date_keys.iter().find(|(_, present)| *present) {
            return Err(ParseError::new(
                ParseReason::DateConstraintOnNonDate {
                    field: field_id.to_string(),
                    constraint: key.to_string(),
                },
                format!("{}.{}", path, key),
            ));
        }
    }

    Ok(rules)
}

fn check_field_ref(id: &str, fields: &HashSet<&str>, path: String) -> ParseResult<()> {
    if fields.contains(id) {
        Ok(())
    } else {
        Err(ParseError::new(ParseReason::UndeclaredField(id.to_string()), path))
    }
}

fn parse_step(
    raw: RawStep,
    index: usize,
    fields: &HashSet<&str>,
    steps: &HashSet<String>,
) -> ParseResult<ConversationStep> {
    let path = format!("conversationFlow.steps[{}]", index);
    let id = require_text(raw.id, "id", &path)?;
    let title = require_text(raw.title, "title", &path)?;

    for (i, field) in raw.expected_fields.iter().enumerate() {
        check_field_ref(field, fields, format!("{}.expectedFields[{}]", path, i))?;
    }

    let validation_rules = raw
        .validation_rules
        .into_iter()
        .enumerate()
        .map(|(i, r)| parse_step_rule(r, fields, &format!("{}.validationRules[{}]", path, i)))
        .collect::<ParseResult<Vec<_>>>()?;

    let conditional_logic = raw
        .conditional_logic
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            parse_conditional(c, fields, steps, &format!("{}.conditionalLogic[{}]", path, i))
        })
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(ConversationStep {
        id,
        title,
        description: raw.description,
        expected_fields: raw.expected_fields,
        validation_rules,
        conditional_logic,
    })
}

fn parse_step_rule(raw: RawStepRule, fields: &HashSet<&str>, path: &str) -> ParseResult<StepRule> {
    let field = require_text(raw.field, "field", path)?;
    check_field_ref(&field, fields, format!("{}.field", path))?;
    let rule = require_text(raw.rule, "rule", path)?;

    let normalized: String = rule
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect();
    let value = || {
        raw.value
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                ParseError::new(ParseReason::RuleMissingValue(rule.clone()), format!("{}.value", path))
            })
    };
    let other_field = || -> ParseResult<String> {
        let other = value()?;
        check_field_ref(&other, fields, format!("{}.value", path))?;
        Ok(other)
    };

    let kind = match normalized.as_str() {
        "required" => StepRuleKind::Required,
        "equals" | "eq" => StepRuleKind::Equals(value()?),
        "notequals" | "ne" => StepRuleKind::NotEquals(value()?),
        "pattern" | "regex" => {
            let source = value()?;
            let compiled = CompiledPattern::new(&source).map_err(|e| {
                ParseError::new(ParseReason::InvalidPattern(e.to_string()), format!("{}.value", path))
            })?;
            StepRuleKind::Pattern(compiled)
        }
        "before" => StepRuleKind::Before(other_field()?),
        "after" => StepRuleKind::After(other_field()?),
        "sameas" | "matches" => StepRuleKind::SameAs(other_field()?),
        _ => {
            return Err(ParseError::new(ParseReason::UnknownRule(rule.clone()), format!("{}.rule", path)))
        }
    };

    Ok(StepRule {
        field,
        kind,
        message: raw.message,
    })
}

fn parse_conditional(
    raw: RawConditional,
    fields: &HashSet<&str>,
    steps: &HashSet<String>,
    path: &str,
) -> ParseResult<ConditionalRule> {
    let source = require_text(raw.condition, "condition", path)?;
    let condition = Condition::parse(&source).map_err(|e| {
        ParseError::new(ParseReason::MalformedCondition(e), format!("{}.condition", path))
    })?;
    for field in condition.referenced_fields() {
        check_field_ref(field, fields, format!("{}.condition", path))?;
    }

    let action_name = require_text(raw.action, "action", path)?;
    let action = ConditionalAction::from_parts(&action_name, raw.target.as_deref(), &raw.documents)
        .map_err(|e| ParseError::new(ParseReason::UnknownAction(e), format!("{}.action", path)))?;
    if let ConditionalAction::BranchTo(target) = &action {
        if !steps.contains(target) {
            return Err(ParseError::new(
                ParseReason::UnknownStep(target.clone()),
                format!("{}.action", path),
            ));
        }
    }

    Ok(ConditionalRule {
        condition,
        source,
        action,
        message: raw.message,
    })
}
