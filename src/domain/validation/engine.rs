//! Field validation: required check, type coercion, constraint evaluation.
//!
//! Pure functions over their inputs. Date-relative constraints read the
//! current UTC date unless the caller pins one with [`validate_on`].

use chrono::{Datelike, NaiveDate};

use super::coerce::coerce;
use super::{Constraint, TypedValue, ValidationFailure};
use crate::domain::foundation::Timestamp;
use crate::domain::template::{Field, ValidationRuleSet};

/// Validates `raw` for `field` against today's date.
pub fn validate(field: &Field, raw: &str) -> Result<TypedValue, ValidationFailure> {
    validate_on(field, raw, Timestamp::now().date())
}

/// Validates `raw` for `field`, treating `today` as the current date.
///
/// Steps, short-circuiting on the first failure:
/// 1. required and blank → `MissingRequired`; optional and blank → `Empty`
/// 2. type coercion → `TypeMismatch`
/// 3. every present constraint → `ConstraintViolated`
pub fn validate_on(
    field: &Field,
    raw: &str,
    today: NaiveDate,
) -> Result<TypedValue, ValidationFailure> {
    if raw.trim().is_empty() {
        if field.required {
            return Err(ValidationFailure::MissingRequired {
                field_id: field.id.clone(),
            });
        }
        return Ok(TypedValue::Empty);
    }

    let value = coerce(field, raw).map_err(|reason| ValidationFailure::TypeMismatch {
        field_id: field.id.clone(),
        expected: field.field_type,
        reason,
    })?;

    if let Some(rules) = &field.validation {
        if let Some(constraint) = first_violation(rules, &value, today) {
            let message = rules
                .message
                .clone()
                .unwrap_or_else(|| constraint.default_message(&field.label));
            return Err(ValidationFailure::ConstraintViolated {
                field_id: field.id.clone(),
                constraint,
                message,
            });
        }
    }

    Ok(value)
}

/// Whole years between `born` and `today`; a birthday not yet reached this
/// year counts one less.
pub fn age_in_years(born: NaiveDate, today: NaiveDate) -> i32 {
    let mut years = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        years -= 1;
    }
    years
}

fn first_violation(
    rules: &ValidationRuleSet,
    value: &TypedValue,
    today: NaiveDate,
) -> Option<Constraint> {
    let text = value.canonical();
    let length = text.chars().count();

    if let Some(pattern) = &rules.pattern {
        if !pattern.is_match(&text) {
            return Some(Constraint::Pattern(pattern.as_str().to_string()));
        }
    }
    if let Some(min) = rules.min_length {
        if length < min {
            return Some(Constraint::MinLength(min));
        }
    }
    if let Some(max) = rules.max_length {
        if length > max {
            return Some(Constraint::MaxLength(max));
        }
    }

    if !rules.has_date_constraints() {
        return None;
    }

    // Date-relative constraints on a non-date value fail closed.
    let Some(date) = value.as_date() else {
        return [
            rules.min_age.map(Constraint::MinAge),
            rules.max_age.map(Constraint::MaxAge),
            rules.max_days_ago.map(Constraint::MaxDaysAgo),
            rules.min_days_from_now.map(Constraint::MinDaysFromNow),
        ]
        .into_iter()
        .flatten()
        .next();
    };

    let age = age_in_years(date, today);
    if let Some(min) = rules.min_age {
        if age < min as i32 {
            return Some(Constraint::MinAge(min));
        }
    }
    if let Some(max) = rules.max_age {
        if age > max as i32 {
            return Some(Constraint::MaxAge(max));
        }
    }

    if let Some(max) = rules.max_days_ago {
        let days_ago = today.signed_duration_since(date).num_days();
        if days_ago > max {
            return Some(Constraint::MaxDaysAgo(max));
        }
    }
    if let Some(min) = rules.min_days_from_now {
        let days_ahead = date.signed_duration_since(today).num_days();
        if days_ahead < min {
            return Some(Constraint::MinDaysFromNow(min));
        }
    }

    None
}
