//! Raw string to typed value coercion, one rule per field type.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use super::TypedValue;
use crate::domain::template::{Field, FieldType};

/// Accepted date spellings, tried in order.
const DATE_FORMATS: [&str; 3] = ["%m/%d/%Y", "%Y-%m-%d", "%m-%d-%Y"];

/// Two-digit years would otherwise parse as the first century.
const MIN_YEAR: i32 = 1000;

const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Parses any accepted date spelling.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .filter(|d| d.year() >= MIN_YEAR)
}

/// Parses a number, tolerating grouping commas and a currency sign.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" => Some(true),
        "no" | "n" | "false" => Some(false),
        _ => None,
    }
}

fn parse_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let international = trimmed.starts_with('+');
    let body = trimmed.trim_start_matches('+');

    let mut digits = String::with_capacity(body.len());
    for c in body.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '(' | ')' | '.' => {}
            _ => return None,
        }
    }

    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len()) {
        return None;
    }
    Some(if international { format!("+{}", digits) } else { digits })
}

fn match_option(field: &Field, raw: &str) -> Option<String> {
    let wanted = raw.trim();
    field
        .options
        .iter()
        .find(|opt| opt.trim().eq_ignore_ascii_case(wanted))
        .cloned()
}

/// Coerces a non-empty raw string per the field's type.
///
/// Returns a human-readable reason on mismatch.
pub fn coerce(field: &Field, raw: &str) -> Result<TypedValue, String> {
    let trimmed = raw.trim();
    match field.field_type {
        FieldType::Text => Ok(TypedValue::Text(trimmed.to_string())),
        FieldType::Date => parse_date(trimmed)
            .map(TypedValue::Date)
            .ok_or_else(|| "expected a date like MM/DD/YYYY".to_string()),
        FieldType::Number => parse_number(trimmed)
            .map(TypedValue::Number)
            .ok_or_else(|| "expected a number".to_string()),
        FieldType::Choice => match_option(field, trimmed)
            .map(TypedValue::Choice)
            .ok_or_else(|| format!("expected one of: {}", field.options.join(", "))),
        FieldType::Boolean => parse_bool(trimmed)
            .map(TypedValue::Boolean)
            .ok_or_else(|| "expected yes or no".to_string()),
        FieldType::Email => {
            if EMAIL.is_match(trimmed) {
                Ok(TypedValue::Email(trimmed.to_string()))
            } else {
                Err("expected an email address".to_string())
            }
        }
        FieldType::Phone => parse_phone(trimmed)
            .map(TypedValue::Phone)
            .ok_or_else(|| "expected a phone number".to_string()),
    }
}
