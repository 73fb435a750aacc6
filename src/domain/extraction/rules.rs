//! Deterministic keyword and pattern heuristics.
//!
//! Two passes over the utterance:
//!
//! 1. Keyword hits. Every field contributes phrases (its label, its id split
//!    into words, plus synonyms for common concepts). A hit proposes the text
//!    that follows it, up to the next hit or sentence end.
//! 2. The prompted field. If no hit covered it, the uncovered text is scanned
//!    for a value of the field's type. With no keyword hits at all, the whole
//!    utterance is taken as the answer.
//!
//! A keyword of the prompted field that follows other words ("123 Main
//! Street") is part of the answer, not a marker, and is not treated as a hit.

use once_cell::sync::Lazy;
use regex::Regex;

use super::request::{ExtractionRequest, ExtractionResult};
use crate::domain::template::{Field, FieldType};
use crate::domain::validation::parse_bool;

static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2}/\d{1,2}/\d{4}|\d{4}-\d{1,2}-\d{1,2}|\d{1,2}-\d{1,2}-\d{4})\b")
        .expect("date regex")
});
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?\d[\d,]*(\.\d+)?").expect("number regex"));
static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email regex")
});
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\(?\d[\d\s().-]{5,}\d").expect("phone regex"));

/// Extra phrases for concepts users rarely name the way forms do.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("address", &["address", "street", "live at", "reside at"]),
    ("email", &["email", "e-mail"]),
    ("phone", &["phone", "cell", "mobile"]),
    ("birth", &["born on", "birthday", "dob"]),
    ("zip", &["zip", "postal code"]),
];

/// Words skipped between a keyword and its value.
const CONNECTORS: &[&str] = &["is", "are", "was", "at", "to", "of", "on", "my", "it's", "its"];

/// Words that may precede a keyword used as a marker ("I live at", "my email").
const LEAD_INS: &[&str] = &["i", "i'm", "we", "our", "the", "and", "also"];

const AFFIRMATIVE: &[&str] = &["yes", "yeah", "yep", "true", "y", "sure"];
const NEGATIVE: &[&str] = &["no", "nope", "false", "n", "never"];

#[derive(Debug, Clone, Copy)]
struct Hit<'t> {
    field: &'t Field,
    start: usize,
    end: usize,
}

/// Keyword/pattern extractor shared by the rule and retrieval tiers.
#[derive(Debug, Clone, Default)]
pub struct RuleExtractor;

impl RuleExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, request: &ExtractionRequest) -> ExtractionResult {
        let utterance = request.utterance.trim();
        let mut result = ExtractionResult::empty();

        if !utterance.is_empty() {
            let lower = utterance.to_ascii_lowercase();
            let prompted = request.prompted_field();
            let mut hits = keyword_hits(request.template.fields(), &lower);
            let embedded = drop_embedded_hit(&mut hits, prompted, &lower);
            let mut covered = Vec::with_capacity(hits.len());

            for (i, hit) in hits.iter().enumerate() {
                let limit = hits.get(i + 1).map_or(utterance.len(), |next| next.start);
                let (value_start, value_end) = value_span(utterance, &lower, hit.end, limit);
                covered.push((hit.start, value_end.max(hit.end)));

                let segment = &utterance[value_start..value_end];
                if let Some(value) = typed_value(hit.field, segment).or_else(|| non_empty(segment)) {
                    result = result.with_update(&hit.field.id, value);
                }
            }

            if let Some(prompted) = prompted {
                let already = result.updates.iter().any(|u| u.field_id == prompted.id);
                if !already {
                    let uncovered = uncovered_text(utterance, &covered);
                    let leading = || {
                        let limit = hits.first().map_or(utterance.len(), |h| h.start);
                        let (start, end) = value_span(utterance, &lower, 0, limit);
                        non_empty(&utterance[start..end])
                    };
                    let direct = typed_value(prompted, &uncovered)
                        .or_else(|| if embedded { leading() } else { None })
                        .or_else(|| hits.is_empty().then(|| utterance.to_string()));
                    if let Some(value) = direct {
                        result = result.with_update(&prompted.id, value);
                    }
                }
            }
        }

        let top = request
            .context
            .iter()
            .reduce(|best, s| if s.similarity > best.similarity { s } else { best });
        if let Some(snippet) = top {
            result = result.with_note(format!("See also ({}): {}", snippet.source, snippet.text));
        }

        result
    }
}

fn phrases(field: &Field) -> Vec<String> {
    let mut out = vec![field.label.trim().to_ascii_lowercase()];

    let mut split = String::new();
    for c in field.id.chars() {
        if c == '_' || c == '-' {
            split.push(' ');
        } else if c.is_ascii_uppercase() {
            split.push(' ');
            split.push(c.to_ascii_lowercase());
        } else {
            split.push(c);
        }
    }
    out.push(split.split_whitespace().collect::<Vec<_>>().join(" "));

    let base = out.clone();
    for (concept, extra) in SYNONYMS {
        if base.iter().any(|p| p.contains(concept)) {
            out.extend(extra.iter().map(|s| s.to_string()));
        }
    }

    out.retain(|p| p.len() >= 3);
    out.sort_by(|a, b| b.len().cmp(&a.len()));
    out.dedup();
    out
}

fn is_boundary(text: &str, index: usize) -> bool {
    let before = text[..index].chars().next_back();
    before.map_or(true, |c| !c.is_alphanumeric())
}

fn is_end_boundary(text: &str, index: usize) -> bool {
    text[index..].chars().next().map_or(true, |c| !c.is_alphanumeric())
}

/// Whole-word occurrences of `needle` in `haystack`.
fn find_words<'h>(haystack: &'h str, needle: &'h str) -> impl Iterator<Item = (usize, usize)> + 'h {
    haystack
        .match_indices(needle)
        .map(move |(start, m)| (start, start + m.len()))
        .filter(move |(start, end)| is_boundary(haystack, *start) && is_end_boundary(haystack, *end))
}

/// Non-overlapping keyword hits ordered by position. Earlier fields win ties;
/// longer phrases win at the same position.
fn keyword_hits<'t>(fields: impl Iterator<Item = &'t Field>, lower: &str) -> Vec<Hit<'t>> {
    let mut candidates: Vec<Hit<'t>> = Vec::new();
    for field in fields {
        let first = phrases(field)
            .iter()
            .flat_map(|p| find_words(lower, p).collect::<Vec<_>>())
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        if let Some((start, end)) = first {
            candidates.push(Hit { field, start, end });
        }
    }

    // Stable sort keeps document order for equal positions.
    candidates.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut hits: Vec<Hit<'t>> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if hits.last().map_or(true, |prev| candidate.start >= prev.end) {
            hits.push(candidate);
        }
    }
    hits
}

/// Removes a hit on the prompted field whose keyword sits inside the answer,
/// i.e. is preceded by something other than lead-in words. Returns true if
/// one was removed.
fn drop_embedded_hit(hits: &mut Vec<Hit<'_>>, prompted: Option<&Field>, lower: &str) -> bool {
    let Some(prompted) = prompted else {
        return false;
    };
    let mut previous_end = 0;
    let position = hits.iter().position(|hit| {
        let prefix = &lower[previous_end..hit.start];
        previous_end = hit.end;
        hit.field.id == prompted.id && !only_lead_ins(prefix)
    });
    match position {
        Some(index) => {
            hits.remove(index);
            true
        }
        None => false,
    }
}

fn only_lead_ins(text: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .all(|w| LEAD_INS.contains(&w) || CONNECTORS.contains(&w))
}

/// Span of the value following a keyword: connectors skipped, cut at the
/// next sentence break or `limit`.
fn value_span(utterance: &str, lower: &str, from: usize, limit: usize) -> (usize, usize) {
    let mut start = from;
    loop {
        let rest = &lower[start..limit];
        let trimmed = rest.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '=' | '-' | ','));
        start += rest.len() - trimmed.len();

        let connector = CONNECTORS.iter().find(|w| {
            trimmed.starts_with(*w) && is_end_boundary(trimmed, w.len())
        });
        match connector {
            Some(w) => start += w.len(),
            None => break,
        }
    }

    let window = &utterance[start..limit];
    let mut end = limit;
    for (i, c) in window.char_indices() {
        let sentence_break = matches!(c, ';' | '\n' | '!' | '?')
            || (c == '.' && window[i + 1..].starts_with(char::is_whitespace));
        if sentence_break {
            end = start + i;
            break;
        }
    }

    let value = &utterance[start..end];
    let trimmed = trim_tail(value);
    (start, start + trimmed.len())
}

fn trim_tail(value: &str) -> &str {
    let mut v = value.trim_end();
    loop {
        let before = v;
        v = v.trim_end_matches(|c: char| matches!(c, ',' | '.' | ' '));
        let lower = v.to_ascii_lowercase();
        if lower.ends_with(" and") {
            v = &v[..v.len() - 4];
        }
        if v == before {
            return v;
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

fn uncovered_text(utterance: &str, covered: &[(usize, usize)]) -> String {
    let mut parts = Vec::new();
    let mut cursor = 0;
    for &(start, end) in covered {
        if start > cursor {
            parts.push(&utterance[cursor..start]);
        }
        cursor = cursor.max(end);
    }
    if cursor < utterance.len() {
        parts.push(&utterance[cursor..]);
    }
    parts.join(" ")
}

/// A value of the field's type found in `text`, if any. Text fields never
/// match here; they only take explicit segments.
fn typed_value(field: &Field, text: &str) -> Option<String> {
    match field.field_type {
        FieldType::Date => DATE.find(text).map(|m| m.as_str().to_string()),
        FieldType::Number => NUMBER.find(text).map(|m| m.as_str().to_string()),
        FieldType::Email => EMAIL.find(text).map(|m| m.as_str().to_string()),
        FieldType::Phone => PHONE
            .find_iter(text)
            .map(|m| m.as_str())
            .find(|s| (7..=15).contains(&s.chars().filter(char::is_ascii_digit).count()))
            .map(str::to_string),
        FieldType::Choice => {
            let lower = text.to_ascii_lowercase();
            let mut options: Vec<&String> = field.options.iter().collect();
            options.sort_by(|a, b| b.len().cmp(&a.len()));
            options
                .into_iter()
                .find(|o| find_words(&lower, &o.to_ascii_lowercase()).next().is_some())
                .cloned()
        }
        FieldType::Boolean => {
            if let Some(b) = parse_bool(text) {
                return Some(if b { "yes" } else { "no" }.to_string());
            }
            text.split(|c: char| !c.is_alphanumeric() && c != '\'')
                .map(str::to_ascii_lowercase)
                .find_map(|w| {
                    if AFFIRMATIVE.contains(&w.as_str()) {
                        Some("yes".to_string())
                    } else if NEGATIVE.contains(&w.as_str()) {
                        Some("no".to_string())
                    } else {
                        None
                    }
                })
        }
        FieldType::Text => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::AnswerMap;
    use crate::domain::extraction::{ProposedUpdate, RetrievedSnippet};
    use crate::domain::template::Template;
    use std::sync::Arc;

    fn template() -> Arc<Template> {
        let doc = serde_json::json!({
            "metadata": {"id": "t", "name": "T", "version": "1"},
            "schema": {"sections": [{"id": "s", "title": "S", "fields": [
                {"id": "dateOfBirth", "label": "Date of birth", "type": "date"},
                {"id": "homeAddress", "label": "Home address", "type": "text"},
                {"id": "email", "label": "Email", "type": "email"},
                {"id": "dependents", "label": "Number of dependents", "type": "number"},
                {"id": "visaType", "label": "Visa type", "type": "choice", "options": ["B1", "B1/B2", "F1"]},
                {"id": "married", "label": "Married", "type": "boolean"},
                {"id": "nickname", "label": "Nickname", "type": "text"}
            ]}]},
            "conversationFlow": {"steps": [
                {"id": "dob", "title": "Birth", "expectedFields": ["dateOfBirth"]},
                {"id": "home", "title": "Home", "expectedFields": ["homeAddress"]},
                {"id": "family", "title": "Family", "expectedFields": ["dependents", "married"]},
                {"id": "visa", "title": "Visa", "expectedFields": ["visaType"]},
                {"id": "nick", "title": "Nick", "expectedFields": ["nickname"]}
            ]}
        });
        Arc::new(Template::parse(doc.to_string().as_bytes()).unwrap())
    }

    fn extract(step: &str, utterance: &str) -> ExtractionResult {
        let request = ExtractionRequest::new(template(), step, AnswerMap::new(), utterance).unwrap();
        RuleExtractor::new().extract(&request)
    }

    mod keywords {
        use super::*;

        #[test]
        fn address_keyword_proposes_address_field() {
            let result = extract("dob", "My address is 12 Main St, Austin TX");
            assert_eq!(
                result.updates,
                vec![ProposedUpdate::new("homeAddress", "12 Main St, Austin TX")]
            );
        }

        #[test]
        fn synonym_phrases_match() {
            let result = extract("home", "I live at 4 Elm Rd.");
            assert_eq!(result.updates, vec![ProposedUpdate::new("homeAddress", "4 Elm Rd")]);
        }

        #[test]
        fn multiple_keywords_split_the_utterance() {
            let result = extract("dob", "email is ada@example.com and date of birth 12/10/1815");
            assert_eq!(
                result.updates,
                vec![
                    ProposedUpdate::new("email", "ada@example.com"),
                    ProposedUpdate::new("dateOfBirth", "12/10/1815"),
                ]
            );
        }

        #[test]
        fn trailing_keyword_is_part_of_prompted_answer() {
            let result = extract("home", "123 Main Street");
            assert_eq!(result.updates, vec![ProposedUpdate::new("homeAddress", "123 Main Street")]);
        }

        #[test]
        fn inner_keyword_does_not_split_prompted_answer() {
            let result = extract("home", "42 Oak Street, Austin TX");
            assert_eq!(
                result.updates,
                vec![ProposedUpdate::new("homeAddress", "42 Oak Street, Austin TX")]
            );
        }

        #[test]
        fn inner_keyword_answer_stops_at_other_field_keyword() {
            let result = extract("home", "42 Oak Street. My email is ada@example.com");
            assert_eq!(
                result.updates,
                vec![
                    ProposedUpdate::new("email", "ada@example.com"),
                    ProposedUpdate::new("homeAddress", "42 Oak Street"),
                ]
            );
        }

        #[test]
        fn keywords_need_word_boundaries() {
            // "emails" is not the "email" keyword.
            let result = extract("nick", "I never read emails");
            assert_eq!(result.updates, vec![ProposedUpdate::new("nickname", "I never read emails")]);
        }
    }

    mod prompted_field {
        use super::*;

        #[test]
        fn finds_date_in_sentence() {
            let result = extract("dob", "I was born 01/15/1990 in Ohio");
            assert_eq!(result.updates, vec![ProposedUpdate::new("dateOfBirth", "01/15/1990")]);
        }

        #[test]
        fn bare_answer_goes_to_prompted_field() {
            let result = extract("dob", "01/15/1990");
            assert_eq!(result.updates, vec![ProposedUpdate::new("dateOfBirth", "01/15/1990")]);
        }

        #[test]
        fn unrecognized_answer_is_passed_through_for_validation() {
            let result = extract("dob", "last spring");
            assert_eq!(result.updates, vec![ProposedUpdate::new("dateOfBirth", "last spring")]);
        }

        #[test]
        fn number_and_boolean_detection() {
            assert_eq!(
                extract("family", "we have 3 kids").updates,
                vec![ProposedUpdate::new("dependents", "3")]
            );
        }

        #[test]
        fn choice_prefers_longest_option() {
            let result = extract("visa", "I applied for a b1/b2 visa");
            assert_eq!(result.updates, vec![ProposedUpdate::new("visaType", "B1/B2")]);
        }

        #[test]
        fn keyword_for_other_field_suppresses_direct_answer() {
            let result = extract("nick", "my email is ada@example.com");
            assert_eq!(result.updates, vec![ProposedUpdate::new("email", "ada@example.com")]);
        }

        #[test]
        fn empty_utterance_proposes_nothing() {
            assert!(extract("dob", "   ").updates.is_empty());
        }
    }

    mod context_notes {
        use super::*;

        #[test]
        fn best_snippet_becomes_note() {
            let request = ExtractionRequest::new(template(), "dob", AnswerMap::new(), "01/15/1990")
                .unwrap()
                .with_context(vec![
                    RetrievedSnippet::new("Use your passport date.", "faq", 0.4),
                    RetrievedSnippet::new("Format is MM/DD/YYYY.", "guide", 0.9),
                ]);
            let result = RuleExtractor::new().extract(&request);
            assert_eq!(result.notes, vec!["See also (guide): Format is MM/DD/YYYY."]);
        }
    }

    #[test]
    fn boolean_words() {
        let field = Field::new("married", "Married", FieldType::Boolean);
        assert_eq!(typed_value(&field, "yeah, since 2010"), Some("yes".into()));
        assert_eq!(typed_value(&field, "Nope"), Some("no".into()));
        assert_eq!(typed_value(&field, "it's complicated"), None);
    }

    #[test]
    fn phone_detection_counts_digits() {
        let field = Field::new("phone", "Phone", FieldType::Phone);
        assert_eq!(typed_value(&field, "call (512) 555-0100 today"), Some("(512) 555-0100".into()));
        assert_eq!(typed_value(&field, "room 12-34"), None);
    }
}
