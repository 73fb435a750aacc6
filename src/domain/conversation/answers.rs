//! The session's accumulated, validated answers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::validation::TypedValue;

/// Field id → validated value.
///
/// Only the conversation session writes to it; tiers see read-only clones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<String, TypedValue>);

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field_id: &str) -> Option<&TypedValue> {
        self.0.get(field_id)
    }

    pub fn is_answered(&self, field_id: &str) -> bool {
        self.0.contains_key(field_id)
    }

    /// Sets a value, returning the one it replaced.
    pub fn insert(&mut self, field_id: impl Into<String>, value: TypedValue) -> Option<TypedValue> {
        self.0.insert(field_id.into(), value)
    }

    pub fn remove(&mut self, field_id: &str) -> Option<TypedValue> {
        self.0.remove(field_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in field id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, TypedValue)> for AnswerMap {
    fn from_iter<I: IntoIterator<Item = (String, TypedValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
