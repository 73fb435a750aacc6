//! Template metadata and the review block shown before submission.

use serde::{Deserialize, Serialize};

/// Descriptive metadata of a form template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMetadata {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    /// Minutes.
    #[serde(default)]
    pub estimated_time: u32,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub language_support: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default)]
    pub checklists: Vec<Checklist>,
    pub submission_guidance: Option<String>,
    pub fee_info: Option<FeeInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub items: Vec<String>,
}

/// Fee schedule. Tiers are optional; forms without tiers use `standard`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeInfo {
    pub standard: Option<FeeDetail>,
    pub real_id: Option<FeeDetail>,
    pub enhanced: Option<FeeDetail>,
    #[serde(default)]
    pub additional_fees: Vec<AdditionalFee>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeDetail {
    /// Whole currency units.
    pub base: u32,
    pub currency: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalFee {
    pub name: String,
    /// Free-form, e.g. "$5" or "varies".
    pub amount: String,
    #[serde(default)]
    pub description: String,
}
