//! Core data models used throughout the activity browser.
//!
//! [`RawActivity`] is the shape of one record in the dataset snapshot, as
//! produced by the upstream embedding pipeline. The loader turns each one into
//! a normalized [`ActivityRecord`]; per-chapter summaries are derived once into
//! [`ChapterSummary`] values.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Age label used when the raw age field is missing or carries no digits.
pub const NO_AGE_CATEGORY: &str = "No specific category";

/// Chapter title used when no rule can extract one.
pub const UNTITLED_CHAPTER: &str = "Untitled";

/// Chapter id assigned to records whose snapshot entry has no chapter.
pub const UNASSIGNED_CHAPTER: &str = "Unassigned";

/// Raw record as stored in the snapshot, before normalization.
///
/// Every field is optional and loosely typed so that malformed entries
/// degrade to sentinels instead of failing the whole load.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawActivity {
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub purpose: Option<Value>,
    #[serde(default)]
    pub instructions: Option<Value>,
    #[serde(default)]
    pub age_group: Option<Value>,
    #[serde(default)]
    pub chapter: Option<Value>,
    #[serde(default)]
    pub section: Option<Value>,
    #[serde(default)]
    pub pyari_curriculum_tags: Option<Value>,
    #[serde(default)]
    pub chapter_summary: Option<Value>,
    #[serde(default)]
    pub embedding: Option<Value>,
}

/// A normalized activity. Immutable once the dataset is loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
    /// Zero-based position in the snapshot; the record's identity.
    pub id: usize,
    pub title: String,
    pub purpose: String,
    /// Bulleted, newline-joined when the raw value was a list.
    pub instructions: String,
    /// Canonical label such as `"8+"`, or [`NO_AGE_CATEGORY`].
    pub age_group: String,
    pub chapter: String,
    pub section: Option<String>,
    pub tags: BTreeSet<String>,
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

impl ActivityRecord {
    /// Whether the record carries at least one of `selected`.
    pub fn has_any_tag(&self, selected: &BTreeSet<String>) -> bool {
        selected.iter().any(|t| self.tags.contains(t))
    }
}

/// Display title and cleaned body for one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterSummary {
    pub chapter: String,
    pub title: String,
    pub paragraphs: Vec<String>,
}

/// Render a loosely typed snapshot value as text.
///
/// `null` is treated as missing. Numbers and booleans are rendered the way
/// they appear in JSON; nested structures fall back to their JSON encoding.
pub fn value_to_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}
