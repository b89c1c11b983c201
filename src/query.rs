//! Filtering and hierarchical browsing over a loaded [`Dataset`].
//!
//! All queries are stable: results keep the dataset's original relative
//! order. Criteria in an [`ActivityFilter`] combine conjunctively, except the
//! tag set, which matches a record carrying *any* of the selected tags.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::dataset::Dataset;
use crate::models::{ActivityRecord, ChapterSummary};

/// Age-group criterion: a wildcard, or one canonical label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AgeFilter {
    #[default]
    All,
    Exact(String),
}

impl AgeFilter {
    /// Parse front-end input; `"All"` (any case) or blank means no filter.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            AgeFilter::All
        } else {
            AgeFilter::Exact(trimmed.to_string())
        }
    }

    fn matches(&self, record: &ActivityRecord) -> bool {
        match self {
            AgeFilter::All => true,
            AgeFilter::Exact(label) => record.age_group == *label,
        }
    }
}

/// Filter criteria collected from the front-end.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub age_group: AgeFilter,
    /// Empty means no tag filter.
    pub tags: BTreeSet<String>,
    /// Blank or `None` means no keyword filter.
    pub keyword: Option<String>,
}

impl ActivityFilter {
    /// Whether any criterion is set.
    pub fn is_active(&self) -> bool {
        self.age_group != AgeFilter::All || !self.tags.is_empty() || self.keyword_lower().is_some()
    }

    fn keyword_lower(&self) -> Option<String> {
        self.keyword
            .as_deref()
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase)
    }
}

/// Read-only query API over a shared dataset.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    dataset: Arc<Dataset>,
}

impl QueryEngine {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Records matching every criterion in `filter`, in dataset order.
    ///
    /// An inactive filter returns every record.
    pub fn filter(&self, filter: &ActivityFilter) -> Vec<&ActivityRecord> {
        let keyword = filter.keyword_lower();
        let results: Vec<&ActivityRecord> = self
            .dataset
            .records()
            .iter()
            .filter(|r| filter.age_group.matches(r))
            .filter(|r| filter.tags.is_empty() || r.has_any_tag(&filter.tags))
            .filter(|r| keyword.as_deref().map_or(true, |k| keyword_matches(r, k)))
            .collect();

        debug!(
            matched = results.len(),
            total = self.dataset.len(),
            "applied activity filter"
        );
        results
    }

    /// `(chapter_id, display title)` pairs sorted by title, then chapter id.
    pub fn chapters_and_titles(&self) -> Vec<(&str, &str)> {
        let mut chapters: Vec<(&str, &str)> = self
            .dataset
            .chapter_summaries()
            .iter()
            .map(|s| (s.chapter.as_str(), s.title.as_str()))
            .collect();
        chapters.sort_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(b.0)));
        chapters
    }

    /// Sorted, distinct section ids used within `chapter`.
    pub fn sections_of(&self, chapter: &str) -> Vec<&str> {
        self.dataset
            .records()
            .iter()
            .filter(|r| r.chapter == chapter)
            .filter_map(|r| r.section.as_deref())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Records in `chapter` / `section`, in dataset order.
    pub fn activities_in(&self, chapter: &str, section: &str) -> Vec<&ActivityRecord> {
        self.dataset
            .records()
            .iter()
            .filter(|r| r.chapter == chapter && r.section.as_deref() == Some(section))
            .collect()
    }

    pub fn chapter_summary(&self, chapter: &str) -> Option<&ChapterSummary> {
        self.dataset.chapter_summary(chapter)
    }

    /// Sorted, distinct canonical age labels.
    pub fn age_groups(&self) -> Vec<&str> {
        self.dataset
            .records()
            .iter()
            .map(|r| r.age_group.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted, distinct tags across the dataset.
    pub fn all_tags(&self) -> Vec<&str> {
        self.dataset
            .records()
            .iter()
            .flat_map(|r| r.tags.iter().map(String::as_str))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn keyword_matches(record: &ActivityRecord, keyword_lower: &str) -> bool {
    [&record.title, &record.purpose, &record.instructions]
        .iter()
        .any(|field| field.to_lowercase().contains(keyword_lower))
}
