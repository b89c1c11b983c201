//! "Similar activities" via exact nearest-neighbor search on embeddings.
//!
//! Every query scans the whole dataset (O(N·D)); at this data scale no
//! approximate index is needed.
//!
//! # Ranking
//!
//! 1. Score every other record by cosine similarity to the query record.
//! 2. Stable-sort by score, descending, so equal scores keep dataset order.
//! 3. Truncate to `k`.

use std::sync::Arc;
use tracing::debug;

use crate::dataset::Dataset;
use crate::embedding::cosine_similarity;
use crate::models::ActivityRecord;

/// Number of similar activities returned when the caller does not choose.
pub const DEFAULT_TOP_K: usize = 3;

/// One ranked neighbor.
#[derive(Debug, Clone)]
pub struct SimilarActivity<'a> {
    pub record: &'a ActivityRecord,
    pub score: f32,
}

/// Nearest-neighbor lookup over a shared dataset.
#[derive(Debug, Clone)]
pub struct SimilarityFinder {
    dataset: Arc<Dataset>,
    default_k: usize,
}

impl SimilarityFinder {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self::with_default_k(dataset, DEFAULT_TOP_K)
    }

    pub fn with_default_k(dataset: Arc<Dataset>, default_k: usize) -> Self {
        Self { dataset, default_k }
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// The `k` records most similar to `record`, best first.
    ///
    /// `record` itself (matched by id) is never part of the result. Fewer
    /// than `k` results come back when the dataset is smaller.
    pub fn top_similar(&self, record: &ActivityRecord, k: usize) -> Vec<SimilarActivity<'_>> {
        if k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<SimilarActivity<'_>> = self
            .dataset
            .records()
            .iter()
            .filter(|other| other.id != record.id)
            .map(|other| SimilarActivity {
                record: other,
                score: cosine_similarity(&record.embedding, &other.embedding),
            })
            .collect();

        // `sort_by` is stable: ties stay in dataset order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);

        debug!(record = record.id, k, returned = scored.len(), "ranked similar activities");
        scored
    }

    /// [`top_similar`](Self::top_similar) with the configured default `k`.
    pub fn top_similar_default(&self, record: &ActivityRecord) -> Vec<SimilarActivity<'_>> {
        self.top_similar(record, self.default_k)
    }

    /// Look up a record by id and rank its neighbors; `None` for unknown ids.
    pub fn top_similar_by_id(&self, id: usize, k: usize) -> Option<Vec<SimilarActivity<'_>>> {
        let record = self.dataset.get(id)?;
        Some(self.top_similar(record, k))
    }
}
