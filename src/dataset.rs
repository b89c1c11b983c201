//! Dataset snapshot loading and normalization.
//!
//! A snapshot is read once, every raw record is normalized into an
//! [`ActivityRecord`], and one [`ChapterSummary`] is derived per chapter.
//! The resulting [`Dataset`] is immutable; share it as `Arc<Dataset>` between
//! the query engine, the similarity finder and any request handlers.
//!
//! # Snapshot formats
//!
//! | Format | Layout |
//! |--------|--------|
//! | [`DatasetFormat::Json`] | a JSON array of record objects |
//! | [`DatasetFormat::JsonLines`] | one record object per non-blank line |
//!
//! # Degradation
//!
//! Missing or malformed fields never fail the load: text fields become empty,
//! the age becomes [`NO_AGE_CATEGORY`](crate::models::NO_AGE_CATEGORY), a
//! missing chapter becomes [`UNASSIGNED_CHAPTER`], and a missing embedding
//! becomes a zero vector. Only unreadable files, invalid JSON and embeddings
//! of conflicting dimensionality are errors.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::embedding::decode_embedding;
use crate::models::{
    value_to_text, ActivityRecord, ChapterSummary, RawActivity, UNASSIGNED_CHAPTER,
};
use crate::normalize::{
    clean_chapter_summary, extract_chapter_title, format_instructions, parse_tags,
    render_bullets, simplify_age,
};

/// On-disk layout of a dataset snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DatasetFormat {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "jsonl")]
    JsonLines,
}

impl DatasetFormat {
    /// Infer the format from a file extension (`.jsonl` / `.ndjson` are
    /// JSON Lines, everything else is a JSON array).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") => {
                DatasetFormat::JsonLines
            }
            _ => DatasetFormat::Json,
        }
    }
}

/// The loaded, normalized activity collection.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<ActivityRecord>,
    summaries: Vec<ChapterSummary>,
    summary_index: HashMap<String, usize>,
    dims: usize,
}

impl Dataset {
    /// Read and normalize the snapshot at `path`.
    pub fn load(path: &Path, format: DatasetFormat) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset snapshot: {}", path.display()))?;
        let raw = parse_snapshot(&content, format)
            .with_context(|| format!("Failed to parse dataset snapshot: {}", path.display()))?;
        let dataset = Self::from_raw(raw)?;

        info!(
            path = %path.display(),
            records = dataset.len(),
            chapters = dataset.summaries.len(),
            dims = dataset.dims,
            "loaded activity dataset"
        );
        Ok(dataset)
    }

    /// Normalize already-decoded raw records.
    ///
    /// Records keep their input order; a record's `id` is its index.
    pub fn from_raw(raw: Vec<RawActivity>) -> Result<Self> {
        let embeddings: Vec<Option<Vec<f32>>> = raw
            .iter()
            .map(|r| decode_embedding(r.embedding.as_ref()).filter(|v| !v.is_empty()))
            .collect();
        let dims = uniform_dims(&embeddings)?;

        let mut records = Vec::with_capacity(raw.len());
        let mut chapter_order: Vec<(String, Option<String>)> = Vec::new();
        let mut chapter_slots: HashMap<String, usize> = HashMap::new();

        for (id, (item, embedding)) in raw.into_iter().zip(embeddings).enumerate() {
            let chapter = value_to_text(item.chapter.as_ref())
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| UNASSIGNED_CHAPTER.to_string());

            let summary_text = value_to_text(item.chapter_summary.as_ref())
                .filter(|s| !s.trim().is_empty());
            match chapter_slots.get(&chapter) {
                Some(&slot) => {
                    let entry = &mut chapter_order[slot].1;
                    if entry.is_none() {
                        *entry = summary_text;
                    }
                }
                None => {
                    chapter_slots.insert(chapter.clone(), chapter_order.len());
                    chapter_order.push((chapter.clone(), summary_text));
                }
            }

            let embedding = embedding.unwrap_or_else(|| {
                warn!(record = id, "activity has no usable embedding; using a zero vector");
                vec![0.0; dims]
            });

            records.push(ActivityRecord {
                id,
                title: value_to_text(item.title.as_ref()).unwrap_or_default(),
                purpose: value_to_text(item.purpose.as_ref()).unwrap_or_default(),
                instructions: normalize_instructions(item.instructions.as_ref()),
                age_group: simplify_age(value_to_text(item.age_group.as_ref()).as_deref()),
                section: value_to_text(item.section.as_ref())
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
                tags: parse_tags(value_to_text(item.pyari_curriculum_tags.as_ref()).as_deref()),
                chapter,
                embedding,
            });
        }

        let summaries: Vec<ChapterSummary> = chapter_order
            .into_iter()
            .map(|(chapter, text)| build_summary(chapter, text.as_deref()))
            .collect();
        let summary_index = summaries
            .iter()
            .enumerate()
            .map(|(i, s)| (s.chapter.clone(), i))
            .collect();

        debug!(records = records.len(), dims, "normalized activity records");

        Ok(Self {
            records,
            summaries,
            summary_index,
            dims,
        })
    }

    /// All records in snapshot order.
    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    pub fn get(&self, id: usize) -> Option<&ActivityRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding dimensionality shared by every record (0 if none had one).
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Chapter summaries in order of each chapter's first appearance.
    pub fn chapter_summaries(&self) -> &[ChapterSummary] {
        &self.summaries
    }

    pub fn chapter_summary(&self, chapter: &str) -> Option<&ChapterSummary> {
        self.summary_index
            .get(chapter)
            .map(|&i| &self.summaries[i])
    }

    /// Display title for `chapter`, if the chapter exists.
    pub fn chapter_title(&self, chapter: &str) -> Option<&str> {
        self.chapter_summary(chapter).map(|s| s.title.as_str())
    }
}

/// Decode snapshot text into raw records.
pub fn parse_snapshot(content: &str, format: DatasetFormat) -> Result<Vec<RawActivity>> {
    match format {
        DatasetFormat::Json => serde_json::from_str(content)
            .context("snapshot must be a JSON array of activity records"),
        DatasetFormat::JsonLines => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("invalid activity record on line {}", i + 1))
            })
            .collect(),
    }
}

fn uniform_dims(embeddings: &[Option<Vec<f32>>]) -> Result<usize> {
    let mut dims = None;
    for (id, embedding) in embeddings.iter().enumerate() {
        let Some(v) = embedding else { continue };
        match dims {
            None => dims = Some(v.len()),
            Some(expected) if expected != v.len() => bail!(
                "record {} has a {}-dimensional embedding, expected {}",
                id,
                v.len(),
                expected
            ),
            Some(_) => {}
        }
    }
    Ok(dims.unwrap_or(0))
}

fn normalize_instructions(value: Option<&Value>) -> String {
    if let Some(Value::Array(items)) = value {
        let texts: Option<Vec<String>> = items
            .iter()
            .map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect();
        if let Some(texts) = texts {
            return render_bullets(&texts);
        }
    }
    value_to_text(value)
        .map(|text| format_instructions(&text))
        .unwrap_or_default()
}

fn build_summary(chapter: String, text: Option<&str>) -> ChapterSummary {
    let title = extract_chapter_title(text, &chapter);
    let paragraphs = text
        .map(|t| clean_chapter_summary(t, &title))
        .unwrap_or_default();
    ChapterSummary {
        chapter,
        title,
        paragraphs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NO_AGE_CATEGORY, UNTITLED_CHAPTER};
    use crate::normalize::OVERRIDE_CHAPTER_TITLE;
    use serde_json::json;
    use std::io::Write;

    fn raw(value: Value) -> RawActivity {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_from_raw_normalizes_fields() {
        let dataset = Dataset::from_raw(vec![raw(json!({
            "title": "Body map",
            "purpose": "Name body parts",
            "instructions": "['Draw an outline.', 'Label it.']",
            "age_group": "Ages 8 and up",
            "chapter": "Chapter 2",
            "section": " Bodies ",
            "pyari_curriculum_tags": "Puberty, Anatomy,",
            "chapter_summary": "CHAPTER 2 Bodies\nThis chapter is about bodies.",
            "embedding": [0.1, 0.2, 0.3]
        }))])
        .unwrap();

        let record = &dataset.records()[0];
        assert_eq!(record.id, 0);
        assert_eq!(record.title, "Body map");
        assert_eq!(record.instructions, "- Draw an outline.\n- Label it.");
        assert_eq!(record.age_group, "8+");
        assert_eq!(record.chapter, "Chapter 2");
        assert_eq!(record.section.as_deref(), Some("Bodies"));
        assert_eq!(
            record.tags.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Anatomy", "Puberty"]
        );
        assert_eq!(record.embedding, vec![0.1, 0.2, 0.3]);
        assert_eq!(dataset.dims(), 3);
        assert_eq!(dataset.chapter_title("Chapter 2"), Some("Bodies"));
    }

    #[test]
    fn test_from_raw_degrades_missing_fields() {
        let dataset = Dataset::from_raw(vec![
            raw(json!({"title": "Only a title", "embedding": [1.0, 0.0]})),
            raw(json!({"age_group": null, "section": "", "instructions": null})),
        ])
        .unwrap();

        let second = &dataset.records()[1];
        assert_eq!(second.title, "");
        assert_eq!(second.purpose, "");
        assert_eq!(second.instructions, "");
        assert_eq!(second.age_group, NO_AGE_CATEGORY);
        assert_eq!(second.chapter, UNASSIGNED_CHAPTER);
        assert_eq!(second.section, None);
        assert!(second.tags.is_empty());
        assert_eq!(second.embedding, vec![0.0, 0.0]);
        assert_eq!(dataset.chapter_title(UNASSIGNED_CHAPTER), Some(UNTITLED_CHAPTER));
    }

    #[test]
    fn test_from_raw_numeric_fields() {
        let dataset = Dataset::from_raw(vec![raw(json!({
            "age_group": 12,
            "chapter": 3,
            "section": 1,
            "instructions": ["Warm up", 2]
        }))])
        .unwrap();
        let record = &dataset.records()[0];
        assert_eq!(record.age_group, "12+");
        assert_eq!(record.chapter, "3");
        assert_eq!(record.section.as_deref(), Some("1"));
        assert_eq!(record.instructions, "- Warm up\n- 2");
    }

    #[test]
    fn test_from_raw_rejects_mixed_dimensions() {
        let err = Dataset::from_raw(vec![
            raw(json!({"embedding": [1.0, 0.0]})),
            raw(json!({"embedding": [1.0, 0.0, 0.0]})),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("record 1 has a 3-dimensional embedding"));
    }

    #[test]
    fn test_from_raw_invalid_embedding_zero_filled() {
        let dataset = Dataset::from_raw(vec![
            raw(json!({"embedding": ["a", "b"]})),
            raw(json!({"embedding": [0.5, 0.5]})),
            raw(json!({"embedding": []})),
        ])
        .unwrap();
        assert_eq!(dataset.dims(), 2);
        assert_eq!(dataset.records()[0].embedding, vec![0.0, 0.0]);
        assert_eq!(dataset.records()[2].embedding, vec![0.0, 0.0]);
    }

    #[test]
    fn test_chapter_summary_uses_first_non_empty_text() {
        let dataset = Dataset::from_raw(vec![
            raw(json!({"chapter": "Chapter 9", "chapter_summary": "  "})),
            raw(json!({"chapter": "Chapter 1"})),
            raw(json!({
                "chapter": "Chapter 9",
                "chapter_summary": "Sexual health\nCHAPTER 9 Sexual health\n\nThis chapter covers STIs.\n261"
            })),
            raw(json!({"chapter": "Chapter 9", "chapter_summary": "CHAPTER 9 Something else"})),
            raw(json!({"chapter": "Chapter 4", "chapter_summary": "Gender and sexual\nequality\n\nNorms."})),
        ])
        .unwrap();

        let chapters: Vec<&str> = dataset
            .chapter_summaries()
            .iter()
            .map(|s| s.chapter.as_str())
            .collect();
        assert_eq!(chapters, vec!["Chapter 9", "Chapter 1", "Chapter 4"]);

        let nine = dataset.chapter_summary("Chapter 9").unwrap();
        assert_eq!(nine.title, "Sexual health");
        assert_eq!(nine.paragraphs, vec!["This chapter covers STIs.".to_string()]);

        let one = dataset.chapter_summary("Chapter 1").unwrap();
        assert_eq!(one.title, UNTITLED_CHAPTER);
        assert!(one.paragraphs.is_empty());

        let four = dataset.chapter_summary("Chapter 4").unwrap();
        assert_eq!(four.title, OVERRIDE_CHAPTER_TITLE);
        assert_eq!(
            four.paragraphs,
            vec!["Gender and sexual".to_string(), "Norms.".to_string()]
        );

        assert!(dataset.chapter_summary("Chapter 7").is_none());
    }

    #[test]
    fn test_parse_snapshot_json_lines() {
        let content = "{\"title\": \"A\"}\n\n{\"title\": \"B\"}\n";
        let raw = parse_snapshot(content, DatasetFormat::JsonLines).unwrap();
        assert_eq!(raw.len(), 2);

        let err = parse_snapshot("{\"title\": \"A\"}\n{oops", DatasetFormat::JsonLines).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_snapshot_requires_array() {
        assert!(parse_snapshot("{\"title\": \"A\"}", DatasetFormat::Json).is_err());
        assert!(parse_snapshot("[]", DatasetFormat::Json).unwrap().is_empty());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(DatasetFormat::from_path(Path::new("a.jsonl")), DatasetFormat::JsonLines);
        assert_eq!(DatasetFormat::from_path(Path::new("a.NDJSON")), DatasetFormat::JsonLines);
        assert_eq!(DatasetFormat::from_path(Path::new("a.json")), DatasetFormat::Json);
        assert_eq!(DatasetFormat::from_path(Path::new("snapshot")), DatasetFormat::Json);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"title": "Circle time", "chapter": "Chapter 1", "embedding": [1, 0]}}]"#
        )
        .unwrap();

        let dataset = Dataset::load(file.path(), DatasetFormat::Json).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.get(0).unwrap().title, "Circle time");
        assert!(dataset.get(1).is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Dataset::load(Path::new("/nonexistent/activities.json"), DatasetFormat::Json)
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read dataset snapshot"));
    }
}
