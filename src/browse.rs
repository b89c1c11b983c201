//! Terminal rendering for the `pyari` commands.
//!
//! Each `run_*` function backs one CLI command. They write to any
//! [`Write`] sink so the output can be captured in tests; the binary passes
//! stdout.

use anyhow::{bail, Result};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;

use crate::config::Config;
use crate::dataset::Dataset;
use crate::models::ActivityRecord;
use crate::query::{ActivityFilter, QueryEngine};
use crate::similar::{SimilarActivity, SimilarityFinder};

/// The query engine and similarity finder over one loaded dataset.
#[derive(Debug, Clone)]
pub struct Browser {
    engine: QueryEngine,
    finder: SimilarityFinder,
}

impl Browser {
    pub fn new(dataset: Arc<Dataset>, top_k: usize) -> Self {
        Self {
            engine: QueryEngine::new(dataset.clone()),
            finder: SimilarityFinder::with_default_k(dataset, top_k),
        }
    }

    /// Load the configured snapshot.
    pub fn open(config: &Config) -> Result<Self> {
        let dataset = Dataset::load(&config.dataset.path, config.dataset.resolved_format())?;
        Ok(Self::new(Arc::new(dataset), config.similarity.top_k))
    }

    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    pub fn finder(&self) -> &SimilarityFinder {
        &self.finder
    }

    /// Resolve a chapter given by id or by display title (any case).
    ///
    /// An id always wins. A title shared by several chapters is an error;
    /// those chapters can only be selected by id.
    pub fn resolve_chapter(&self, input: &str) -> Result<&str> {
        let input = input.trim();
        let chapters = self.engine.chapters_and_titles();
        if let Some((id, _)) = chapters.iter().find(|(id, _)| *id == input) {
            return Ok(*id);
        }

        let by_title: Vec<&str> = chapters
            .iter()
            .filter(|(_, title)| title.eq_ignore_ascii_case(input))
            .map(|(id, _)| *id)
            .collect();
        match by_title.as_slice() {
            [] => bail!("chapter not found: {}", input),
            [id] => Ok(*id),
            ids => bail!(
                "ambiguous chapter title: {} (matches {}); use a chapter id",
                input,
                ids.join(", ")
            ),
        }
    }
}

#[derive(Serialize)]
struct ActivityView<'a> {
    #[serde(flatten)]
    record: &'a ActivityRecord,
    similar: Vec<SimilarView<'a>>,
}

#[derive(Serialize)]
struct SimilarView<'a> {
    id: usize,
    title: &'a str,
    purpose: &'a str,
    score: f32,
}

impl<'a> From<&SimilarActivity<'a>> for SimilarView<'a> {
    fn from(s: &SimilarActivity<'a>) -> Self {
        Self {
            id: s.record.id,
            title: &s.record.title,
            purpose: &s.record.purpose,
            score: s.score,
        }
    }
}

/// `pyari filter`: the filtered activity list with similar activities.
pub fn run_filter<W: Write>(
    browser: &Browser,
    filter: &ActivityFilter,
    similar_k: Option<usize>,
    json: bool,
    out: &mut W,
) -> Result<()> {
    let k = similar_k.unwrap_or(browser.finder.default_k());
    let matches = browser.engine.filter(filter);

    if json {
        let views: Vec<ActivityView<'_>> = matches
            .iter()
            .map(|&record| ActivityView {
                record,
                similar: browser
                    .finder
                    .top_similar(record, k)
                    .iter()
                    .map(SimilarView::from)
                    .collect(),
            })
            .collect();
        serde_json::to_writer_pretty(&mut *out, &views)?;
        writeln!(out)?;
        return Ok(());
    }

    if filter.is_active() {
        writeln!(out, "Filtered Activities ({})", matches.len())?;
    } else {
        writeln!(out, "Pyari Curriculum Activities ({})", matches.len())?;
    }
    writeln!(out)?;

    if matches.is_empty() {
        writeln!(out, "No activities match your filters.")?;
        return Ok(());
    }

    for record in matches {
        write_activity(out, record)?;
        write_similar(out, &browser.finder.top_similar(record, k))?;
        writeln!(out)?;
    }
    Ok(())
}

/// `pyari chapters`: chapter ids and titles, sorted by title.
pub fn run_chapters<W: Write>(browser: &Browser, out: &mut W) -> Result<()> {
    let chapters = browser.engine.chapters_and_titles();
    if chapters.is_empty() {
        writeln!(out, "No chapters.")?;
        return Ok(());
    }
    let width = chapters.iter().map(|(id, _)| id.len()).max().unwrap_or(0);
    for (id, title) in chapters {
        writeln!(out, "{:<width$}  {}", id, title, width = width)?;
    }
    Ok(())
}

/// `pyari browse`: one chapter's summary, sections and section activities.
///
/// Without `section`, the first section in sorted order is shown.
pub fn run_browse<W: Write>(
    browser: &Browser,
    chapter: &str,
    section: Option<&str>,
    out: &mut W,
) -> Result<()> {
    let chapter_id = browser.resolve_chapter(chapter)?;

    if let Some(summary) = browser.engine.chapter_summary(chapter_id) {
        writeln!(out, "## {}", summary.title)?;
        writeln!(out)?;
        for para in &summary.paragraphs {
            writeln!(out, "{}", para)?;
            writeln!(out)?;
        }
    }

    let sections = browser.engine.sections_of(chapter_id);
    if sections.is_empty() {
        writeln!(out, "No sections in this chapter.")?;
        return Ok(());
    }
    writeln!(out, "Sections: {}", sections.join(", "))?;

    let selected = match section {
        Some(s) if sections.contains(&s) => s,
        Some(s) => bail!("section not found in {}: {}", chapter_id, s),
        None => sections[0],
    };
    writeln!(out)?;
    writeln!(out, "### Activities in {}", selected)?;
    writeln!(out)?;

    for record in browser.engine.activities_in(chapter_id, selected) {
        write_activity(out, record)?;
        write_similar(out, &browser.finder.top_similar_default(record))?;
        writeln!(out)?;
    }
    Ok(())
}

/// `pyari similar`: neighbors of one activity.
pub fn run_similar<W: Write>(
    browser: &Browser,
    id: usize,
    k: Option<usize>,
    json: bool,
    out: &mut W,
) -> Result<()> {
    let k = k.unwrap_or(browser.finder.default_k());
    let Some(similar) = browser.finder.top_similar_by_id(id, k) else {
        bail!("activity not found: {}", id);
    };

    if json {
        let views: Vec<SimilarView<'_>> = similar.iter().map(SimilarView::from).collect();
        serde_json::to_writer_pretty(&mut *out, &views)?;
        writeln!(out)?;
        return Ok(());
    }

    if let Some(record) = browser.engine.dataset().get(id) {
        writeln!(out, "Similar to [{}] {}", record.id, record.title)?;
    }
    if similar.is_empty() {
        writeln!(out, "No similar activities.")?;
    }
    for s in &similar {
        writeln!(out, "{:.3}  [{}] {}", s.score, s.record.id, s.record.title)?;
    }
    Ok(())
}

/// `pyari facets`: the values accepted by `--age` and `--tag`.
pub fn run_facets<W: Write>(browser: &Browser, out: &mut W) -> Result<()> {
    writeln!(out, "Age groups:")?;
    for age in browser.engine.age_groups() {
        writeln!(out, "  {}", age)?;
    }
    writeln!(out, "Tags:")?;
    for tag in browser.engine.all_tags() {
        writeln!(out, "  {}", tag)?;
    }
    Ok(())
}

fn write_activity<W: Write>(out: &mut W, record: &ActivityRecord) -> Result<()> {
    writeln!(out, "[{}] {}", record.id, record.title)?;
    writeln!(out, "Purpose:   {}", record.purpose)?;
    writeln!(out, "Age Group: {}", record.age_group)?;
    writeln!(
        out,
        "Tags:      {}",
        record.tags.iter().cloned().collect::<Vec<_>>().join(", ")
    )?;
    if !record.instructions.is_empty() {
        writeln!(out, "Instructions:")?;
        for line in record.instructions.lines() {
            writeln!(out, "  {}", line)?;
        }
    }
    Ok(())
}

fn write_similar<W: Write>(out: &mut W, similar: &[SimilarActivity<'_>]) -> Result<()> {
    if similar.is_empty() {
        return Ok(());
    }
    writeln!(out, "Similar activities:")?;
    for s in similar {
        writeln!(out, "  -> [{}] {}: {}", s.record.id, s.record.title, s.record.purpose)?;
    }
    Ok(())
}
