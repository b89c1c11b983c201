//! # Pyari Activity Browser
//!
//! Browse, filter and find similar activities in the Pyari curriculum
//! dataset: a fixed snapshot of educational activities with precomputed
//! embeddings.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌─────────────┐
//! │  Snapshot  │──▶│   Dataset    │──▶│ QueryEngine │  filter / browse
//! │ JSON/JSONL │   │ (normalized) │   └─────────────┘
//! └────────────┘   └──────┬───────┘   ┌──────────────────┐
//!                         └──────────▶│ SimilarityFinder │  top-k cosine
//!                                     └──────────────────┘
//! ```
//!
//! The dataset is loaded once and shared as `Arc<Dataset>`; nothing mutates
//! it afterwards.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use pyari_browser::dataset::{parse_snapshot, Dataset, DatasetFormat};
//! use pyari_browser::query::{ActivityFilter, QueryEngine};
//! use pyari_browser::similar::SimilarityFinder;
//!
//! let snapshot = r#"[
//!     {"title": "Yoga stretch", "age_group": "Ages 8+", "embedding": [1.0, 0.0]},
//!     {"title": "Body map", "age_group": "11", "embedding": [0.8, 0.2]}
//! ]"#;
//! let raw = parse_snapshot(snapshot, DatasetFormat::Json).unwrap();
//! let dataset = Arc::new(Dataset::from_raw(raw).unwrap());
//!
//! let engine = QueryEngine::new(dataset.clone());
//! let filter = ActivityFilter { keyword: Some("yoga".into()), ..Default::default() };
//! let hits = engine.filter(&filter);
//! assert_eq!(hits[0].age_group, "8+");
//!
//! let finder = SimilarityFinder::new(dataset);
//! let similar = finder.top_similar(hits[0], 3);
//! assert_eq!(similar[0].record.title, "Body map");
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`normalize`] | Load-time text cleanup |
//! | [`dataset`] | Snapshot loading |
//! | [`embedding`] | Embedding decoding and cosine similarity |
//! | [`query`] | Filtering and chapter/section browsing |
//! | [`similar`] | Top-k similar activities |
//! | [`browse`] | Terminal rendering for the `pyari` binary |
//! | [`tracing_setup`] | Log subscriber setup |

pub mod browse;
pub mod config;
pub mod dataset;
pub mod embedding;
pub mod models;
pub mod normalize;
pub mod query;
pub mod similar;
pub mod tracing_setup;
