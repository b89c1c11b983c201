//! TOML configuration.
//!
//! ```toml
//! [dataset]
//! path = "data/activities.sample.json"
//! format = "json"        # optional; inferred from the extension
//!
//! [similarity]
//! top_k = 3
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::dataset::DatasetFormat;
use crate::similar::DEFAULT_TOP_K;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub format: Option<DatasetFormat>,
}

impl DatasetConfig {
    /// The configured format, or the one implied by the file extension.
    pub fn resolved_format(&self) -> DatasetFormat {
        self.format
            .unwrap_or_else(|| DatasetFormat::from_path(&self.path))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimilarityConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Config {
    /// Defaults for a dataset given on the command line without a config file.
    pub fn for_dataset(path: &Path) -> Self {
        Self {
            dataset: DatasetConfig {
                path: path.to_path_buf(),
                format: None,
            },
            similarity: SimilarityConfig::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.dataset.path.as_os_str().is_empty() {
            anyhow::bail!("dataset.path must not be empty");
        }
        if self.similarity.top_k == 0 {
            anyhow::bail!("similarity.top_k must be >= 1");
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Resolve the effective config from the CLI's `--config` and `--dataset`.
///
/// `--dataset` overrides `dataset.path`. When the config file does not exist
/// and a dataset was given, defaults are used.
pub fn resolve_config(config_path: &Path, dataset_override: Option<&Path>) -> Result<Config> {
    let mut config = match dataset_override {
        Some(dataset) if !config_path.exists() => Config::for_dataset(dataset),
        _ => load_config(config_path)?,
    };
    if let Some(dataset) = dataset_override {
        config.dataset.path = dataset.to_path_buf();
        config.dataset.format = None;
    }
    config.validate()?;
    Ok(config)
}
