//! # Pyari CLI (`pyari`)
//!
//! Terminal front-end for the Pyari activity browser. It loads a dataset
//! snapshot once and answers one query per invocation.
//!
//! ## Usage
//!
//! ```bash
//! pyari --config ./config/pyari.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pyari filter` | List activities matching age, tag and keyword filters |
//! | `pyari chapters` | List chapters sorted by title |
//! | `pyari browse <chapter>` | Show a chapter's summary, sections and activities |
//! | `pyari similar <id>` | Show the activities most similar to one activity |
//! | `pyari facets` | List the available age groups and tags |
//!
//! ## Examples
//!
//! ```bash
//! # Activities for 11+ tagged Consent or Relationships that mention "role play"
//! pyari filter --age 11+ --tag Consent --tag Relationships --keyword "role play"
//!
//! # Browse a chapter by title
//! pyari browse "Sexual health" --section "Section 2"
//!
//! # Five nearest neighbors of activity 12, as JSON
//! pyari similar 12 --k 5 --json
//! ```

use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::debug;

use pyari_browser::browse::{self, Browser};
use pyari_browser::config;
use pyari_browser::query::{ActivityFilter, AgeFilter};
use pyari_browser::tracing_setup;

/// Pyari CLI: browse, filter and find similar curriculum activities.
#[derive(Parser)]
#[command(
    name = "pyari",
    about = "Browse, filter and find similar activities in the Pyari curriculum dataset",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pyari.toml")]
    config: PathBuf,

    /// Dataset snapshot to load instead of `[dataset].path`.
    ///
    /// When the config file does not exist, defaults are used for
    /// everything else.
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List activities matching the given filters.
    ///
    /// Criteria combine with AND; repeated `--tag` values combine with OR.
    /// With no criteria every activity is listed.
    Filter {
        /// Canonical age group (e.g. `8+`), or `All`.
        #[arg(long, default_value = "All")]
        age: String,

        /// Curriculum tag; repeat to match any of several tags.
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Case-insensitive text to find in title, purpose or instructions.
        #[arg(long)]
        keyword: Option<String>,

        /// Number of similar activities to show per result.
        #[arg(long)]
        similar: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List chapters and their titles, sorted by title.
    Chapters,

    /// Show a chapter's summary, its sections and one section's activities.
    Browse {
        /// Chapter id (e.g. `Chapter 6`) or chapter title.
        chapter: String,

        /// Section to list; defaults to the first section.
        #[arg(long)]
        section: Option<String>,
    },

    /// Show the activities most similar to one activity.
    Similar {
        /// Activity id (its position in the dataset).
        id: usize,

        /// Number of results; defaults to `[similarity].top_k`.
        #[arg(long)]
        k: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the available age groups and tags.
    Facets,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_setup::init_tracing(cli.verbose, cli.quiet)?;

    let cfg = config::resolve_config(&cli.config, cli.dataset.as_deref())?;
    debug!(dataset = %cfg.dataset.path.display(), top_k = cfg.similarity.top_k, "resolved config");

    let browser = Browser::open(&cfg)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Filter {
            age,
            tags,
            keyword,
            similar,
            json,
        } => {
            let filter = ActivityFilter {
                age_group: AgeFilter::parse(&age),
                tags: tags
                    .iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect::<BTreeSet<_>>(),
                keyword,
            };
            browse::run_filter(&browser, &filter, similar, json, &mut out)?;
        }
        Commands::Chapters => {
            browse::run_chapters(&browser, &mut out)?;
        }
        Commands::Browse { chapter, section } => {
            browse::run_browse(&browser, &chapter, section.as_deref(), &mut out)?;
        }
        Commands::Similar { id, k, json } => {
            browse::run_similar(&browser, id, k, json, &mut out)?;
        }
        Commands::Facets => {
            browse::run_facets(&browser, &mut out)?;
        }
    }

    Ok(())
}
