//! Command-line interface definitions for veille_rss.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! File locations can also be provided via environment variables.

use crate::feeds::DEFAULT_WORKERS;
use crate::models::OutputMode;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for a veille run.
///
/// By default a run writes a dated snapshot of the merged document under
/// `versions/` and leaves `veille.json` untouched.
///
/// # Examples
///
/// ```sh
/// # Dated snapshot in versions/
/// veille_rss
///
/// # Preview only, nothing written
/// veille_rss --dry-run
///
/// # Overwrite veille.json (a .bak copy is kept)
/// veille_rss --apply
///
/// # Only ZTNA and SIEM, at most 5 new articles each, with CSV export
/// veille_rss --topic ZTNA SIEM --max-articles 5 --export-csv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Preview: compute and report, write nothing
    #[arg(long, conflicts_with = "apply")]
    pub dry_run: bool,

    /// Also overwrite the canonical document, after backing it up
    #[arg(long)]
    pub apply: bool,

    /// Restrict the run to these topics
    #[arg(long, num_args = 1.., value_name = "LABEL")]
    pub topic: Vec<String>,

    /// Maximum new articles per topic (0 = unlimited); overrides the configuration
    #[arg(long, value_name = "N")]
    pub max_articles: Option<usize>,

    /// Export matched articles to CSV, one file per topic
    #[arg(long)]
    pub export_csv: bool,

    /// Maximum article age in days (currently informational)
    #[arg(long, value_name = "DAYS", default_value_t = 30)]
    pub max_age: u32,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Sources configuration (JSON, or YAML by extension)
    #[arg(short, long, env = "VEILLE_SOURCES", default_value = "rss_sources.json")]
    pub config: PathBuf,

    /// Canonical veille document
    #[arg(long, env = "VEILLE_DOCUMENT", default_value = "veille.json")]
    pub document: PathBuf,

    /// History ledger
    #[arg(long, env = "VEILLE_HISTORY", default_value = "veille_history.json")]
    pub history: PathBuf,

    /// Directory for dated snapshots
    #[arg(long, default_value = "versions")]
    pub versions_dir: PathBuf,

    /// Directory for CSV exports
    #[arg(long, default_value = "exports")]
    pub export_dir: PathBuf,

    /// Also append logs to this file
    #[arg(long, env = "VEILLE_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Feeds fetched concurrently
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 20)]
    pub timeout_secs: u64,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        OutputMode::from_flags(self.dry_run, self.apply)
    }
}
