//! # veille_rss
//!
//! An automated technology-watch ("veille") pipeline: it polls a configured set
//! of RSS/Atom feeds, classifies entries into topics by keyword, drops anything
//! already published or seen in a previous run, and merges the new articles into
//! the `veille.json` document behind a public listing.
//!
//! ## Features
//!
//! - Concurrent feed retrieval with per-source failure isolation
//! - RSS 2.0, RSS 1.0 and Atom parsing with ordered field fallbacks
//! - Keyword classification with whole-word matching for acronyms
//! - Cross-run deduplication through a fingerprint ledger
//! - Three output modes: preview, dated snapshot, canonical overwrite
//! - Optional per-topic CSV export
//!
//! ## Usage
//!
//! ```sh
//! veille_rss --dry-run
//! veille_rss --apply --topic MFA
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Fetching**: Download and normalize every feed (parallel, 8 at a time)
//! 2. **Classification**: Match articles against each topic's keywords
//! 3. **Deduplication**: Keep articles unknown to the document and the ledger
//! 4. **Output**: Snapshot / overwrite the document, save the ledger, export CSV, print the report
//!
//! The process exits with status 0 only when at least one new article was accepted.

use chrono::{Local, TimeDelta, Utc};
use clap::Parser;
use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod classify;
mod cli;
mod config;
mod dedup;
mod error;
mod feeds;
mod ledger;
mod models;
mod normalize;
mod outputs;
mod pipeline;
mod utils;

use cli::Cli;
use config::load_sources;
use feeds::{build_client, fetch_all};
use outputs::{csv, report};
use pipeline::{StorePaths, ingest};
use utils::ensure_writable_dir;

/// Console logs go to stderr so the report on stdout stays clean. With
/// `log_file`, the same events are appended there without colors.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console = tfmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stderr);

    let file = match log_file {
        Some(path) => {
            let handle = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tfmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(Mutex::new(handle)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
    Ok(())
}

#[tokio::main]
#[instrument]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let args = Cli::parse();
    init_tracing(args.verbose, args.log_file.as_deref())?;

    let start_time = std::time::Instant::now();
    info!("veille_rss starting up");
    debug!(?args, "Parsed CLI arguments");

    // ---- Configuration ----
    let config = match load_sources(&args.config).await {
        Ok(config) => config,
        Err(e) => {
            error!(path = %args.config.display(), error = %e, "Failed to load sources configuration");
            return Err(e.into());
        }
    };
    let topics = config.select_topics(&args.topic);
    let sources = config.all_feeds();
    if sources.is_empty() || topics.is_empty() {
        error!(
            feeds = sources.len(),
            topics = topics.len(),
            "Nothing to do: no feeds or no topics selected"
        );
        return Ok(ExitCode::FAILURE);
    }

    let cutoff = Utc::now() - TimeDelta::days(i64::from(args.max_age));
    debug!(max_age_days = args.max_age, %cutoff, "Article age cutoff (not enforced)");

    // ---- Fetch ----
    let client = build_client(Duration::from_secs(args.timeout_secs))?;
    let articles = fetch_all(&client, &sources, args.workers).await;
    info!(count = articles.len(), "Total articles to classify");

    // ---- Classify, dedup, persist ----
    let mode = args.output_mode();
    let paths = StorePaths {
        document: args.document.clone(),
        ledger: args.history.clone(),
        snapshot_dir: args.versions_dir.clone(),
    };
    let summary = match ingest(
        &articles,
        &topics,
        &paths,
        mode,
        args.max_articles,
        Local::now().date_naive(),
    )
    .await
    {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Failed to persist veille");
            return Err(e.into());
        }
    };

    // ---- CSV export ----
    if args.export_csv {
        if !mode.writes() {
            info!("Preview mode; CSV export skipped");
        } else if let Err(e) = ensure_writable_dir(&args.export_dir).await {
            error!(path = %args.export_dir.display(), error = %e, "Export directory is not writable");
        } else if let Err(e) =
            csv::export_csv(&summary.intakes, &args.export_dir, Local::now().naive_local()).await
        {
            error!(error = %e, "Failed to export CSV");
        }
    }

    // ---- Report ----
    print!("{}", report::render_report(&summary, Local::now().naive_local()));

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        total_new = summary.total_new,
        "Execution complete"
    );

    if summary.accepted_any() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("No new article accepted");
        Ok(ExitCode::FAILURE)
    }
}
