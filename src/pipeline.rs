//! Classification, deduplication and persistence of one run's articles.
//!
//! Runs after the retrieval barrier, single-threaded. The document and the
//! ledger are read at the start, changed in memory, and flushed according to
//! the [`OutputMode`]:
//!
//! | mode      | snapshot | ledger | canonical + `.bak` |
//! |-----------|----------|--------|--------------------|
//! | Preview   | no       | no     | no                 |
//! | Snapshot  | yes      | yes    | no                 |
//! | Overwrite | yes      | yes    | yes                |
//!
//! Nothing at all is written when no article was accepted.

use crate::classify::Classifier;
use crate::dedup::{Intake, select_new};
use crate::error::VeilleError;
use crate::ledger::HistoryLedger;
use crate::models::{Article, OutputMode, TopicConfig};
use crate::outputs::json;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// Where the persisted state lives.
#[derive(Debug, Clone)]
pub struct StorePaths {
    /// Canonical `veille.json`.
    pub document: PathBuf,
    /// History ledger.
    pub ledger: PathBuf,
    /// Directory receiving dated snapshots.
    pub snapshot_dir: PathBuf,
}

/// What a run found, accepted and wrote.
#[derive(Debug, Clone)]
pub struct RunSummary<'a> {
    pub mode: OutputMode,
    pub intakes: Vec<Intake<'a>>,
    pub total_new: usize,
    pub snapshot: Option<PathBuf>,
    pub backup: Option<PathBuf>,
}

impl RunSummary<'_> {
    pub fn accepted_any(&self) -> bool {
        self.total_new > 0
    }
}

/// Classify `articles`, keep the new ones and persist them under `mode`.
///
/// `today` names the snapshot file.
///
/// # Errors
///
/// Any failure to read the document or ledger, or to write an output. The
/// document must exist.
#[instrument(level = "info", skip_all, fields(?mode, articles = articles.len(), topics = topics.len()))]
pub async fn ingest<'a>(
    articles: &'a [Article],
    topics: &'a [TopicConfig],
    paths: &StorePaths,
    mode: OutputMode,
    max_articles: Option<usize>,
    today: NaiveDate,
) -> Result<RunSummary<'a>, VeilleError> {
    let mut document = json::load_document(&paths.document).await?;
    let mut ledger = HistoryLedger::load(&paths.ledger).await?;

    let classifier = Classifier::new(topics)?;
    let categorized = classifier.categorize(articles);
    let intakes = select_new(categorized, &document, &mut ledger, max_articles);
    let total_new: usize = intakes.iter().map(|i| i.accepted.len()).sum();

    let mut summary = RunSummary {
        mode,
        intakes,
        total_new,
        snapshot: None,
        backup: None,
    };

    if total_new == 0 {
        info!("No new articles; nothing to write");
        return Ok(summary);
    }
    if !mode.writes() {
        info!(total_new, "Preview mode; nothing written");
        return Ok(summary);
    }

    for intake in summary.intakes.iter().filter(|i| !i.accepted.is_empty()) {
        if !document.append(intake.topic.target_index, &intake.accepted) {
            warn!(topic = %intake.topic.label, "Bucket has no article list; entries not appended");
        }
    }

    summary.snapshot = Some(json::write_snapshot(&document, &paths.snapshot_dir, today).await?);
    if mode == OutputMode::Overwrite {
        summary.backup = json::overwrite_canonical(&document, &paths.document).await?;
    }
    ledger.save(&paths.ledger).await?;

    info!(total_new, known = ledger.len(), "Run persisted");
    Ok(summary)
}
