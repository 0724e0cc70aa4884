//! CSV export of the articles each topic matched.
//!
//! One file per topic with at least one match:
//! `<export-dir>/veille_<TOPIC>_<YYYYmmdd_HHMMSS>.csv`.

use crate::dedup::Intake;
use crate::error::VeilleError;
use crate::models::Article;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

const HEADER: [&str; 6] = ["date", "title", "link", "description", "source", "tags"];

/// Quote a field when it contains a delimiter, a quote or a line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_record<'f>(out: &mut String, fields: impl IntoIterator<Item = &'f str>) {
    let line = fields.into_iter().map(escape_field).collect::<Vec<_>>().join(",");
    out.push_str(&line);
    out.push_str("\r\n");
}

/// Render the rows of one topic.
pub fn render_csv(articles: &[&Article]) -> String {
    let mut out = String::new();
    push_record(&mut out, HEADER);
    for article in articles {
        let tags = article.tags.join(", ");
        push_record(
            &mut out,
            [
                article.published_date.as_deref().unwrap_or_default(),
                article.title.as_str(),
                article.link.as_str(),
                article.description.as_str(),
                article.source_name.as_str(),
                tags.as_str(),
            ],
        );
    }
    out
}

/// Write one CSV per topic that matched anything. Returns the written paths.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn export_csv(
    intakes: &[Intake<'_>],
    dir: &Path,
    stamp: NaiveDateTime,
) -> Result<Vec<PathBuf>, VeilleError> {
    let stamp = stamp.format("%Y%m%d_%H%M%S").to_string();
    let mut written = Vec::new();
    for intake in intakes.iter().filter(|i| !i.found.is_empty()) {
        let path = dir.join(format!("veille_{}_{}.csv", intake.topic.label, stamp));
        fs::write(&path, render_csv(&intake.found))
            .await
            .map_err(|e| VeilleError::write(&path, e))?;
        info!(path = %path.display(), rows = intake.found.len(), "Exported CSV");
        written.push(path);
    }
    Ok(written)
}
