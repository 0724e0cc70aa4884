//! Utility functions for date display, string truncation and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - French date formatting for the published listing
//! - String truncation for logs and the console report
//! - Output directory validation before writing snapshots or exports

use crate::error::VeilleError;
use chrono::{Datelike, NaiveDate};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

const MONTHS_FR: [&str; 12] = [
    "Janvier",
    "Février",
    "Mars",
    "Avril",
    "Mai",
    "Juin",
    "Juillet",
    "Août",
    "Septembre",
    "Octobre",
    "Novembre",
    "Décembre",
];

/// Format a date the way the public listing shows it.
///
/// # Examples
///
/// ```ignore
/// let d = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
/// assert_eq!(format_date_fr(d), "1 Août 2025");
/// ```
pub fn format_date_fr(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        date.day(),
        MONTHS_FR[date.month0() as usize],
        date.year()
    )
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number of
/// dropped characters appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 chars)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
///
/// # Errors
///
/// Returns [`VeilleError::Write`] if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), VeilleError> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| VeilleError::write(path, e))?;
    let probe_path = path.join("..__probe_write__");
    fs::File::create(&probe_path)
        .await
        .map_err(|e| VeilleError::write(path, e))?;
    let _ = fs::remove_file(&probe_path).await;
    info!("Output directory is writable");
    Ok(())
}
