//! Cross-run history of accepted articles (`veille_history.json`).
//!
//! The ledger stores fingerprints rather than links:
//!
//! ```json
//! {
//!   "processed_urls": ["3f0c2a9b1d4e", "..."],
//!   "last_run": "2025-03-05T08:12:44.120934+01:00"
//! }
//! ```
//!
//! A fingerprint once recorded is never accepted again, even after the entry was
//! removed from the published document by hand.

use crate::error::VeilleError;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Number of hex characters kept from the digest.
pub const FINGERPRINT_LEN: usize = 12;

/// Dedup identity of a link: the first 12 hex characters of its MD5 digest.
pub fn fingerprint(link: &str) -> String {
    let digest = format!("{:x}", md5::compute(link.as_bytes()));
    digest[..FINGERPRINT_LEN].to_string()
}

/// Fingerprints of every article accepted by a previous (or the current) run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HistoryLedger {
    #[serde(default)]
    processed_urls: Vec<String>,
    #[serde(default)]
    last_run: Option<String>,
    #[serde(skip)]
    index: HashSet<String>,
}

impl HistoryLedger {
    /// Read the ledger, or start empty when the file does not exist.
    ///
    /// # Errors
    ///
    /// Unreadable or malformed files are errors; only absence is tolerated.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, VeilleError> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No history ledger yet; starting empty");
                return Ok(HistoryLedger::default());
            }
            Err(e) => return Err(VeilleError::read(path, e)),
        };

        let mut ledger: HistoryLedger =
            serde_json::from_str(&content).map_err(|source| VeilleError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        ledger.index = ledger.processed_urls.iter().cloned().collect();
        info!(
            known = ledger.len(),
            last_run = ledger.last_run().unwrap_or("never"),
            "Loaded history ledger"
        );
        Ok(ledger)
    }

    pub fn is_known(&self, fingerprint: &str) -> bool {
        self.index.contains(fingerprint)
    }

    /// Record a fingerprint. Returns `false` if it was already present.
    pub fn record(&mut self, fingerprint: String) -> bool {
        if self.index.insert(fingerprint.clone()) {
            self.processed_urls.push(fingerprint);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.processed_urls.len()
    }

    pub fn last_run(&self) -> Option<&str> {
        self.last_run.as_deref()
    }

    /// Stamp `last_run` with the current local time and write the ledger.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn save(&mut self, path: &Path) -> Result<(), VeilleError> {
        self.last_run = Some(Local::now().to_rfc3339());
        let json = serde_json::to_string_pretty(self).map_err(|source| VeilleError::Serialize {
            what: "history ledger",
            source,
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| VeilleError::write(parent, e))?;
        }
        fs::write(path, json)
            .await
            .map_err(|e| VeilleError::write(path, e))?;
        debug!(known = self.len(), "Wrote history ledger");
        Ok(())
    }
}
