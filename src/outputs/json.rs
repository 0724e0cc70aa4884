//! Reading and writing the veille document.
//!
//! # Output Structure
//!
//! ```text
//! veille.json                    # canonical document, rewritten only with --apply
//! veille.json.bak                # previous canonical content, written before an overwrite
//! versions/
//! ├── 05-03-2025-veille.json     # first snapshot of the day
//! └── 05-03-2025-veille-v2.json  # later snapshots of the same day
//! ```
//!
//! Documents are written pretty-printed with a four-space indent and raw UTF-8.

use crate::error::VeilleError;
use crate::models::VeilleDocument;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

/// Load the canonical document.
///
/// # Errors
///
/// [`VeilleError::MissingDocument`] when the file does not exist; the buckets it
/// defines cannot be inferred.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_document(path: &Path) -> Result<VeilleDocument, VeilleError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(VeilleError::MissingDocument(path.to_path_buf()));
        }
        Err(e) => return Err(VeilleError::read(path, e)),
    };
    let document: VeilleDocument =
        serde_json::from_str(&content).map_err(|source| VeilleError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    info!(
        buckets = document.bucket_count(),
        published = document.links().count(),
        "Loaded veille document"
    );
    Ok(document)
}

/// Serialize with a four-space indent.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

fn serialize_document(document: &VeilleDocument) -> Result<Vec<u8>, VeilleError> {
    to_pretty_json(document).map_err(|source| VeilleError::Serialize {
        what: "veille document",
        source,
    })
}

/// File name of the `version`-th snapshot of `date` (`version` starts at 1).
pub fn snapshot_file_name(date: NaiveDate, version: u32) -> String {
    let day = date.format("%d-%m-%Y");
    if version <= 1 {
        format!("{day}-veille.json")
    } else {
        format!("{day}-veille-v{version}.json")
    }
}

/// Write a dated snapshot under `dir` and return its path.
///
/// Existing snapshots are never overwritten: the first free name among
/// `<date>-veille.json`, `<date>-veille-v2.json`, ... is claimed with an
/// exclusive create.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), %date))]
pub async fn write_snapshot(
    document: &VeilleDocument,
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, VeilleError> {
    let bytes = serialize_document(document)?;
    fs::create_dir_all(dir)
        .await
        .map_err(|e| VeilleError::write(dir, e))?;

    let mut version = 1;
    loop {
        let path = dir.join(snapshot_file_name(date, version));
        let open = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        match open {
            Ok(mut file) => {
                file.write_all(&bytes)
                    .await
                    .map_err(|e| VeilleError::write(&path, e))?;
                file.flush()
                    .await
                    .map_err(|e| VeilleError::write(&path, e))?;
                info!(path = %path.display(), "Wrote snapshot");
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "Snapshot name taken");
                version += 1;
            }
            Err(e) => return Err(VeilleError::write(&path, e)),
        }
    }
}

/// Path of the backup sidecar: the canonical file name with `.bak` appended.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

/// Back up the canonical document (when it exists) and overwrite it.
///
/// Returns the backup path if a backup was written.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn overwrite_canonical(
    document: &VeilleDocument,
    path: &Path,
) -> Result<Option<PathBuf>, VeilleError> {
    let bytes = serialize_document(document)?;

    let backup = match fs::read(path).await {
        Ok(previous) => {
            let backup = backup_path(path);
            fs::write(&backup, previous)
                .await
                .map_err(|e| VeilleError::write(&backup, e))?;
            info!(backup = %backup.display(), "Backed up canonical document");
            Some(backup)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(VeilleError::read(path, e)),
    };

    fs::write(path, bytes)
        .await
        .map_err(|e| VeilleError::write(path, e))?;
    info!("Overwrote canonical document");
    Ok(backup)
}
