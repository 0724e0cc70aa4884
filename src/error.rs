//! Error types for a veille run.
//!
//! Two families:
//! - [`VeilleError`]: fatal for the whole run (configuration, persistence).
//! - [`FeedError`]: scoped to one feed source; logged and turned into zero articles.

use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort the run.
#[derive(Debug, Error)]
pub enum VeilleError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("canonical document {0} does not exist")]
    MissingDocument(PathBuf),

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid keyword pattern: {0}")]
    Keyword(#[from] regex::Error),
}

impl VeilleError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VeilleError::Read {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VeilleError::Write {
            path: path.into(),
            source,
        }
    }
}

/// Failures confined to a single feed source.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected http status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed XML at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("document is not an RSS or Atom feed")]
    NotAFeed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_mentions_path() {
        let err = VeilleError::read(
            "/tmp/rss_sources.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/rss_sources.json"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn test_feed_status_error_display() {
        let err = FeedError::Status(reqwest::StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "unexpected http status 404 Not Found");
    }
}
