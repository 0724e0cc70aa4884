//! Loading of the sources configuration (`rss_sources.json`).
//!
//! The file lists the topics with their keywords and target bucket, and the feeds
//! grouped by category:
//!
//! ```json
//! {
//!   "topics": {
//!     "MFA": { "keywords": ["MFA", "multi-factor"], "veille_index": 0 }
//!   },
//!   "rss_feeds": {
//!     "news": [{ "name": "Dark Reading", "url": "https://...", "lang": "en" }]
//!   }
//! }
//! ```
//!
//! Topic order in the file is significant (first matching topic wins a duplicate),
//! so topics are read through an order-preserving visitor rather than a hash map.
//! Files ending in `.yaml` / `.yml` are parsed as YAML, everything else as JSON.

use crate::error::VeilleError;
use crate::models::{FeedSource, TopicConfig};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Parsed sources configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub topics: TopicTable,
    #[serde(default)]
    pub rss_feeds: BTreeMap<String, Vec<FeedSource>>,
}

/// Topics in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicTable(pub Vec<TopicConfig>);

#[derive(Deserialize)]
struct TopicEntry {
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(rename = "veille_index", alias = "target_index")]
    target_index: usize,
    #[serde(default)]
    max_articles: Option<usize>,
}

impl<'de> Deserialize<'de> for TopicTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TopicTableVisitor;

        impl<'de> Visitor<'de> for TopicTableVisitor {
            type Value = TopicTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of topic label to topic settings")
            }

            fn visit_map<A>(self, mut map: A) -> Result<TopicTable, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut topics = Vec::new();
                while let Some((label, entry)) = map.next_entry::<String, TopicEntry>()? {
                    topics.push(TopicConfig {
                        label,
                        keywords: entry.keywords,
                        target_index: entry.target_index,
                        max_articles: entry.max_articles,
                    });
                }
                Ok(TopicTable(topics))
            }
        }

        deserializer.deserialize_map(TopicTableVisitor)
    }
}

impl SourcesConfig {
    /// All feeds, flattened across categories.
    pub fn all_feeds(&self) -> Vec<FeedSource> {
        self.rss_feeds.values().flatten().cloned().collect()
    }

    /// Topics, restricted to `filter` when it is non-empty.
    ///
    /// Labels in `filter` that name no configured topic are logged and ignored.
    pub fn select_topics(&self, filter: &[String]) -> Vec<TopicConfig> {
        if filter.is_empty() {
            return self.topics.0.clone();
        }
        for wanted in filter {
            if !self.topics.0.iter().any(|t| &t.label == wanted) {
                warn!(topic = %wanted, "Unknown topic requested; ignoring");
            }
        }
        self.topics
            .0
            .iter()
            .filter(|t| filter.contains(&t.label))
            .cloned()
            .collect()
    }
}

/// Read and parse the configuration file.
///
/// # Errors
///
/// Any read or parse failure. The caller treats these as fatal.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_sources(path: &Path) -> Result<SourcesConfig, VeilleError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| VeilleError::read(path, e))?;
    let config = parse_sources(&content, path)?;
    info!(
        topics = config.topics.0.len(),
        feeds = config.all_feeds().len(),
        "Loaded sources configuration"
    );
    Ok(config)
}

fn parse_sources(content: &str, path: &Path) -> Result<SourcesConfig, VeilleError> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_str(content).map_err(|source| VeilleError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_json::from_str(content).map_err(|source| VeilleError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
