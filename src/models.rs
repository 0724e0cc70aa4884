//! Data models for feed sources, articles and the persisted veille document.
//!
//! This module defines the core data structures used throughout the application:
//! - [`FeedSource`]: One configured RSS/Atom endpoint
//! - [`Article`]: A normalized feed entry, transient for the duration of a run
//! - [`TopicConfig`]: Keyword set and target bucket for one topic
//! - [`VeilleDocument`]: The persisted `veille.json` listing, kept as raw JSON
//! - [`PublishedArticle`]: The trimmed projection of a newly accepted article
//!
//! The document is never decoded into typed entries, so fields this tool does not
//! know about (bucket titles, definitions, hand-added keys, odd value types) survive
//! a rewrite untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A syndication endpoint polled once per run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeedSource {
    /// Display label used in logs and as the article's `source`.
    pub name: String,
    /// Feed URL.
    pub url: String,
    /// Language tag of the feed content.
    #[serde(rename = "lang", alias = "language", default = "default_lang")]
    pub language: String,
}

fn default_lang() -> String {
    "en".to_string()
}

/// A normalized feed entry.
///
/// Only the normalizer builds these, and it never produces one with an empty
/// `title` or `link`.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: String,
    /// Canonical URL; the article's identity.
    pub link: String,
    /// Display date, absent when the feed gave nothing usable.
    pub published_date: Option<String>,
    /// Plain text, at most 500 characters.
    pub description: String,
    pub image_url: Option<String>,
    pub source_name: String,
    pub language: String,
    /// Feed category terms, at most 5.
    pub tags: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Keywords and destination bucket for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicConfig {
    /// Topic label, e.g. `MFA`.
    pub label: String,
    pub keywords: Vec<String>,
    /// Index of the bucket in [`VeilleDocument::veilles`] receiving accepted articles.
    pub target_index: usize,
    /// Per-topic cap on accepted articles, overridden by `--max-articles`.
    pub max_articles: Option<usize>,
}

/// Output policy of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Compute and report only.
    Preview,
    /// Write a dated snapshot and the ledger.
    Snapshot,
    /// Snapshot, plus back up and overwrite the canonical document.
    Overwrite,
}

impl OutputMode {
    pub fn from_flags(dry_run: bool, apply: bool) -> Self {
        if dry_run {
            OutputMode::Preview
        } else if apply {
            OutputMode::Overwrite
        } else {
            OutputMode::Snapshot
        }
    }

    pub fn writes(self) -> bool {
        self != OutputMode::Preview
    }
}

/// A new entry for a bucket, as published on the site.
///
/// Only built for articles accepted in this run; entries already in the document
/// stay raw JSON and are never re-encoded through this type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishedArticle {
    pub date: Option<String>,
    pub title: Option<String>,
    pub image: Option<String>,
    pub link: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub source: Option<String>,
}

impl PublishedArticle {
    /// Project an article with its final tag list.
    pub fn from_article(article: &Article, tags: Vec<String>) -> Self {
        fn non_empty(s: &str) -> Option<String> {
            (!s.is_empty()).then(|| s.to_string())
        }

        PublishedArticle {
            date: article.published_date.as_deref().and_then(non_empty),
            title: non_empty(&article.title),
            image: article.image_url.as_deref().and_then(non_empty),
            link: non_empty(&article.link),
            tags,
            description: non_empty(&article.description),
            source: non_empty(&article.source_name),
        }
    }

    /// JSON object with keys `date, title, image, link, tags, description, source`,
    /// each present only when non-empty.
    pub fn to_value(&self) -> Value {
        let tags = (!self.tags.is_empty())
            .then(|| Value::Array(self.tags.iter().cloned().map(Value::String).collect()));
        let string = |field: &Option<String>| field.clone().map(Value::String);

        let fields = [
            ("date", string(&self.date)),
            ("title", string(&self.title)),
            ("image", string(&self.image)),
            ("link", string(&self.link)),
            ("tags", tags),
            ("description", string(&self.description)),
            ("source", string(&self.source)),
        ];
        let obj: Map<String, Value> = fields
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
            .collect();
        Value::Object(obj)
    }
}

/// The canonical `veille.json` document.
///
/// Held as raw JSON: buckets and their existing entries are written back exactly
/// as read (key order included), whatever fields or value types they carry. Only
/// `veilles[i].articles` ever grows.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct VeilleDocument(Map<String, Value>);

impl VeilleDocument {
    fn buckets(&self) -> &[Value] {
        self.0
            .get("veilles")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets().len()
    }

    /// Every non-empty link already published, across all buckets.
    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.buckets()
            .iter()
            .filter_map(|bucket| bucket.get("articles").and_then(Value::as_array))
            .flatten()
            .filter_map(|entry| entry.get("link").and_then(Value::as_str))
            .filter(|link| !link.is_empty())
    }

    /// Append entries to the end of a bucket.
    ///
    /// Existing entries are never touched. Returns `false`, leaving the document
    /// unchanged, when `index` names no bucket object or its `articles` is not a list.
    pub fn append(&mut self, index: usize, entries: &[PublishedArticle]) -> bool {
        let Some(bucket) = self
            .0
            .get_mut("veilles")
            .and_then(Value::as_array_mut)
            .and_then(|buckets| buckets.get_mut(index))
            .and_then(Value::as_object_mut)
        else {
            return false;
        };
        let articles = bucket
            .entry("articles")
            .or_insert_with(|| Value::Array(Vec::new()));
        match articles.as_array_mut() {
            Some(articles) => {
                articles.extend(entries.iter().map(PublishedArticle::to_value));
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, link: &str) -> Article {
        Article {
            title: title.to_string(),
            link: link.to_string(),
            published_date: None,
            description: String::new(),
            image_url: None,
            source_name: "Example".to_string(),
            language: "en".to_string(),
            tags: vec![],
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_feed_source_defaults_language() {
        let json = r#"{"name": "Dark Reading", "url": "https://example.com/rss"}"#;
        let source: FeedSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.language, "en");

        let json = r#"{"name": "CERT-FR", "url": "https://example.fr/feed", "lang": "fr"}"#;
        let source: FeedSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.language, "fr");
    }

    #[test]
    fn test_published_article_omits_empty_fields() {
        let entry = PublishedArticle::from_article(&article("Title", "https://a.example/1"), vec![]);
        let json = entry.to_value();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["title"], "Title");
        assert_eq!(obj["link"], "https://a.example/1");
        assert_eq!(obj["source"], "Example");
        assert!(!obj.contains_key("image"));
        assert!(!obj.contains_key("tags"));
        assert!(!obj.contains_key("date"));
    }

    #[test]
    fn test_published_article_key_order() {
        let mut a = article("T", "https://a.example/1");
        a.published_date = Some("5 Mars 2025".to_string());
        a.image_url = Some("https://a.example/i.png".to_string());
        a.description = "D".to_string();
        let entry = PublishedArticle::from_article(&a, vec!["Cloud".to_string()]);
        let value = entry.to_value();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["date", "title", "image", "link", "tags", "description", "source"]);
    }

    #[test]
    fn test_document_round_trip_keeps_unknown_fields() {
        let json = r#"{
            "veilles": [
                {
                    "title": "MFA",
                    "sub-title": "Authentification multifacteur",
                    "articles": [
                        {"title": "Old", "link": "https://old.example/1", "note": "hand-edited"}
                    ]
                }
            ],
            "updated_by": "editor"
        }"#;
        let doc: VeilleDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.bucket_count(), 1);

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back["updated_by"], "editor");
        assert_eq!(back["veilles"][0]["sub-title"], "Authentification multifacteur");
        assert_eq!(back["veilles"][0]["articles"][0]["note"], "hand-edited");
        assert_eq!(back["veilles"][0]["title"], "MFA");
    }

    #[test]
    fn test_existing_entries_are_written_back_verbatim() {
        // Empty lists, nulls, non-string dates and hand-chosen key order all survive.
        let entry = r#"{"link":"https://old.example/1","tags":[],"image":null,"date":2024,"title":"Old"}"#;
        let json = format!(r#"{{"veilles":[{{"articles":[{entry}],"title":"MFA"}}]}}"#);
        let mut doc: VeilleDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(doc.links().collect::<Vec<_>>(), vec!["https://old.example/1"]);

        assert_eq!(serde_json::to_string(&doc).unwrap(), json);

        let new = PublishedArticle::from_article(&article("New", "https://x/2"), vec![]);
        assert!(doc.append(0, &[new]));
        let back = serde_json::to_value(&doc).unwrap();
        let first = back["veilles"][0]["articles"][0].as_object().unwrap();
        let keys: Vec<&str> = first.keys().map(String::as_str).collect();
        assert_eq!(keys, ["link", "tags", "image", "date", "title"]);
        assert_eq!(first["tags"], serde_json::json!([]));
        assert!(first["image"].is_null());
        assert_eq!(first["date"], 2024);
        assert_eq!(back["veilles"][0]["articles"][1]["link"], "https://x/2");
    }

    #[test]
    fn test_links_skips_entries_without_link() {
        let doc: VeilleDocument = serde_json::from_str(
            r#"{"veilles": [
                {"articles": [{"title": "a", "link": "https://x/1"}, {"title": "no link"}]},
                {"articles": [{"link": ""}, {"link": 7}, {"link": "https://x/2"}]},
                {"title": "no articles yet"}
            ]}"#,
        )
        .unwrap();
        let links: Vec<&str> = doc.links().collect();
        assert_eq!(links, vec!["https://x/1", "https://x/2"]);
    }

    #[test]
    fn test_append_is_append_only() {
        let mut doc: VeilleDocument = serde_json::from_str(
            r#"{"veilles": [{"articles": [{"link": "https://x/1"}]}, {"articles": []}, {"title": "fresh"}]}"#,
        )
        .unwrap();
        let new = PublishedArticle::from_article(&article("New", "https://x/2"), vec![]);

        assert!(doc.append(0, std::slice::from_ref(&new)));
        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back["veilles"][0]["articles"].as_array().unwrap().len(), 2);
        assert_eq!(back["veilles"][0]["articles"][0]["link"], "https://x/1");
        assert_eq!(back["veilles"][0]["articles"][1]["link"], "https://x/2");

        assert!(doc.append(2, std::slice::from_ref(&new)));
        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back["veilles"][2]["title"], "fresh");
        assert_eq!(back["veilles"][2]["articles"][0]["link"], "https://x/2");

        assert!(!doc.append(5, &[new]));
        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back["veilles"][1]["articles"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_output_mode_from_flags() {
        assert_eq!(OutputMode::from_flags(true, false), OutputMode::Preview);
        assert_eq!(OutputMode::from_flags(true, true), OutputMode::Preview);
        assert_eq!(OutputMode::from_flags(false, true), OutputMode::Overwrite);
        assert_eq!(OutputMode::from_flags(false, false), OutputMode::Snapshot);
        assert!(!OutputMode::Preview.writes());
        assert!(OutputMode::Snapshot.writes());
    }
}
