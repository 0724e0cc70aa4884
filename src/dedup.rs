//! Selection of the articles that are new to the published document.
//!
//! An article is new when its link is neither already published (in any bucket)
//! nor fingerprinted in the history ledger. Topics are walked in configuration
//! order and every acceptance is recorded immediately, so an article matched by
//! two topics lands only in the first one.

use crate::classify::{TopicMatches, auto_tag};
use crate::ledger::{HistoryLedger, fingerprint};
use crate::models::{Article, PublishedArticle, TopicConfig, VeilleDocument};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Outcome of deduplication for one topic.
#[derive(Debug, Clone)]
pub struct Intake<'a> {
    pub topic: &'a TopicConfig,
    /// Every article the topic matched this run, in encounter order.
    pub found: Vec<&'a Article>,
    /// Entries to append to the topic's bucket.
    pub accepted: Vec<PublishedArticle>,
    /// Set when the topic's bucket does not exist in the document.
    pub skipped: bool,
}

impl Intake<'_> {
    /// Whether `article` was accepted for this topic in this run.
    pub fn is_new(&self, article: &Article) -> bool {
        self.accepted
            .iter()
            .any(|entry| entry.link.as_deref() == Some(article.link.as_str()))
    }
}

/// Cap on accepted articles for `topic`. `--max-articles` wins over the topic's own
/// setting; zero means unlimited.
pub fn effective_cap(topic: &TopicConfig, cli_cap: Option<usize>) -> Option<usize> {
    cli_cap
        .or(topic.max_articles)
        .filter(|&cap| cap > 0)
}

/// Decide, topic by topic, which matched articles are new.
///
/// Every new article is recorded in `ledger` before the per-topic cap trims the
/// accepted list, so articles dropped by the cap are not offered again. The caller
/// decides whether the ledger is persisted.
pub fn select_new<'a>(
    categorized: Vec<TopicMatches<'a>>,
    document: &VeilleDocument,
    ledger: &mut HistoryLedger,
    cli_cap: Option<usize>,
) -> Vec<Intake<'a>> {
    let mut published: HashSet<String> = document.links().map(str::to_string).collect();
    let buckets = document.bucket_count();
    debug!(published = published.len(), buckets, "Dedup state loaded");

    categorized
        .into_iter()
        .map(|matched| {
            let topic = matched.topic;
            if topic.target_index >= buckets {
                warn!(
                    topic = %topic.label,
                    target_index = topic.target_index,
                    buckets,
                    "Topic targets a bucket that does not exist; skipping"
                );
                return Intake {
                    topic,
                    found: matched.articles,
                    accepted: Vec::new(),
                    skipped: true,
                };
            }

            let mut accepted = Vec::new();
            for article in &matched.articles {
                if published.contains(&article.link) {
                    continue;
                }
                let fp = fingerprint(&article.link);
                if ledger.is_known(&fp) {
                    continue;
                }
                published.insert(article.link.clone());
                ledger.record(fp);
                accepted.push(PublishedArticle::from_article(
                    article,
                    auto_tag(article, &topic.label),
                ));
            }

            if let Some(cap) = effective_cap(topic, cli_cap).filter(|&cap| accepted.len() > cap) {
                debug!(
                    topic = %topic.label,
                    cap,
                    dropped = accepted.len() - cap,
                    "Per-topic cap reached"
                );
                accepted.truncate(cap);
            }

            info!(
                topic = %topic.label,
                found = matched.articles.len(),
                new = accepted.len(),
                "Topic deduplicated"
            );
            Intake {
                topic,
                found: matched.articles,
                accepted,
                skipped: false,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use chrono::Utc;

    fn article(title: &str, link: &str) -> Article {
        Article {
            title: title.to_string(),
            link: link.to_string(),
            published_date: Some("5 Mars 2025".to_string()),
            description: String::new(),
            image_url: None,
            source_name: "Example".to_string(),
            language: "en".to_string(),
            tags: vec![],
            fetched_at: Utc::now(),
        }
    }

    fn topic(label: &str, keywords: &[&str], target_index: usize) -> TopicConfig {
        TopicConfig {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            target_index,
            max_articles: None,
        }
    }

    fn document(buckets: usize) -> VeilleDocument {
        let veilles = vec![serde_json::json!({"articles": []}); buckets];
        serde_json::from_value(serde_json::json!({ "veilles": veilles })).unwrap()
    }

    #[test]
    fn test_rejects_links_already_published() {
        let topics = vec![topic("MFA", &["MFA"], 0)];
        let articles = vec![
            article("MFA one", "https://x/1"),
            article("MFA two", "https://x/2"),
        ];
        let doc: VeilleDocument = serde_json::from_str(
            r#"{"veilles": [{"articles": []}, {"articles": [{"link": "https://x/1", "date": 2024}]}]}"#,
        )
        .unwrap();
        let mut ledger = HistoryLedger::default();

        let categorized = Classifier::new(&topics).unwrap().categorize(&articles);
        let intakes = select_new(categorized, &doc, &mut ledger, None);

        assert_eq!(intakes[0].found.len(), 2);
        assert_eq!(intakes[0].accepted.len(), 1);
        assert_eq!(intakes[0].accepted[0].link.as_deref(), Some("https://x/2"));
        assert!(intakes[0].is_new(&articles[1]));
        assert!(!intakes[0].is_new(&articles[0]));
        assert!(ledger.is_known(&fingerprint("https://x/2")));
        assert!(!ledger.is_known(&fingerprint("https://x/1")));
    }

    #[test]
    fn test_rejects_fingerprinted_links() {
        let topics = vec![topic("MFA", &["MFA"], 0)];
        let articles = vec![article("MFA one", "https://x/1")];
        let mut ledger = HistoryLedger::default();
        ledger.record(fingerprint("https://x/1"));

        let categorized = Classifier::new(&topics).unwrap().categorize(&articles);
        let intakes = select_new(categorized, &document(1), &mut ledger, None);
        assert!(intakes[0].accepted.is_empty());
    }

    #[test]
    fn test_first_topic_in_order_wins() {
        let topics = vec![topic("ZTNA", &["zero trust"], 1), topic("MFA", &["MFA"], 0)];
        let articles = vec![article("MFA for zero trust", "https://x/1")];
        let mut ledger = HistoryLedger::default();

        let categorized = Classifier::new(&topics).unwrap().categorize(&articles);
        let intakes = select_new(categorized, &document(2), &mut ledger, None);

        assert_eq!(intakes[0].topic.label, "ZTNA");
        assert_eq!(intakes[0].accepted.len(), 1);
        assert_eq!(intakes[1].found.len(), 1);
        assert!(intakes[1].accepted.is_empty());
    }

    #[test]
    fn test_same_link_from_two_feeds_is_accepted_once() {
        let topics = vec![topic("MFA", &["MFA"], 0)];
        let articles = vec![
            article("MFA news", "https://x/1"),
            article("MFA news (mirror)", "https://x/1"),
        ];
        let mut ledger = HistoryLedger::default();
        let categorized = Classifier::new(&topics).unwrap().categorize(&articles);
        let intakes = select_new(categorized, &document(1), &mut ledger, None);
        assert_eq!(intakes[0].accepted.len(), 1);
        assert_eq!(intakes[0].accepted[0].title.as_deref(), Some("MFA news"));
    }

    #[test]
    fn test_out_of_range_bucket_is_skipped() {
        let topics = vec![topic("SIEM", &["SIEM"], 3)];
        let articles = vec![article("SIEM rules", "https://x/1")];
        let mut ledger = HistoryLedger::default();
        let categorized = Classifier::new(&topics).unwrap().categorize(&articles);
        let intakes = select_new(categorized, &document(3), &mut ledger, None);
        assert!(intakes[0].skipped);
        assert!(intakes[0].accepted.is_empty());
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn test_cap_keeps_encounter_order_and_records_every_new_article() {
        let mut capped = topic("MFA", &["MFA"], 0);
        capped.max_articles = Some(2);
        let topics = vec![capped];
        let articles: Vec<Article> = (1..=4)
            .map(|i| article(&format!("MFA {i}"), &format!("https://x/{i}")))
            .collect();
        let mut ledger = HistoryLedger::default();

        let categorized = Classifier::new(&topics).unwrap().categorize(&articles);
        let intakes = select_new(categorized, &document(1), &mut ledger, None);
        let links: Vec<_> = intakes[0]
            .accepted
            .iter()
            .map(|e| e.link.as_deref().unwrap())
            .collect();
        assert_eq!(links, vec!["https://x/1", "https://x/2"]);
        assert_eq!(ledger.len(), 4);
        assert!(ledger.is_known(&fingerprint("https://x/3")));
        assert!(ledger.is_known(&fingerprint("https://x/4")));

        let mut ledger = HistoryLedger::default();
        let categorized = Classifier::new(&topics).unwrap().categorize(&articles);
        let intakes = select_new(categorized, &document(1), &mut ledger, Some(0));
        assert_eq!(intakes[0].accepted.len(), 4);
    }

    #[test]
    fn test_articles_past_the_cap_do_not_reach_later_topics() {
        let mut first = topic("MFA", &["MFA"], 0);
        first.max_articles = Some(1);
        let topics = vec![first, topic("ZTNA", &["zero trust"], 1)];
        let articles = vec![
            article("MFA one", "https://x/1"),
            article("MFA for zero trust", "https://x/2"),
        ];
        let mut ledger = HistoryLedger::default();

        let categorized = Classifier::new(&topics).unwrap().categorize(&articles);
        let intakes = select_new(categorized, &document(2), &mut ledger, None);
        assert_eq!(intakes[0].accepted.len(), 1);
        assert_eq!(intakes[1].found.len(), 1);
        assert!(intakes[1].accepted.is_empty());
    }

    #[test]
    fn test_effective_cap() {
        let mut t = topic("MFA", &[], 0);
        assert_eq!(effective_cap(&t, None), None);
        t.max_articles = Some(5);
        assert_eq!(effective_cap(&t, None), Some(5));
        assert_eq!(effective_cap(&t, Some(2)), Some(2));
        assert_eq!(effective_cap(&t, Some(0)), None);
    }

    #[test]
    fn test_accepted_entries_are_tagged() {
        let topics = vec![topic("MFA", &["MFA"], 0)];
        let articles = vec![article("MFA gardening", "https://x/1")];
        let mut ledger = HistoryLedger::default();
        let categorized = Classifier::new(&topics).unwrap().categorize(&articles);
        let intakes = select_new(categorized, &document(1), &mut ledger, None);
        assert_eq!(intakes[0].accepted[0].tags, vec!["MFA"]);
        assert_eq!(intakes[0].accepted[0].date.as_deref(), Some("5 Mars 2025"));
    }
}
