//! Keyword classification of articles into topics, and secondary tagging.
//!
//! Matching runs over the lowercased concatenation of title, description and feed
//! tags. Short keywords (four characters or fewer, typically acronyms such as
//! `MFA` or `SIEM`) must match a whole word; longer keywords match anywhere.

use crate::models::{Article, TopicConfig};
use itertools::Itertools;
use regex::Regex;
use tracing::debug;

/// Keywords up to this many characters match as whole words only.
pub const ACRONYM_MAX_CHARS: usize = 4;
/// Cap on the tag list of a published entry.
pub const MAX_TAGS: usize = 6;

/// Secondary tags: label, then trigger substrings over lowercased title + description.
const TAG_RULES: &[(&str, &[&str])] = &[
    (
        "Vulnérabilité",
        &["vulnerability", "vulnérabilité", "cve-", "exploit", "flaw", "faille"],
    ),
    (
        "Sécurité",
        &["security", "sécurité", "secure", "sécurisé", "protection"],
    ),
    (
        "Entreprise",
        &["enterprise", "entreprise", "corporate", "business", "organization"],
    ),
    (
        "Infrastructure",
        &["infrastructure", "server", "serveur", "network", "réseau"],
    ),
    (
        "Innovation",
        &["innovation", "new", "launch", "nouveau", "announces", "annonce"],
    ),
    (
        "Failles",
        &["breach", "hack", "attack", "attaque", "compromis", "pirat"],
    ),
    (
        "Solutions",
        &["solution", "tool", "outil", "product", "produit", "platform"],
    ),
    (
        "Documentation",
        &["guide", "tutorial", "documentation", "how-to", "best practice"],
    ),
    (
        "Gouvernement",
        &["government", "gouvernement", "regulation", "réglementation", "cnil", "anssi", "nist"],
    ),
    ("Cloud", &["cloud", "aws", "azure", "gcp", "saas", "iaas"]),
    ("2AF", &["2fa", "a2f", "two-factor", "deux facteurs"]),
    (
        "Biométrie",
        &["biometric", "biométrie", "fingerprint", "facial", "empreinte"],
    ),
    (
        "Statistiques",
        &["report", "rapport", "survey", "étude", "market", "marché", "statistics"],
    ),
];

/// One compiled keyword.
#[derive(Debug, Clone)]
enum KeywordMatcher {
    Word(Regex),
    Substring(String),
}

impl KeywordMatcher {
    fn new(keyword: &str) -> Result<Self, regex::Error> {
        let kw = keyword.to_lowercase();
        if kw.chars().count() <= ACRONYM_MAX_CHARS {
            let pattern = format!(r"\b{}\b", regex::escape(&kw));
            Ok(KeywordMatcher::Word(Regex::new(&pattern)?))
        } else {
            Ok(KeywordMatcher::Substring(kw))
        }
    }

    fn is_match(&self, haystack: &str) -> bool {
        match self {
            KeywordMatcher::Word(re) => re.is_match(haystack),
            KeywordMatcher::Substring(kw) => haystack.contains(kw.as_str()),
        }
    }
}

/// Articles matched by one topic, in input order.
#[derive(Debug, Clone)]
pub struct TopicMatches<'a> {
    pub topic: &'a TopicConfig,
    pub articles: Vec<&'a Article>,
}

/// Compiled keyword sets for the run's topics.
#[derive(Debug, Clone)]
pub struct Classifier<'a> {
    topics: Vec<(&'a TopicConfig, Vec<KeywordMatcher>)>,
}

impl<'a> Classifier<'a> {
    /// Compile every topic's keywords once.
    ///
    /// Blank keywords are ignored.
    pub fn new(topics: &'a [TopicConfig]) -> Result<Self, regex::Error> {
        let topics = topics
            .iter()
            .map(|topic| {
                let matchers = topic
                    .keywords
                    .iter()
                    .map(|kw| kw.trim())
                    .filter(|kw| !kw.is_empty())
                    .map(KeywordMatcher::new)
                    .collect::<Result<Vec<_>, regex::Error>>()?;
                Ok((topic, matchers))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Classifier { topics })
    }

    /// Partition articles by topic. An article may appear under several topics.
    pub fn categorize(&self, articles: &'a [Article]) -> Vec<TopicMatches<'a>> {
        let mut out: Vec<TopicMatches<'a>> = self
            .topics
            .iter()
            .map(|(topic, _)| TopicMatches {
                topic: *topic,
                articles: Vec::new(),
            })
            .collect();

        for article in articles {
            let haystack = searchable_text(article);
            for (slot, (_, matchers)) in out.iter_mut().zip(&self.topics) {
                if matchers.iter().any(|m| m.is_match(&haystack)) {
                    slot.articles.push(article);
                }
            }
        }

        for slot in &out {
            debug!(topic = %slot.topic.label, matched = slot.articles.len(), "Categorized articles");
        }
        out
    }
}

fn searchable_text(article: &Article) -> String {
    format!(
        "{} {} {}",
        article.title,
        article.description,
        article.tags.join(" ")
    )
    .to_lowercase()
}

/// Tags for a published entry: feed tags, then rule labels, else the topic label.
///
/// Deduplicated case-insensitively (first spelling wins) and capped at [`MAX_TAGS`].
pub fn auto_tag(article: &Article, topic_label: &str) -> Vec<String> {
    let mut tags = article.tags.clone();
    let combined = format!("{} {}", article.title, article.description).to_lowercase();

    for (label, triggers) in TAG_RULES {
        if tags.iter().any(|t| t == label) {
            continue;
        }
        if triggers.iter().any(|kw| combined.contains(kw)) {
            tags.push((*label).to_string());
        }
    }

    if tags.is_empty() {
        tags.push(topic_label.to_string());
    }

    tags.into_iter()
        .unique_by(|t| t.to_lowercase())
        .take(MAX_TAGS)
        .collect()
}
