//! Best-effort streaming parser for RSS and Atom documents.
//!
//! The parser walks `quick-xml` events and collects, for each `<item>` (RSS) or
//! `<entry>` (Atom), the handful of fields the normalizer needs into a
//! [`RawEntry`]. Nothing is interpreted here: dates stay strings, HTML stays HTML.
//!
//! A reader error stops the walk but keeps the entries completed so far; the
//! caller decides whether a partial result is worth keeping.

use crate::error::FeedError;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// A `media:content` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaContent {
    pub url: Option<String>,
    pub medium: Option<String>,
    pub mime_type: Option<String>,
}

/// An `<enclosure>` element or an Atom `rel="enclosure"` link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enclosure {
    pub url: Option<String>,
    pub mime_type: Option<String>,
}

/// One feed entry, as found in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub guid: Option<String>,
    /// `false` only when the feed says `isPermaLink="false"`.
    pub guid_is_permalink: bool,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub media_content: Vec<MediaContent>,
    pub media_thumbnails: Vec<String>,
    pub enclosures: Vec<Enclosure>,
    pub categories: Vec<String>,
}

/// Result of parsing one document.
#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub entries: Vec<RawEntry>,
    /// Set when the document was malformed or not a feed at all.
    pub error: Option<FeedError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Guid,
    Published,
    Updated,
    Summary,
    Description,
    Content,
    Category,
}

impl Field {
    fn from_name(name: &str) -> Option<Field> {
        let field = match name {
            "title" => Field::Title,
            "link" => Field::Link,
            "guid" => Field::Guid,
            "pubDate" | "published" | "dc:date" | "issued" => Field::Published,
            "updated" | "modified" | "atom:updated" => Field::Updated,
            "summary" => Field::Summary,
            "description" => Field::Description,
            "content:encoded" | "content" => Field::Content,
            "category" => Field::Category,
            _ => return None,
        };
        Some(field)
    }
}

/// Text capture for the field element currently open.
struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

/// Parse a feed document.
pub fn parse_feed(xml: &str) -> ParsedFeed {
    let mut reader = Reader::from_str(xml);

    let mut parsed = ParsedFeed::default();
    let mut saw_feed_root = false;
    let mut depth = 0usize;
    let mut current: Option<RawEntry> = None;
    let mut entry_depth = 0usize;
    let mut capture: Option<Capture> = None;
    // Open `<source>` inside the current entry: it describes the originating feed,
    // not the entry.
    let mut source_depth: Option<usize> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = element_name(&e);
                if is_feed_root(&name) {
                    saw_feed_root = true;
                }
                if current.is_none() {
                    if name == "item" || name == "entry" {
                        current = Some(RawEntry {
                            guid_is_permalink: true,
                            ..RawEntry::default()
                        });
                        entry_depth = depth;
                    }
                    continue;
                }
                if capture.is_some() || source_depth.is_some() {
                    continue;
                }
                if name == "source" {
                    source_depth = Some(depth);
                    continue;
                }
                if let Some(entry) = current.as_mut() {
                    apply_attributes(entry, &name, &e);
                    if let Some(field) = Field::from_name(&name) {
                        capture = Some(Capture {
                            field,
                            depth,
                            text: String::new(),
                        });
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = element_name(&e);
                if capture.is_none() && source_depth.is_none() {
                    if let Some(entry) = current.as_mut() {
                        apply_attributes(entry, &name, &e);
                    }
                }
            }
            Ok(Event::End(_)) => {
                if source_depth == Some(depth) {
                    source_depth = None;
                }
                if let Some(cap) = capture.take_if(|cap| cap.depth == depth) {
                    if let Some(entry) = current.as_mut() {
                        store_field(entry, cap.field, cap.text);
                    }
                }
                if current.is_some() && depth == entry_depth {
                    if let Some(entry) = current.take() {
                        parsed.entries.push(entry);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(e)) => {
                if let Some(cap) = capture.as_mut() {
                    let text = match e.unescape() {
                        Ok(text) => text.into_owned(),
                        // HTML entities such as &nbsp; are not XML; keep them raw for
                        // the normalizer to decode.
                        Err(_) => String::from_utf8_lossy(&e).into_owned(),
                    };
                    cap.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(cap) = capture.as_mut() {
                    cap.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(source) => {
                parsed.error = Some(FeedError::Xml {
                    position: reader.buffer_position() as u64,
                    source,
                });
                return parsed;
            }
            _ => {}
        }
    }

    if !saw_feed_root && parsed.entries.is_empty() {
        parsed.error = Some(FeedError::NotAFeed);
    }
    parsed
}

fn is_feed_root(name: &str) -> bool {
    matches!(name, "rss" | "feed" | "rdf:RDF" | "RDF" | "channel")
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key.as_bytes())
        .map(|attr| match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        })
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Record what an element carries in its attributes.
fn apply_attributes(entry: &mut RawEntry, name: &str, e: &BytesStart) {
    match name {
        "link" => {
            let Some(href) = attribute(e, "href") else {
                return;
            };
            match attribute(e, "rel").as_deref() {
                None | Some("alternate") => {
                    if entry.link.is_none() {
                        entry.link = Some(href);
                    }
                }
                Some("enclosure") => entry.enclosures.push(Enclosure {
                    url: Some(href),
                    mime_type: attribute(e, "type"),
                }),
                Some(_) => {}
            }
        }
        "guid" => {
            entry.guid_is_permalink = attribute(e, "isPermaLink")
                .is_none_or(|v| !v.eq_ignore_ascii_case("false"));
        }
        "category" => {
            if let Some(term) = attribute(e, "term") {
                entry.categories.push(term);
            }
        }
        "media:content" => entry.media_content.push(MediaContent {
            url: attribute(e, "url"),
            medium: attribute(e, "medium"),
            mime_type: attribute(e, "type"),
        }),
        "media:thumbnail" => {
            if let Some(url) = attribute(e, "url") {
                entry.media_thumbnails.push(url);
            }
        }
        "enclosure" => entry.enclosures.push(Enclosure {
            url: attribute(e, "url"),
            mime_type: attribute(e, "type"),
        }),
        _ => {}
    }
}

fn store_field(entry: &mut RawEntry, field: Field, text: String) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return;
    }
    let trimmed = trimmed.to_string();

    let slot = match field {
        Field::Title => &mut entry.title,
        Field::Link => &mut entry.link,
        Field::Guid => &mut entry.guid,
        Field::Published => &mut entry.published,
        Field::Updated => &mut entry.updated,
        Field::Summary => &mut entry.summary,
        Field::Description => &mut entry.description,
        Field::Content => &mut entry.content,
        Field::Category => {
            // Atom categories already contributed their `term`.
            if !entry.categories.contains(&trimmed) {
                entry.categories.push(trimmed);
            }
            return;
        }
    };
    if slot.is_none() {
        *slot = Some(trimmed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Security Weekly</title>
    <link>https://news.example.com</link>
    <item>
      <title>New MFA bypass &amp; phishing kit</title>
      <link>https://news.example.com/mfa-bypass</link>
      <guid isPermaLink="false">abc-123</guid>
      <pubDate>Wed, 05 Mar 2025 10:30:00 GMT</pubDate>
      <description><![CDATA[<p>Attackers <b>relay</b> tokens.</p><img src="https://img.example.com/a.png">]]></description>
      <category>Identity</category>
      <category>Phishing</category>
      <media:content url="https://img.example.com/media.jpg" medium="image" />
      <enclosure url="https://img.example.com/enc.jpg" type="image/jpeg" length="123" />
    </item>
    <item>
      <title>Untitled link-less item</title>
      <guid>https://news.example.com/from-guid</guid>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Vendor blog</title>
  <entry>
    <title type="html">Zero trust &lt;b&gt;rollout&lt;/b&gt;</title>
    <link rel="self" href="https://vendor.example/self"/>
    <link rel="alternate" href="https://vendor.example/ztna"/>
    <link rel="enclosure" type="image/png" href="https://vendor.example/cover.png"/>
    <published>2025-03-05T10:30:00Z</published>
    <updated>2025-03-06T08:00:00Z</updated>
    <summary>Short summary</summary>
    <content type="html">&lt;p&gt;Long content&lt;/p&gt;</content>
    <category term="ZTNA"/>
    <category term="Cloud"/>
  </entry>
</feed>"#;

    #[test]
    fn test_parses_rss_items() {
        let parsed = parse_feed(RSS);
        assert!(parsed.error.is_none());
        assert_eq!(parsed.entries.len(), 2);

        let first = &parsed.entries[0];
        assert_eq!(first.title.as_deref(), Some("New MFA bypass & phishing kit"));
        assert_eq!(first.link.as_deref(), Some("https://news.example.com/mfa-bypass"));
        assert_eq!(first.guid.as_deref(), Some("abc-123"));
        assert!(!first.guid_is_permalink);
        assert_eq!(first.published.as_deref(), Some("Wed, 05 Mar 2025 10:30:00 GMT"));
        assert!(first.description.as_deref().unwrap().contains("<b>relay</b>"));
        assert_eq!(first.categories, vec!["Identity", "Phishing"]);
        assert_eq!(first.media_content.len(), 1);
        assert_eq!(first.media_content[0].medium.as_deref(), Some("image"));
        assert_eq!(first.enclosures[0].mime_type.as_deref(), Some("image/jpeg"));

        let second = &parsed.entries[1];
        assert!(second.link.is_none());
        assert!(second.guid_is_permalink);
        assert_eq!(second.guid.as_deref(), Some("https://news.example.com/from-guid"));
    }

    #[test]
    fn test_channel_fields_do_not_leak_into_entries() {
        let parsed = parse_feed(RSS);
        assert!(parsed.entries.iter().all(|e| e.title.as_deref() != Some("Security Weekly")));
    }

    #[test]
    fn test_parses_atom_entries() {
        let parsed = parse_feed(ATOM);
        assert!(parsed.error.is_none());
        assert_eq!(parsed.entries.len(), 1);

        let entry = &parsed.entries[0];
        assert_eq!(entry.title.as_deref(), Some("Zero trust <b>rollout</b>"));
        assert_eq!(entry.link.as_deref(), Some("https://vendor.example/ztna"));
        assert_eq!(entry.published.as_deref(), Some("2025-03-05T10:30:00Z"));
        assert_eq!(entry.updated.as_deref(), Some("2025-03-06T08:00:00Z"));
        assert_eq!(entry.summary.as_deref(), Some("Short summary"));
        assert_eq!(entry.content.as_deref(), Some("<p>Long content</p>"));
        assert_eq!(entry.categories, vec!["ZTNA", "Cloud"]);
        assert_eq!(entry.enclosures.len(), 1);
        assert_eq!(entry.enclosures[0].url.as_deref(), Some("https://vendor.example/cover.png"));
    }

    #[test]
    fn test_atom_source_metadata_does_not_leak_into_entry() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
            <entry>
                <source>
                    <title>Origin feed</title>
                    <link href="https://origin.example/"/>
                    <updated>2020-01-01T00:00:00Z</updated>
                    <category term="Origin"/>
                </source>
                <title>Republished story</title>
                <link href="https://aggregator.example/story"/>
                <published>2025-03-05T10:30:00Z</published>
            </entry>
        </feed>"#;
        let parsed = parse_feed(xml);
        assert!(parsed.error.is_none());
        assert_eq!(parsed.entries.len(), 1);

        let entry = &parsed.entries[0];
        assert_eq!(entry.title.as_deref(), Some("Republished story"));
        assert_eq!(entry.link.as_deref(), Some("https://aggregator.example/story"));
        assert!(entry.updated.is_none());
        assert!(entry.categories.is_empty());
    }

    #[test]
    fn test_html_page_is_not_a_feed() {
        let parsed = parse_feed("<html><body><p>Maintenance</p></body></html>");
        assert!(parsed.entries.is_empty());
        assert!(matches!(parsed.error, Some(FeedError::NotAFeed)));
    }

    #[test]
    fn test_malformed_document_keeps_completed_entries() {
        let xml = r#"<rss><channel>
            <item><title>Complete</title><link>https://x.example/1</link></item>
            <item><title>Broken</title></wrong>
        </channel></rss>"#;
        let parsed = parse_feed(xml);
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].title.as_deref(), Some("Complete"));
        assert!(matches!(parsed.error, Some(FeedError::Xml { .. })));
    }

    #[test]
    fn test_empty_channel_is_not_an_error() {
        let parsed = parse_feed(r#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#);
        assert!(parsed.entries.is_empty());
        assert!(parsed.error.is_none());
    }
}
