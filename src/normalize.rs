//! Mapping of raw feed entries to [`Article`]s.
//!
//! Each logical field has its own function with an explicit fallback chain:
//!
//! | Field | Order |
//! |-------|-------|
//! | link | `link`, then a permalink `guid` |
//! | date | parsed `published`, parsed `updated`, raw `published`, raw `updated` |
//! | description | `summary`, `description`, `content` |
//! | image | image `media:content`, `media:thumbnail`, image enclosure, first `<img>` |
//!
//! An entry without a title or a link is rejected here and never becomes an article.

use crate::feeds::parser::RawEntry;
use crate::models::{Article, FeedSource};
use crate::utils::format_date_fr;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Maximum description length, ellipsis included.
pub const MAX_DESCRIPTION_CHARS: usize = 500;
const ELLIPSIS: &str = "...";
const MAX_FEED_TAGS: usize = 5;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_IMG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<img[^>]+src=["']([^"']+)["']"#).unwrap());

/// Build an article from a raw entry, or `None` when the entry has no title or link.
///
/// `base` resolves relative links and image URLs, usually the feed URL.
pub fn normalize_entry(
    entry: &RawEntry,
    source: &FeedSource,
    base: Option<&Url>,
    fetched_at: DateTime<Utc>,
) -> Option<Article> {
    let title = clean_html(entry.title.as_deref().unwrap_or_default());
    let title = title.trim();
    if title.is_empty() {
        return None;
    }
    let link = entry_link(entry, base)?;

    Some(Article {
        title: title.to_string(),
        link,
        published_date: entry_date(entry),
        description: entry_description(entry),
        image_url: entry_image(entry).map(|url| resolve(&url, base)),
        source_name: source.name.clone(),
        language: source.language.clone(),
        tags: entry_tags(entry),
        fetched_at,
    })
}

/// The entry's link, falling back to a `guid` that is a permalink URL.
pub fn entry_link(entry: &RawEntry, base: Option<&Url>) -> Option<String> {
    let from_link = entry
        .link
        .as_deref()
        .map(str::trim)
        .filter(|link| !link.is_empty());
    let from_guid = || {
        entry
            .guid
            .as_deref()
            .map(str::trim)
            .filter(|_| entry.guid_is_permalink)
            .filter(|guid| guid.starts_with("http://") || guid.starts_with("https://"))
    };
    from_link.or_else(from_guid).map(|link| resolve(link, base))
}

/// Display date for the entry; `None` when the feed gave nothing usable.
pub fn entry_date(entry: &RawEntry) -> Option<String> {
    let parsed = entry
        .published
        .as_deref()
        .and_then(parse_feed_date)
        .or_else(|| entry.updated.as_deref().and_then(parse_feed_date));
    if let Some(dt) = parsed {
        return Some(format_date_fr(dt.with_timezone(&Local).date_naive()));
    }
    entry
        .published
        .as_deref()
        .or(entry.updated.as_deref())
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(str::to_string)
}

/// Parse the date formats found in RSS and Atom feeds.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    let utc = FixedOffset::east_opt(0)?;
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return utc.from_local_datetime(&naive).single();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return utc.from_local_datetime(&date.and_hms_opt(12, 0, 0)?).single();
    }
    None
}

/// Plain-text description, truncated to [`MAX_DESCRIPTION_CHARS`].
pub fn entry_description(entry: &RawEntry) -> String {
    let html = entry
        .summary
        .as_deref()
        .or(entry.description.as_deref())
        .or(entry.content.as_deref())
        .unwrap_or_default();
    truncate_description(&clean_html(html))
}

/// Strip markup, collapse whitespace and decode the common HTML entities.
pub fn clean_html(text: &str) -> String {
    let stripped = RE_TAGS.replace_all(text, "");
    let collapsed = RE_WS.replace_all(&stripped, " ");
    collapsed
        .trim()
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

/// Cut to 497 characters plus `...` when longer than 500 characters.
pub fn truncate_description(text: &str) -> String {
    if text.chars().count() <= MAX_DESCRIPTION_CHARS {
        return text.to_string();
    }
    let keep = MAX_DESCRIPTION_CHARS - ELLIPSIS.len();
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// First image URL found for the entry.
pub fn entry_image(entry: &RawEntry) -> Option<String> {
    let from_media = entry
        .media_content
        .iter()
        .find(|media| {
            media.medium.as_deref() == Some("image")
                || media.mime_type.as_deref().is_some_and(|t| t.contains("image"))
        })
        .and_then(|media| media.url.clone());
    if from_media.is_some() {
        return from_media;
    }

    if let Some(thumbnail) = entry.media_thumbnails.first() {
        return Some(thumbnail.clone());
    }

    let from_enclosure = entry
        .enclosures
        .iter()
        .find(|enc| enc.mime_type.as_deref().is_some_and(|t| t.contains("image")))
        .and_then(|enc| enc.url.clone());
    if from_enclosure.is_some() {
        return from_enclosure;
    }

    let html = entry
        .summary
        .as_deref()
        .or(entry.description.as_deref())
        .unwrap_or_default();
    RE_IMG
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Up to five feed category terms.
pub fn entry_tags(entry: &RawEntry) -> Vec<String> {
    entry
        .categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .take(MAX_FEED_TAGS)
        .map(str::to_string)
        .collect()
}

fn resolve(href: &str, base: Option<&Url>) -> String {
    match base {
        Some(base) if Url::parse(href).is_err() => base
            .join(href)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| href.to_string()),
        _ => href.to_string(),
    }
}
