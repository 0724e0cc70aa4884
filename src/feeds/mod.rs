//! Feed retrieval.
//!
//! Every configured source is fetched once per run through a bounded pool of
//! concurrent requests. A source that fails (network error, bad status, timeout,
//! unparseable body) contributes zero articles and a warning; it never aborts the
//! run. Articles from one source keep feed order; sources are unioned in
//! completion order.

pub mod parser;

use crate::error::FeedError;
use crate::models::{Article, FeedSource};
use crate::normalize::normalize_entry;
use crate::utils::truncate_for_log;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Default number of sources fetched at once.
pub const DEFAULT_WORKERS: usize = 8;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with a per-request timeout.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

async fn download(client: &Client, url: &str) -> Result<String, FeedError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Status(status));
    }
    Ok(response.text().await?)
}

/// Fetch and normalize one source.
///
/// Never fails: problems are logged and yield whatever could be salvaged,
/// usually nothing.
#[instrument(level = "info", skip_all, fields(source = %source.name))]
pub async fn fetch_feed(client: &Client, source: &FeedSource) -> Vec<Article> {
    let body = match download(client, &source.url).await {
        Ok(body) => body,
        Err(e) => {
            warn!(url = %source.url, error = %e, "Feed retrieval failed; skipping source");
            return Vec::new();
        }
    };
    debug!(bytes = body.len(), "Downloaded feed");

    let parsed = parser::parse_feed(&body);
    if let Some(e) = &parsed.error {
        if parsed.entries.is_empty() {
            warn!(
                url = %source.url,
                error = %e,
                body = %truncate_for_log(&body, 200),
                "Feed could not be parsed; skipping source"
            );
            return Vec::new();
        }
        warn!(
            url = %source.url,
            error = %e,
            entries = parsed.entries.len(),
            "Feed is malformed; keeping entries read before the error"
        );
    }

    let base = Url::parse(&source.url).ok();
    let fetched_at = Utc::now();
    let articles: Vec<Article> = parsed
        .entries
        .iter()
        .filter_map(|entry| normalize_entry(entry, source, base.as_ref(), fetched_at))
        .collect();

    let dropped = parsed.entries.len() - articles.len();
    if dropped > 0 {
        debug!(dropped, "Dropped entries without title or link");
    }
    info!(count = articles.len(), "Fetched feed");
    articles
}

/// Fetch every source with at most `workers` requests in flight.
#[instrument(level = "info", skip_all, fields(sources = sources.len(), workers = workers))]
pub async fn fetch_all(client: &Client, sources: &[FeedSource], workers: usize) -> Vec<Article> {
    let per_source: Vec<Vec<Article>> = stream::iter(sources)
        .map(|source| fetch_feed(client, source))
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    let articles: Vec<Article> = per_source.into_iter().flatten().collect();
    info!(count = articles.len(), "Retrieved articles from all sources");
    articles
}
