//! Syndication feed resolution.
//!
//! Fetches an RSS or Atom document, parses it, and turns the first N items
//! into archive [`Entry`] values. Per-item extraction problems degrade that
//! single entry and never abort the batch.

mod parser;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use reqwest::header::ACCEPT;
use tracing::{debug, info, instrument, warn};
use url::Url;

use sourcepack_crawler::ArticleExtractor;
use sourcepack_shared::http::parse_http_url;
use sourcepack_shared::{Entry, ProgressReporter, Result, SourceMetadata, SourcePackError};
use sourcepack_text::html_to_text;

pub use parser::{FeedItem, FeedKind, ParsedFeed, parse_feed};

/// `Accept` header sent with feed requests.
pub const FEED_ACCEPT: &str = "application/rss+xml, application/atom+xml, \
     application/xml;q=0.9, text/xml;q=0.8, */*;q=0.5";

/// Options for [`resolve_feed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedOptions {
    /// Number of items to turn into entries (already clamped by the caller).
    pub item_limit: usize,
    /// Fetch each item's page and prefer the extracted article text.
    pub full_articles: bool,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            item_limit: sourcepack_shared::slug::DEFAULT_ITEM_LIMIT,
            full_articles: false,
        }
    }
}

/// Entries plus the channel-level metadata of a resolved feed.
#[derive(Debug, Clone)]
pub struct ResolvedFeed {
    pub metadata: SourceMetadata,
    pub entries: Vec<Entry>,
    /// Number of items the feed advertised before the limit was applied.
    pub total_items: usize,
}

/// Return the first candidate holding non-blank text.
///
/// Candidates are evaluated lazily, so later producers only run when every
/// earlier one came back empty.
pub fn first_non_empty<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .find(|text| !text.trim().is_empty())
}

/// Normalize a feed timestamp to RFC 3339 (UTC); unparseable values are kept raw.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| {
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        })
        .unwrap_or_else(|_| raw.to_string())
}

/// Fetch, parse and resolve a feed into entries.
///
/// Failures: invalid URL (500), non-2xx or transport error (502), unparseable
/// document (422), zero items (404).
#[instrument(skip_all, fields(feed_url = %feed_url, limit = opts.item_limit))]
pub async fn resolve_feed(
    client: &Client,
    extractor: &ArticleExtractor,
    feed_url: &str,
    opts: &FeedOptions,
    progress: &dyn ProgressReporter,
) -> Result<ResolvedFeed> {
    let url = parse_http_url(feed_url)?;

    progress.phase("Fetching feed");
    let body = fetch_feed(client, &url).await?;

    progress.phase("Parsing feed");
    let feed = parse_feed(&body)?;
    if feed.items.is_empty() {
        return Err(SourcePackError::empty(format!(
            "the feed at {url} does not contain any items"
        )));
    }

    let metadata = source_metadata(&feed, &url);
    let feed_link = metadata.url.clone();
    let total = feed.items.len().min(opts.item_limit);
    let mut entries = Vec::with_capacity(total);

    for (index, item) in feed.items.iter().take(opts.item_limit).enumerate() {
        let title = item
            .title
            .as_deref()
            .map(clean_inline)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("Entry {}", index + 1));
        progress.item(&title, index + 1, total);

        // Relative item links join against the feed URL; linkless items take the channel link.
        let item_url = item
            .permalink()
            .and_then(|link| url.join(link).ok())
            .map(String::from)
            .unwrap_or_else(|| feed_link.clone());

        let feed_text = first_non_empty(
            [
                item.content_encoded.as_deref(),
                item.content.as_deref(),
                item.summary.as_deref(),
            ]
            .into_iter()
            .map(|candidate| candidate.map(html_to_text)),
        );

        let article_text = if opts.full_articles {
            extractor.extract(&item_url).await.map(|article| article.text)
        } else {
            None
        };

        let text = first_non_empty([article_text, feed_text]);
        if text.is_none() {
            warn!(item = index + 1, url = %item_url, "no content for feed item, using placeholder");
        }

        let published_at = item.timestamp().map(normalize_date);
        entries.push(Entry::new(
            index,
            title,
            item_url,
            published_at,
            text.unwrap_or_default(),
        ));
    }

    info!(
        entries = entries.len(),
        total_items = feed.items.len(),
        "feed resolved"
    );

    Ok(ResolvedFeed {
        metadata,
        entries,
        total_items: feed.items.len(),
    })
}

async fn fetch_feed(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "fetching feed");

    let response = client
        .get(url.clone())
        .header(ACCEPT, FEED_ACCEPT)
        .send()
        .await
        .map_err(|e| SourcePackError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourcePackError::Upstream {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response
        .text()
        .await
        .map_err(|e| SourcePackError::Network(format!("{url}: body read failed: {e}")))
}

fn source_metadata(feed: &ParsedFeed, url: &Url) -> SourceMetadata {
    let title = feed
        .title
        .as_deref()
        .map(clean_inline)
        .filter(|t| !t.is_empty())
        .or_else(|| url.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string());

    let description = feed
        .description
        .as_deref()
        .map(clean_inline)
        .unwrap_or_default();

    let link = feed
        .link
        .as_deref()
        .and_then(|link| url.join(link.trim()).ok())
        .map(String::from)
        .unwrap_or_else(|| url.to_string());

    SourceMetadata {
        title,
        description,
        url: link,
    }
}

/// Single-line text for titles and descriptions that may carry markup.
fn clean_inline(raw: &str) -> String {
    let text = if raw.contains('<') || raw.contains('&') {
        html_to_text(raw)
    } else {
        raw.to_string()
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
