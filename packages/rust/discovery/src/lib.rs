//! llms.txt / llms-full.txt probing.
//!
//! Sites following <https://llmstxt.org/> publish a short link index at
//! `/llms.txt` and, optionally, their full documentation concatenated at
//! `/llms-full.txt`. This crate fetches one of those well-known paths from the
//! site origin and parses the result.

mod parser;

use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use sourcepack_shared::http::origin_url;
use sourcepack_shared::{Result, SourcePackError};

pub use parser::{LlmsDocument, parse_llms_document};

/// Maximum response size we consider valid (10 MB).
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Probe types
// ---------------------------------------------------------------------------

/// Which well-known document a probe targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeTarget {
    /// `/llms-full.txt`: the full documentation text.
    LlmsFull,
    /// `/llms.txt`: the short link index.
    Llms,
}

impl ProbeTarget {
    /// File name at the site origin, also used as the source tag.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::LlmsFull => "llms-full.txt",
            Self::Llms => "llms.txt",
        }
    }
}

/// A successfully fetched llms document.
#[derive(Debug, Clone)]
pub struct ProbedDocument {
    pub target: ProbeTarget,
    /// Absolute URL the document was fetched from.
    pub url: String,
    /// Raw body, trimmed.
    pub content: String,
    pub parsed: LlmsDocument,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Probe `<origin>/llms-full.txt`.
pub async fn probe_llms_full(client: &Client, site: &Url) -> Result<ProbedDocument> {
    probe(client, site, ProbeTarget::LlmsFull).await
}

/// Probe `<origin>/llms.txt`.
pub async fn probe_llms(client: &Client, site: &Url) -> Result<ProbedDocument> {
    probe(client, site, ProbeTarget::Llms).await
}

/// Fetch and parse one well-known document at the site origin.
///
/// Fails on transport errors, non-2xx status, an empty body, or a body that
/// is clearly an HTML page rather than a text document.
#[instrument(skip_all, fields(site = %site, target = target.file_name()))]
pub async fn probe(client: &Client, site: &Url, target: ProbeTarget) -> Result<ProbedDocument> {
    let origin = origin_url(site)?;
    let url = format!("{origin}/{}", target.file_name());
    let base = Url::parse(&format!("{origin}/"))
        .map_err(|e| SourcePackError::invalid_url(&origin, e))?;

    let content = fetch_and_validate(client, &url).await?;
    let parsed = parse_llms_document(&content, &base);

    info!(
        %url,
        title = parsed.title.as_deref().unwrap_or(""),
        links = parsed.links.len(),
        "llms document found"
    );

    Ok(ProbedDocument {
        target,
        url,
        content,
        parsed,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a URL and validate the response is a non-empty text document.
async fn fetch_and_validate(client: &Client, url: &str) -> Result<String> {
    debug!(%url, "probing");

    let response = client
        .get(url)
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

    if let Some(len) = response.content_length() {
        if len > MAX_RESPONSE_SIZE {
            return Err(SourcePackError::validation(format!(
                "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
            )));
        }
    }

    let body = response
        .text()
        .await
        .map_err(|e| SourcePackError::Network(format!("{url}: failed to read body: {e}")))?;

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(SourcePackError::empty(format!("{url}: document is empty")));
    }

    // SPA hosts often answer every path with their HTML shell.
    let head = trimmed.chars().take(64).collect::<String>().to_ascii_lowercase();
    if head.starts_with("<!doctype html") || head.starts_with("<html") {
        return Err(SourcePackError::parse(
            "llms document",
            format!("{url} returned an HTML page"),
        ));
    }

    Ok(trimmed.to_string())
}
