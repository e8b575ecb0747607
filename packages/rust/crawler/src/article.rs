//! Fail-soft article extraction.
//!
//! Every public operation here returns `Option`: non-2xx responses, transport
//! errors, undecodable bodies and pages without readable text are logged and
//! reported as `None`, never raised.

use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{debug, instrument, warn};
use url::Url;

use sourcepack_shared::http::{build_browser_client, parse_http_url};
use sourcepack_shared::{Result, SourcePackError};

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Main-content text recovered from a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    /// Final URL after redirects.
    pub url: String,
    pub title: Option<String>,
    pub published_at: Option<String>,
    /// Readable plain text, never empty.
    pub text: String,
}

/// Fetches pages with a desktop browser User-Agent and reduces them to text.
#[derive(Debug, Clone)]
pub struct ArticleExtractor {
    client: Client,
}

impl ArticleExtractor {
    /// Create an extractor with its own browser-flavoured HTTP client.
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_browser_client()?,
        })
    }

    /// Create an extractor that reuses an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetch `url` and extract its main article text.
    ///
    /// Returns `None` on any failure or when the page has no readable content.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn extract(&self, url: &str) -> Option<ExtractedArticle> {
        match self.try_extract(url).await {
            Ok(Some(article)) => {
                debug!(chars = article.text.len(), "article extracted");
                Some(article)
            }
            Ok(None) => {
                warn!("page has no readable content");
                None
            }
            Err(e) => {
                warn!(error = %e, "article extraction failed");
                None
            }
        }
    }

    /// Fetch a linked document and return its text.
    ///
    /// Markdown and plain-text bodies are kept as-is; HTML goes through the
    /// readability extractor.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch_document_text(&self, url: &str) -> Option<String> {
        let fetched = match self.fetch(url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(error = %e, "linked document fetch failed");
                return None;
            }
        };

        let text = if fetched.is_html() {
            sourcepack_text::extract(&fetched.body).text
        } else {
            fetched.body.trim().to_string()
        };

        if text.is_empty() {
            warn!("linked document is empty");
            None
        } else {
            Some(text)
        }
    }

    async fn try_extract(&self, url: &str) -> Result<Option<ExtractedArticle>> {
        let fetched = self.fetch(url).await?;
        let doc = sourcepack_text::extract(&fetched.body);

        if doc.text.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(ExtractedArticle {
            url: fetched.url.to_string(),
            title: doc.title,
            published_at: doc.published_at,
            text: doc.text,
        }))
    }

    async fn fetch(&self, url: &str) -> Result<FetchedBody> {
        let url = parse_http_url(url)?;

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, HTML_ACCEPT)
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

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let body = response
            .text()
            .await
            .map_err(|e| SourcePackError::Network(format!("{url}: body read failed: {e}")))?;

        Ok(FetchedBody {
            url: final_url,
            content_type,
            body,
        })
    }
}

struct FetchedBody {
    url: Url,
    content_type: String,
    body: String,
}

impl FetchedBody {
    fn is_html(&self) -> bool {
        if self.content_type.contains("html") {
            return true;
        }
        if self.content_type.contains("markdown") || self.content_type.starts_with("text/plain") {
            return false;
        }
        self.body.trim_start().starts_with('<')
    }
}
