//! Firecrawl-compatible mapping and scraping over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use sourcepack_shared::{Result, SourcePackError};

use super::{PageScraper, ScrapedPage, SiteMapper};

/// Explicit timeout for a single scrape call.
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(30);

const MAPPING: &str = "mapping";
const SCRAPE: &str = "scrape";

/// Client for `POST /v1/map` and `POST /v1/scrape`.
#[derive(Debug, Clone)]
pub struct FirecrawlClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct MapRequest<'a> {
    url: &'a str,
    limit: usize,
}

#[derive(Deserialize)]
struct MapResponse {
    #[serde(default = "default_true")]
    success: bool,
    #[serde(default)]
    links: Vec<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'a str; 1],
    only_main_content: bool,
    timeout: u64,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    #[serde(default = "default_true")]
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    metadata: Option<Value>,
}

fn default_true() -> bool {
    true
}

impl FirecrawlClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::with_client(
            sourcepack_shared::http::build_client()?,
            base_url,
            api_key,
        ))
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn post<B, R>(&self, service: &str, path: &str, body: &B, timeout: Option<Duration>) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let mut request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourcePackError::service(service, format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourcePackError::service(
                service,
                format!("{url} returned HTTP {}", status.as_u16()),
            ));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| SourcePackError::service(service, format!("invalid response: {e}")))
    }
}

#[async_trait]
impl SiteMapper for FirecrawlClient {
    #[instrument(skip_all, fields(site = site, limit = limit))]
    async fn map(&self, site: &str, limit: usize) -> Result<Vec<String>> {
        let body = MapRequest { url: site, limit };
        let response: MapResponse = self.post(MAPPING, "/v1/map", &body, None).await?;

        if !response.success {
            return Err(SourcePackError::service(
                MAPPING,
                response.error.unwrap_or_else(|| "request was not successful".into()),
            ));
        }

        // Links are plain strings in v1 and `{ url, title }` objects in later versions.
        let urls: Vec<String> = response
            .links
            .iter()
            .filter_map(|link| match link {
                Value::String(url) => Some(url.clone()),
                Value::Object(obj) => obj.get("url").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .take(limit)
            .collect();

        debug!(count = urls.len(), "site mapped");
        Ok(urls)
    }
}

#[async_trait]
impl PageScraper for FirecrawlClient {
    #[instrument(skip_all, fields(url = url))]
    async fn scrape(&self, url: &str) -> Result<ScrapedPage> {
        let body = ScrapeRequest {
            url,
            formats: ["markdown"],
            only_main_content: true,
            timeout: SCRAPE_TIMEOUT.as_millis() as u64,
        };
        let response: ScrapeResponse = self
            .post(SCRAPE, "/v1/scrape", &body, Some(SCRAPE_TIMEOUT))
            .await?;

        if !response.success {
            return Err(SourcePackError::service(
                SCRAPE,
                response.error.unwrap_or_else(|| "request was not successful".into()),
            ));
        }

        let data = response
            .data
            .ok_or_else(|| SourcePackError::service(SCRAPE, format!("{url}: no data returned")))?;
        let markdown = data.markdown.unwrap_or_default();
        if markdown.trim().is_empty() {
            return Err(SourcePackError::service(
                SCRAPE,
                format!("{url}: empty markdown"),
            ));
        }

        let meta = |key: &str| {
            data.metadata
                .as_ref()
                .and_then(|m| m.get(key))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(ScrapedPage {
            url: meta("sourceURL").unwrap_or_else(|| url.to_string()),
            title: meta("title"),
            description: meta("description"),
            markdown,
        })
    }
}
