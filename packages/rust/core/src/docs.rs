//! Documentation-site resolution.
//!
//! Resolution order:
//! 1. `<origin>/llms-full.txt`
//! 2. generation (map → scrape → annotate), only when both service keys are set
//! 3. `<origin>/llms.txt`, only when generation was not attempted
//!
//! If every branch fails the caller gets [`SourcePackError::NoDocument`].

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument, warn};
use url::Url;

use sourcepack_crawler::ArticleExtractor;
use sourcepack_discovery::{ProbeTarget, ProbedDocument, probe_llms, probe_llms_full};
use sourcepack_shared::http::parse_http_url;
use sourcepack_shared::{AppConfig, DocLink, ProgressReporter, Result, SourcePackError};

use crate::generation::{GenerationOptions, GenerationServices, generate_documents};
use crate::services::{ChatAnnotator, FirecrawlClient};

/// Default number of linked documents fetched from an `llms.txt` index.
pub const DEFAULT_LINK_LIMIT: usize = 20;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// API keys for the mapping and annotation services.
#[derive(Clone, PartialEq, Eq)]
pub struct GenerationCredentials {
    pub mapping_api_key: String,
    pub annotation_api_key: String,
}

impl GenerationCredentials {
    /// Both keys, or nothing: generation needs the pair.
    pub fn from_parts(mapping: Option<String>, annotation: Option<String>) -> Option<Self> {
        match (mapping, annotation) {
            (Some(mapping_api_key), Some(annotation_api_key)) => Some(Self {
                mapping_api_key,
                annotation_api_key,
            }),
            _ => None,
        }
    }
}

impl std::fmt::Debug for GenerationCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationCredentials")
            .field("mapping_api_key", &"<redacted>")
            .field("annotation_api_key", &"<redacted>")
            .finish()
    }
}

/// Where the generation services live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub mapping_base_url: String,
    pub annotation_base_url: String,
    pub annotation_model: String,
}

impl ServiceEndpoints {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            mapping_base_url: config.mapping.base_url.clone(),
            annotation_base_url: config.annotation.base_url.clone(),
            annotation_model: config.annotation.model.clone(),
        }
    }
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Options for [`resolve_docs`].
#[derive(Debug, Clone)]
pub struct DocsOptions {
    /// Page budget for generation, already clamped to `[1, 50]`.
    pub max_pages: usize,
    pub credentials: Option<GenerationCredentials>,
    pub endpoints: ServiceEndpoints,
    /// Fetch the documents an `llms.txt` index links to.
    pub resolve_links: bool,
    pub link_limit: usize,
    /// Pause between generated pages.
    pub delay: Duration,
}

impl Default for DocsOptions {
    fn default() -> Self {
        let generation = GenerationOptions::default();
        Self {
            max_pages: generation.max_pages,
            credentials: None,
            endpoints: ServiceEndpoints::default(),
            resolve_links: false,
            link_limit: DEFAULT_LINK_LIMIT,
            delay: generation.delay,
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Which branch produced the documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocsSource {
    #[serde(rename = "llms-full.txt")]
    LlmsFull,
    #[serde(rename = "generated")]
    Generated,
    #[serde(rename = "llms.txt")]
    Llms,
}

impl DocsSource {
    pub fn tag(self) -> &'static str {
        match self {
            Self::LlmsFull => "llms-full.txt",
            Self::Generated => "generated",
            Self::Llms => "llms.txt",
        }
    }
}

/// Outcome of a successful documentation resolution.
#[derive(Debug, Clone)]
pub struct DocsResolution {
    pub source: DocsSource,
    /// The site URL as requested.
    pub site_url: String,
    /// URL of the probed document, or the site URL for generated output.
    pub document_url: String,
    pub title: String,
    pub description: Option<String>,
    pub links: Vec<DocLink>,
    /// Full-text document (llms-full.txt or generated).
    pub full_text: Option<String>,
    /// Link-list document (llms.txt or generated).
    pub summary_text: Option<String>,
    /// Pages successfully scraped by the generation pipeline.
    pub processed_count: usize,
    /// Only the short index was available.
    pub full_text_unavailable: bool,
}

/// A document fetched from an `llms.txt` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedDocument {
    pub title: String,
    pub url: String,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve documentation for `site_url`, building HTTP service clients from
/// the configured credentials when both keys are present.
pub async fn resolve_docs(
    client: &Client,
    site_url: &str,
    options: &DocsOptions,
    progress: &dyn ProgressReporter,
) -> Result<DocsResolution> {
    match &options.credentials {
        Some(credentials) => {
            let firecrawl = FirecrawlClient::with_client(
                client.clone(),
                &options.endpoints.mapping_base_url,
                &credentials.mapping_api_key,
            );
            let annotator = ChatAnnotator::with_client(
                client.clone(),
                &options.endpoints.annotation_base_url,
                &credentials.annotation_api_key,
                &options.endpoints.annotation_model,
            );
            let services = GenerationServices {
                mapper: &firecrawl,
                scraper: &firecrawl,
                annotator: &annotator,
            };
            resolve_docs_with(client, site_url, options, Some(services), progress).await
        }
        None => resolve_docs_with(client, site_url, options, None, progress).await,
    }
}

/// Resolve documentation with explicitly supplied generation services.
#[instrument(skip_all, fields(site = %site_url, generation = services.is_some()))]
pub async fn resolve_docs_with(
    client: &Client,
    site_url: &str,
    options: &DocsOptions,
    services: Option<GenerationServices<'_>>,
    progress: &dyn ProgressReporter,
) -> Result<DocsResolution> {
    if site_url.trim().is_empty() {
        return Err(SourcePackError::validation("siteUrl is required"));
    }
    let site = parse_http_url(site_url)?;
    let site_name = site.host_str().unwrap_or(site.as_str()).to_string();

    progress.phase("Probing llms-full.txt");
    match probe_llms_full(client, &site).await {
        Ok(doc) => return Ok(from_probe(doc, &site, &site_name)),
        Err(e) => info!(error = %e, "llms-full.txt unavailable"),
    }

    if let Some(services) = services {
        let generation = GenerationOptions {
            max_pages: options.max_pages,
            delay: options.delay,
        };
        let generated =
            generate_documents(site.as_str(), &site_name, services, &generation, progress).await?;
        let processed_count = generated.processed_count();
        let links = generated
            .results
            .iter()
            .map(|r| DocLink {
                title: r.title.clone(),
                url: r.url.clone(),
                description: Some(r.description.clone()),
            })
            .collect();

        return Ok(DocsResolution {
            source: DocsSource::Generated,
            site_url: site.to_string(),
            document_url: site.to_string(),
            title: generated.title,
            description: Some(generated.description),
            links,
            full_text: Some(generated.full_text),
            summary_text: Some(generated.summary_text),
            processed_count,
            full_text_unavailable: false,
        });
    }

    progress.phase("Probing llms.txt");
    match probe_llms(client, &site).await {
        Ok(doc) => Ok(from_probe(doc, &site, &site_name)),
        Err(e) => {
            info!(error = %e, "llms.txt unavailable");
            Err(SourcePackError::NoDocument {
                site: site.to_string(),
                can_generate: true,
            })
        }
    }
}

fn from_probe(doc: ProbedDocument, site: &Url, site_name: &str) -> DocsResolution {
    let full = doc.target == ProbeTarget::LlmsFull;
    let (source, full_text, summary_text) = if full {
        (DocsSource::LlmsFull, Some(doc.content), None)
    } else {
        (DocsSource::Llms, None, Some(doc.content))
    };

    DocsResolution {
        source,
        site_url: site.to_string(),
        document_url: doc.url,
        title: doc.parsed.title.unwrap_or_else(|| site_name.to_string()),
        description: doc.parsed.description,
        links: doc.parsed.links,
        full_text,
        summary_text,
        processed_count: 0,
        full_text_unavailable: !full,
    }
}

/// Fetch the documents linked from an index, in order, skipping failures.
#[instrument(skip_all, fields(links = links.len(), limit = limit))]
pub async fn fetch_linked_documents(
    extractor: &ArticleExtractor,
    links: &[DocLink],
    limit: usize,
    progress: &dyn ProgressReporter,
) -> Vec<LinkedDocument> {
    let total = links.len().min(limit);
    let mut documents = Vec::with_capacity(total);

    progress.phase("Fetching linked documents");
    for (index, link) in links.iter().take(limit).enumerate() {
        progress.item(&link.title, index + 1, total);
        match extractor.fetch_document_text(&link.url).await {
            Some(text) => documents.push(LinkedDocument {
                title: link.title.clone(),
                url: link.url.clone(),
                text,
            }),
            None => warn!(url = %link.url, "skipping linked document"),
        }
    }

    info!(fetched = documents.len(), requested = total, "linked documents fetched");
    documents
}

#[cfg(test)]
mod tests {
    use sourcepack_shared::SilentProgress;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const FULL_TEXT: &str = "# Example Docs\n> Everything in one file.\n\nInstall with cargo.";
    const INDEX: &str =
        "# Example Docs\n> Short index.\n\n- [Install](/docs/install.md): Setup\n- [Missing](/docs/missing.md)";

    fn credentials() -> Option<GenerationCredentials> {
        GenerationCredentials::from_parts(Some("fc".into()), Some("sk".into()))
    }

    fn options_for(server: &MockServer, credentials: Option<GenerationCredentials>) -> DocsOptions {
        DocsOptions {
            credentials,
            endpoints: ServiceEndpoints {
                mapping_base_url: server.uri(),
                annotation_base_url: format!("{}/v1", server.uri()),
                annotation_model: "test-model".into(),
            },
            delay: Duration::ZERO,
            ..Default::default()
        }
    }

    async fn mount_text(server: &MockServer, at: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[test]
    fn credentials_need_both_keys() {
        assert!(GenerationCredentials::from_parts(Some("a".into()), None).is_none());
        assert!(GenerationCredentials::from_parts(None, Some("b".into())).is_none());
        assert!(credentials().is_some());
        assert!(!format!("{:?}", credentials()).contains("fc"));
    }

    #[tokio::test]
    async fn full_text_wins_without_generation() {
        let server = MockServer::start().await;
        mount_text(&server, "/llms-full.txt", 200, FULL_TEXT).await;
        Mock::given(method("POST"))
            .and(path("/v1/map"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/llms.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(INDEX))
            .expect(0)
            .mount(&server)
            .await;

        let client = Client::new();
        let resolution = resolve_docs(
            &client,
            &format!("{}/guide/intro", server.uri()),
            &options_for(&server, credentials()),
            &SilentProgress,
        )
        .await
        .unwrap();

        assert_eq!(resolution.source.tag(), "llms-full.txt");
        assert_eq!(resolution.title, "Example Docs");
        assert_eq!(resolution.description.as_deref(), Some("Everything in one file."));
        assert_eq!(resolution.full_text.as_deref(), Some(FULL_TEXT));
        assert!(!resolution.full_text_unavailable);
    }

    #[tokio::test]
    async fn short_index_when_no_credentials() {
        let server = MockServer::start().await;
        mount_text(&server, "/llms-full.txt", 404, "").await;
        mount_text(&server, "/llms.txt", 200, INDEX).await;

        let client = Client::new();
        let resolution = resolve_docs(&client, &server.uri(), &options_for(&server, None), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(resolution.source, DocsSource::Llms);
        assert!(resolution.full_text_unavailable);
        assert!(resolution.full_text.is_none());
        assert_eq!(resolution.summary_text.as_deref(), Some(INDEX));
        assert_eq!(resolution.links.len(), 2);
        assert_eq!(resolution.links[0].url, format!("{}/docs/install.md", server.uri()));
    }

    #[tokio::test]
    async fn nothing_found_reports_generation_hint() {
        let server = MockServer::start().await;
        mount_text(&server, "/llms-full.txt", 404, "").await;
        mount_text(&server, "/llms.txt", 404, "").await;

        let client = Client::new();
        let err = resolve_docs(&client, &server.uri(), &options_for(&server, None), &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, SourcePackError::NoDocument { can_generate: true, .. }));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn generation_runs_when_full_text_missing() {
        let server = MockServer::start().await;
        mount_text(&server, "/llms-full.txt", 404, "").await;
        Mock::given(method("GET"))
            .and(path("/llms.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(INDEX))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/map"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "links": ["https://docs.test/a", "https://docs.test/b"]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/scrape"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": { "markdown": "Page body.", "metadata": { "title": "Page" } }
            })))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "{\"title\": \"Doc page\", \"description\": \"Nine or ten words describing the page for the reader.\"}" } }]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = Client::new();
        let resolution = resolve_docs(&client, &server.uri(), &options_for(&server, credentials()), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(resolution.source, DocsSource::Generated);
        assert_eq!(resolution.processed_count, 2);
        assert_eq!(resolution.links.len(), 2);
        assert!(resolution.full_text.as_deref().unwrap().contains("Source: https://docs.test/b"));
        assert!(resolution.summary_text.as_deref().unwrap().contains("- [Doc page](https://docs.test/a)"));
    }

    #[tokio::test]
    async fn empty_mapping_is_a_hard_failure() {
        let server = MockServer::start().await;
        mount_text(&server, "/llms-full.txt", 404, "").await;
        Mock::given(method("POST"))
            .and(path("/v1/map"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "links": []
            })))
            .mount(&server)
            .await;

        let client = Client::new();
        let err = resolve_docs(&client, &server.uri(), &options_for(&server, credentials()), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, SourcePackError::Empty { .. }));
    }

    #[tokio::test]
    async fn blank_site_url_is_rejected() {
        let err = resolve_docs(&Client::new(), "  ", &DocsOptions::default(), &SilentProgress)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn linked_documents_skip_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs/install.md"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/markdown")
                    .set_body_string("# Install\n\nRun the installer.\n"),
            )
            .mount(&server)
            .await;
        mount_text(&server, "/docs/missing.md", 404, "").await;

        let links = vec![
            DocLink {
                title: "Install".into(),
                url: format!("{}/docs/install.md", server.uri()),
                description: None,
            },
            DocLink {
                title: "Missing".into(),
                url: format!("{}/docs/missing.md", server.uri()),
                description: None,
            },
        ];

        let extractor = ArticleExtractor::with_client(Client::new());
        let docs = fetch_linked_documents(&extractor, &links, 10, &SilentProgress).await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Install");
        assert_eq!(docs[0].text, "# Install\n\nRun the installer.");

        let limited = fetch_linked_documents(&extractor, &links, 0, &SilentProgress).await;
        assert!(limited.is_empty());
    }
}
