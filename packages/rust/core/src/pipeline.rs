//! Request-level orchestration: one entry point per top-level resolver.
//!
//! Every entry point resolves a finished entry list (or repository file set)
//! first and only then builds the archive, so a failure never leaves a
//! partially written bundle behind.

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument, warn};

use sourcepack_artifacts::{ArchiveOptions, BuiltArchive, EncodedArchive, build_archive};
use sourcepack_crawler::ArticleExtractor;
use sourcepack_feed::{FeedOptions, resolve_feed};
use sourcepack_repo::{
    BundlerTables, RepoBundle, RepoSource, RepoStats, bundle_archive, download_zipball,
    parse_repository_url,
};
use sourcepack_shared::http::{build_client, parse_http_url};
use sourcepack_shared::slug::{MAX_ITEM_LIMIT, clamp_count};
use sourcepack_shared::{
    AppConfig, Entry, ProgressReporter, RepoFile, RepoIdentity, Result, RetryHints,
    SourceMetadata, SourcePackError, archive_file_name, clamp_max_pages, parse_item_limit,
    resolve_api_key,
};

use crate::docs::{
    DocsOptions, DocsSource, GenerationCredentials, ServiceEndpoints, fetch_linked_documents,
    resolve_docs,
};

/// Archive directory used for article-set bundles.
const ARTICLES_NAMESPACE: &str = "articles";

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct FeedRequest {
    /// Falls back to `[feed].preset_url` when absent.
    pub feed_url: Option<String>,
    /// Raw requested count; non-integers resolve to the default.
    pub item_limit: Option<String>,
    pub full_articles: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ArticlesRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DocsRequest {
    pub site_url: String,
    pub max_pages: Option<usize>,
    pub mapping_api_key: Option<String>,
    pub annotation_api_key: Option<String>,
    pub resolve_links: bool,
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Per-entry summary included in every entry-archive payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub id: String,
    pub title: String,
    pub url: String,
    pub word_count: usize,
}

impl From<&Entry> for EntrySummary {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            url: entry.url.clone(),
            word_count: entry.word_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPayload {
    pub source_metadata: SourceMetadata,
    pub requested_items: usize,
    pub total_items: usize,
    pub extracted_entries: usize,
    pub total_words: usize,
    pub entries: Vec<EntrySummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesPayload {
    pub source_metadata: SourceMetadata,
    pub requested_urls: usize,
    pub extracted_entries: usize,
    pub total_words: usize,
    pub entries: Vec<EntrySummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocsPayload {
    pub source: DocsSource,
    pub source_metadata: SourceMetadata,
    pub processed_count: usize,
    pub full_text_unavailable: bool,
    pub link_count: usize,
    pub extracted_entries: usize,
    pub entries: Vec<EntrySummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoPayload {
    pub source: RepoSource,
    pub repo: RepoIdentity,
    pub stats: RepoStats,
    pub files: Vec<RepoFile>,
}

/// A resolver's payload plus its encoded archive.
#[derive(Debug, Clone, Serialize)]
pub struct Bundle<P> {
    #[serde(flatten)]
    pub payload: P,
    pub archive: EncodedArchive,
}

// ---------------------------------------------------------------------------
// Result contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Success<P> {
    ok: bool,
    #[serde(flatten)]
    pub bundle: Bundle<P>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    ok: bool,
    pub error: String,
    pub status: u16,
    #[serde(flatten)]
    pub hints: RetryHints,
}

/// `{ ok: true, ...payload, archive }` or `{ ok: false, error, status, ...hints }`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response<P> {
    Success(Success<P>),
    Failure(Failure),
}

impl<P> Response<P> {
    pub fn from_result(result: Result<Bundle<P>>) -> Self {
        match result {
            Ok(bundle) => Self::Success(Success { ok: true, bundle }),
            Err(err) => Self::Failure(Failure {
                ok: false,
                error: err.to_string(),
                status: err.status_code(),
                hints: err.retry_hints(),
            }),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Holds the HTTP clients and configuration shared by every resolver.
#[derive(Debug, Clone)]
pub struct Pipeline {
    client: Client,
    extractor: ArticleExtractor,
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            extractor: ArticleExtractor::new()?,
            config,
        })
    }

    pub fn with_clients(config: AppConfig, client: Client, extractor: ArticleExtractor) -> Self {
        Self {
            client,
            extractor,
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Resolve a syndication feed into an entry archive.
    #[instrument(skip_all, fields(feed_url = request.feed_url.as_deref().unwrap_or("<preset>")))]
    pub async fn bundle_feed(
        &self,
        request: &FeedRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<Bundle<FeedPayload>> {
        let feed_url = request
            .feed_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .or_else(|| self.config.feed.preset_url.clone())
            .ok_or_else(|| {
                SourcePackError::validation("feedUrl is required (no preset feed is configured)")
            })?;

        let item_limit = match request.item_limit.as_deref() {
            Some(raw) => parse_item_limit(Some(raw)),
            None => clamp_count(
                i64::try_from(self.config.defaults.item_limit).unwrap_or(i64::MAX),
                MAX_ITEM_LIMIT,
            ),
        };
        let options = FeedOptions {
            item_limit,
            full_articles: request.full_articles || self.config.feed.full_articles,
        };

        let resolved =
            resolve_feed(&self.client, &self.extractor, &feed_url, &options, progress).await?;

        progress.phase("Building archive");
        let built = build_archive(&resolved.entries, &resolved.metadata, &ArchiveOptions::default())?;

        let payload = FeedPayload {
            source_metadata: resolved.metadata,
            requested_items: item_limit,
            total_items: resolved.total_items,
            extracted_entries: built.manifest.stats.entry_count,
            total_words: built.manifest.stats.total_words,
            entries: resolved.entries.iter().map(EntrySummary::from).collect(),
        };

        Ok(finish(built, payload, progress))
    }

    /// Extract a list of article URLs, strictly in order, into one archive.
    #[instrument(skip_all, fields(urls = request.urls.len()))]
    pub async fn bundle_articles(
        &self,
        request: &ArticlesRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<Bundle<ArticlesPayload>> {
        if request.urls.is_empty() {
            return Err(SourcePackError::validation("at least one article URL is required"));
        }
        if request.urls.len() > MAX_ITEM_LIMIT {
            return Err(SourcePackError::validation(format!(
                "at most {MAX_ITEM_LIMIT} article URLs can be bundled at once"
            )));
        }
        let urls = request
            .urls
            .iter()
            .map(|u| parse_http_url(u))
            .collect::<Result<Vec<_>>>()?;

        progress.phase("Extracting articles");
        let total = urls.len();
        let mut entries = Vec::with_capacity(total);
        for (position, url) in urls.iter().enumerate() {
            progress.item(url.as_str(), position + 1, total);
            let Some(article) = self.extractor.extract(url.as_str()).await else {
                warn!(%url, "dropping article that could not be extracted");
                continue;
            };

            let index = entries.len();
            let title = article
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| format!("Entry {}", index + 1));
            entries.push(Entry::new(
                index,
                title,
                url.as_str(),
                article.published_at,
                article.text,
            ));
        }

        if entries.is_empty() {
            return Err(SourcePackError::empty(format!(
                "none of the {total} articles could be extracted"
            )));
        }

        let metadata = SourceMetadata {
            title: match entries.as_slice() {
                [only] => only.title.clone(),
                _ => "Article collection".to_string(),
            },
            description: format!("{} of {total} requested articles", entries.len()),
            url: urls[0].to_string(),
        };

        progress.phase("Building archive");
        let options = ArchiveOptions {
            namespace: Some(ARTICLES_NAMESPACE.to_string()),
            generated_at: None,
        };
        let built = build_archive(&entries, &metadata, &options)?;

        let payload = ArticlesPayload {
            source_metadata: metadata,
            requested_urls: total,
            extracted_entries: built.manifest.stats.entry_count,
            total_words: built.manifest.stats.total_words,
            entries: entries.iter().map(EntrySummary::from).collect(),
        };

        Ok(finish(built, payload, progress))
    }

    /// Resolve a documentation site into an entry archive.
    #[instrument(skip_all, fields(site = %request.site_url))]
    pub async fn bundle_docs(
        &self,
        request: &DocsRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<Bundle<DocsPayload>> {
        let credentials = GenerationCredentials::from_parts(
            resolve_api_key(
                request.mapping_api_key.as_deref(),
                &self.config.mapping.api_key_env,
            ),
            resolve_api_key(
                request.annotation_api_key.as_deref(),
                &self.config.annotation.api_key_env,
            ),
        );

        let options = DocsOptions {
            max_pages: clamp_max_pages(request.max_pages.or(Some(self.config.defaults.max_pages))),
            credentials,
            endpoints: ServiceEndpoints::from_config(&self.config),
            resolve_links: request.resolve_links,
            ..Default::default()
        };

        let resolution = resolve_docs(&self.client, &request.site_url, &options, progress).await?;

        let mut entries = Vec::new();
        match resolution.source {
            DocsSource::LlmsFull => {
                entries.push(Entry::new(
                    0,
                    resolution.title.as_str(),
                    resolution.document_url.as_str(),
                    None,
                    resolution.full_text.clone().unwrap_or_default(),
                ));
            }
            DocsSource::Generated => {
                entries.push(Entry::new(
                    0,
                    format!("{} documentation index", resolution.title),
                    resolution.document_url.as_str(),
                    None,
                    resolution.summary_text.clone().unwrap_or_default(),
                ));
                entries.push(Entry::new(
                    1,
                    format!("{} full documentation", resolution.title),
                    resolution.document_url.as_str(),
                    None,
                    resolution.full_text.clone().unwrap_or_default(),
                ));
            }
            DocsSource::Llms => {
                entries.push(Entry::new(
                    0,
                    resolution.title.as_str(),
                    resolution.document_url.as_str(),
                    None,
                    resolution.summary_text.clone().unwrap_or_default(),
                ));
                if options.resolve_links {
                    let linked = fetch_linked_documents(
                        &self.extractor,
                        &resolution.links,
                        options.link_limit,
                        progress,
                    )
                    .await;
                    for doc in linked {
                        entries.push(Entry::new(entries.len(), doc.title, doc.url, None, doc.text));
                    }
                }
            }
        }

        let metadata = SourceMetadata {
            title: resolution.title.clone(),
            description: resolution.description.clone().unwrap_or_default(),
            url: resolution.site_url.clone(),
        };

        progress.phase("Building archive");
        let built = build_archive(&entries, &metadata, &ArchiveOptions::default())?;

        let payload = DocsPayload {
            source: resolution.source,
            source_metadata: metadata,
            processed_count: resolution.processed_count,
            full_text_unavailable: resolution.full_text_unavailable,
            link_count: resolution.links.len(),
            extracted_entries: built.manifest.stats.entry_count,
            entries: entries.iter().map(EntrySummary::from).collect(),
        };

        Ok(finish(built, payload, progress))
    }

    /// Download a GitHub repository and re-package it.
    #[instrument(skip_all, fields(repository = %repository_url))]
    pub async fn bundle_repository(
        &self,
        repository_url: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<Bundle<RepoPayload>> {
        let repo = parse_repository_url(repository_url)?;

        progress.phase("Downloading repository");
        let bytes = download_zipball(&self.client, &self.config.repository.api_base, &repo).await?;

        self.repackage(&bytes, repo.identity(), RepoSource::Github, progress)
    }

    /// Re-package an uploaded archive.
    ///
    /// Without an explicit identity the repository name is taken from the
    /// uploaded file's stem.
    #[instrument(skip_all, fields(bytes = bytes.len()))]
    pub fn bundle_upload(
        &self,
        bytes: &[u8],
        file_name: Option<&str>,
        identity: Option<RepoIdentity>,
        progress: &dyn ProgressReporter,
    ) -> Result<Bundle<RepoPayload>> {
        if bytes.is_empty() {
            return Err(SourcePackError::validation("uploaded archive is empty"));
        }
        let identity = identity.unwrap_or_else(|| RepoIdentity {
            name: file_name.and_then(upload_stem),
            ..Default::default()
        });
        self.repackage(bytes, identity, RepoSource::Upload, progress)
    }

    fn repackage(
        &self,
        bytes: &[u8],
        identity: RepoIdentity,
        source: RepoSource,
        progress: &dyn ProgressReporter,
    ) -> Result<Bundle<RepoPayload>> {
        progress.phase("Bundling repository");
        let tables =
            BundlerTables::with_extra_ignored_dirs(&self.config.repository.extra_ignored_dirs);
        let generated_at = Utc::now();
        let RepoBundle { archive, manifest } =
            bundle_archive(bytes, &identity, source, &tables, generated_at)?;

        let title = identity.name.as_deref().unwrap_or("repository");
        let file_name = archive_file_name(title, generated_at.date_naive());
        let summary = format!(
            "{} of {} files included ({} code files converted)",
            manifest.stats.included_files,
            manifest.stats.total_files,
            manifest.stats.code_files_converted
        );
        info!(%file_name, "{summary}");
        progress.done(&summary);

        Ok(Bundle {
            payload: RepoPayload {
                source: manifest.source,
                repo: manifest.repo,
                stats: manifest.stats,
                files: manifest.files,
            },
            archive: EncodedArchive::from_bytes(&archive, file_name),
        })
    }
}

fn finish<P>(built: BuiltArchive, payload: P, progress: &dyn ProgressReporter) -> Bundle<P> {
    let summary = format!(
        "{} entries, {} words",
        built.manifest.stats.entry_count, built.manifest.stats.total_words
    );
    info!(file_name = %built.file_name, "{summary}");
    progress.done(&summary);

    Bundle {
        archive: built.encode(),
        payload,
    }
}

/// `my-repo-main.zip` → `my-repo-main`.
fn upload_stem(file_name: &str) -> Option<String> {
    let leaf = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let stem = leaf
        .strip_suffix(".zip")
        .or_else(|| leaf.strip_suffix(".ZIP"))
        .unwrap_or(leaf)
        .trim();
    (!stem.is_empty()).then(|| stem.to_string())
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use sourcepack_artifacts::decode_archive;
    use sourcepack_shared::SilentProgress;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;

    fn load_fixture(relative: &str) -> String {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(relative);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    fn pipeline_for(server: &MockServer) -> Pipeline {
        let mut config = AppConfig::default();
        config.repository.api_base = server.uri();
        config.mapping.api_key_env = "SOURCEPACK_TEST_UNSET_MAPPING_KEY".into();
        config.annotation.api_key_env = "SOURCEPACK_TEST_UNSET_ANNOTATION_KEY".into();
        Pipeline::with_clients(config, Client::new(), ArticleExtractor::with_client(Client::new()))
    }

    fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[tokio::test]
    async fn feed_bundle_round_trips() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(load_fixture("feeds/rss.xml"), "application/rss+xml"),
            )
            .mount(&server)
            .await;

        let pipeline = pipeline_for(&server);
        let request = FeedRequest {
            feed_url: Some(format!("{}/feed.xml", server.uri())),
            item_limit: Some("abc".into()),
            full_articles: false,
        };
        let bundle = pipeline.bundle_feed(&request, &SilentProgress).await.unwrap();

        assert_eq!(bundle.payload.requested_items, 15);
        assert_eq!(bundle.payload.extracted_entries, 3);
        assert_eq!(bundle.payload.entries[1].title, "Entry 2");
        assert!(bundle.archive.file_name.starts_with("systems-notes-"));

        let decoded = decode_archive(&bundle.archive.base64).unwrap();
        let manifest = decoded.manifest().unwrap();
        assert_eq!(manifest.entries.len(), bundle.payload.extracted_entries);
        assert_eq!(decoded.files.len(), manifest.entries.len() + 2);
    }

    #[tokio::test]
    async fn feed_limit_is_clamped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("feeds/rss.xml")))
            .mount(&server)
            .await;

        let pipeline = pipeline_for(&server);
        let request = FeedRequest {
            feed_url: Some(format!("{}/feed.xml", server.uri())),
            item_limit: Some("-3".into()),
            full_articles: false,
        };
        let bundle = pipeline.bundle_feed(&request, &SilentProgress).await.unwrap();
        assert_eq!(bundle.payload.requested_items, 1);
        assert_eq!(bundle.payload.extracted_entries, 1);
        assert_eq!(bundle.payload.total_items, 3);
    }

    #[tokio::test]
    async fn feed_without_url_or_preset_is_rejected() {
        let server = MockServer::start().await;
        let err = pipeline_for(&server)
            .bundle_feed(&FeedRequest::default(), &SilentProgress)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn upstream_failure_renders_failure_contract() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let pipeline = pipeline_for(&server);
        let request = FeedRequest {
            feed_url: Some(format!("{}/feed.xml", server.uri())),
            ..Default::default()
        };
        let response = Response::from_result(pipeline.bundle_feed(&request, &SilentProgress).await);
        assert!(!response.is_ok());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["status"], 502);
        assert_eq!(json["upstreamStatus"], 503);
        assert!(json["error"].as_str().unwrap().contains("HTTP 503"));
    }

    #[tokio::test]
    async fn articles_drop_failures_and_namespace_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/good"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "<html><head><title>Good Post</title></head><body><article><p>Readable body text, with enough words to be kept by the extractor.</p></article></body></html>",
                "text/html",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/posts/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let pipeline = pipeline_for(&server);
        let request = ArticlesRequest {
            urls: vec![
                format!("{}/posts/gone", server.uri()),
                format!("{}/posts/good", server.uri()),
            ],
        };
        let bundle = pipeline.bundle_articles(&request, &SilentProgress).await.unwrap();

        assert_eq!(bundle.payload.requested_urls, 2);
        assert_eq!(bundle.payload.extracted_entries, 1);
        assert_eq!(bundle.payload.entries[0].id, "01-good-post");

        let response = Response::from_result(Ok(bundle));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["extractedEntries"], 1);
        assert!(json["archive"]["fileName"].as_str().unwrap().starts_with("good-post-"));

        let decoded = decode_archive(json["archive"]["base64"].as_str().unwrap()).unwrap();
        assert!(decoded.file("articles/01-good-post.md").is_some());
    }

    #[tokio::test]
    async fn articles_validate_urls_up_front() {
        let server = MockServer::start().await;
        let pipeline = pipeline_for(&server);

        let request = ArticlesRequest {
            urls: vec![format!("{}/ok", server.uri()), "not a url".into()],
        };
        let err = pipeline.bundle_articles(&request, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, SourcePackError::InvalidUrl { .. }));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());

        let err = pipeline
            .bundle_articles(&ArticlesRequest::default(), &SilentProgress)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn docs_bundle_from_full_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/llms-full.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(load_fixture("llms/llms-full.txt")))
            .mount(&server)
            .await;

        let pipeline = pipeline_for(&server);
        let request = DocsRequest {
            site_url: server.uri(),
            ..Default::default()
        };
        let bundle = pipeline.bundle_docs(&request, &SilentProgress).await.unwrap();

        assert_eq!(bundle.payload.source, DocsSource::LlmsFull);
        assert_eq!(bundle.payload.extracted_entries, 1);
        assert_eq!(bundle.payload.entries[0].title, "Example Docs");

        let json = serde_json::to_value(&Response::from_result(Ok(bundle))).unwrap();
        assert_eq!(json["source"], "llms-full.txt");
    }

    #[tokio::test]
    async fn docs_bundle_resolves_index_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/llms-full.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/llms.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "# Tiny Docs\n> Two pages.\n\n- [Intro](/intro.md)\n- [Gone](/gone.md)",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/intro.md"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("# Intro\n\nHello.", "text/markdown"))
            .mount(&server)
            .await;

        let pipeline = pipeline_for(&server);
        let request = DocsRequest {
            site_url: server.uri(),
            resolve_links: true,
            ..Default::default()
        };
        let bundle = pipeline.bundle_docs(&request, &SilentProgress).await.unwrap();

        assert_eq!(bundle.payload.source, DocsSource::Llms);
        assert!(bundle.payload.full_text_unavailable);
        assert_eq!(bundle.payload.link_count, 2);
        let ids: Vec<&str> = bundle.payload.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["01-tiny-docs", "02-intro"]);
    }

    #[tokio::test]
    async fn repository_bundle_from_zipball() {
        let server = MockServer::start().await;
        let zipball = zip_of(&[
            ("octo-widgets-1a2b3c/src/main.rs", "fn main() {}\n"),
            ("octo-widgets-1a2b3c/README.md", "# Widgets\n"),
            ("octo-widgets-1a2b3c/target/debug/widgets", "ELF"),
        ]);
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/zipball"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(zipball))
            .expect(1)
            .mount(&server)
            .await;

        let pipeline = pipeline_for(&server);
        let bundle = pipeline
            .bundle_repository("https://github.com/octo/widgets", &SilentProgress)
            .await
            .unwrap();

        assert_eq!(bundle.payload.source, RepoSource::Github);
        assert_eq!(bundle.payload.stats.total_files, 3);
        assert_eq!(bundle.payload.stats.included_files, 2);
        assert_eq!(bundle.payload.stats.code_files_converted, 1);
        assert_eq!(bundle.payload.files[0].path, "src/main.rs.txt");
        assert!(bundle.archive.file_name.starts_with("widgets-"));

        let decoded = decode_archive(&bundle.archive.base64).unwrap();
        assert!(decoded.file(sourcepack_repo::REPO_MANIFEST_NAME).is_some());
    }

    #[tokio::test]
    async fn upload_takes_name_from_file_stem() {
        let server = MockServer::start().await;
        let pipeline = pipeline_for(&server);
        let upload = zip_of(&[("gadgets-main/lib/util.py", "pass\n")]);

        let bundle = pipeline
            .bundle_upload(&upload, Some("/tmp/gadgets-main.zip"), None, &SilentProgress)
            .unwrap();

        assert_eq!(bundle.payload.source, RepoSource::Upload);
        assert_eq!(bundle.payload.repo.name.as_deref(), Some("gadgets-main"));
        assert_eq!(bundle.payload.files[0].path, "lib/util.py.txt");
    }

    #[test]
    fn upload_stem_parsing() {
        assert_eq!(upload_stem("repo.zip").as_deref(), Some("repo"));
        assert_eq!(upload_stem("C:\\uploads\\My Repo.ZIP").as_deref(), Some("My Repo"));
        assert_eq!(upload_stem(".zip"), None);
    }
}
