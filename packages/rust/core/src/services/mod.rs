//! External services used by the documentation generation pipeline.
//!
//! The pipeline only sees these traits; the HTTP implementations live in the
//! submodules and tests substitute in-memory fakes.

mod annotator;
mod firecrawl;

use async_trait::async_trait;

use sourcepack_shared::Result;

pub use annotator::ChatAnnotator;
pub use firecrawl::FirecrawlClient;

/// Markdown content returned by a page scrape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedPage {
    pub url: String,
    pub markdown: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Short metadata produced by the annotation service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageAnnotation {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Enumerates crawlable URLs of a site.
#[async_trait]
pub trait SiteMapper: Send + Sync {
    async fn map(&self, site: &str, limit: usize) -> Result<Vec<String>>;
}

/// Fetches one page as markdown.
#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage>;
}

/// Produces a short title and description for a page excerpt.
#[async_trait]
pub trait PageAnnotator: Send + Sync {
    async fn annotate(&self, url: &str, excerpt: &str) -> Result<PageAnnotation>;
}
