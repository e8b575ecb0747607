//! Documentation generation: map a site, scrape and annotate each page in
//! order, then fold the results into a summary and a full-text document.

use std::time::Duration;

use tracing::{info, instrument, warn};

use sourcepack_shared::slug::truncate_chars;
use sourcepack_shared::{GenerationResult, ProgressReporter, Result, SourcePackError};

use crate::services::{PageAnnotator, PageScraper, ScrapedPage, SiteMapper};

/// Characters of page markdown sent to the annotation service.
pub const ANNOTATION_EXCERPT_CHARS: usize = 4000;

pub const FALLBACK_TITLE: &str = "Untitled page";
pub const FALLBACK_DESCRIPTION: &str = "No description available.";

const PAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Knobs for [`generate_documents`].
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Upper bound on mapped URLs (already clamped to `[1, 50]`).
    pub max_pages: usize,
    /// Pause between consecutive pages.
    pub delay: Duration,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_pages: sourcepack_shared::config::DEFAULT_MAX_PAGES,
            delay: Duration::from_millis(500),
        }
    }
}

/// The three services a generation run depends on.
#[derive(Clone, Copy)]
pub struct GenerationServices<'a> {
    pub mapper: &'a dyn SiteMapper,
    pub scraper: &'a dyn PageScraper,
    pub annotator: &'a dyn PageAnnotator,
}

/// Output of a generation run.
#[derive(Debug, Clone)]
pub struct GeneratedDocuments {
    pub title: String,
    pub description: String,
    /// llms.txt-style link list.
    pub summary_text: String,
    /// Every page's markdown under its own heading.
    pub full_text: String,
    pub results: Vec<GenerationResult>,
    /// Number of URLs returned by the mapping call.
    pub mapped_count: usize,
}

impl GeneratedDocuments {
    pub fn processed_count(&self) -> usize {
        self.results.len()
    }
}

/// Run the generation pipeline for `site`.
///
/// Pages are handled strictly one after another. A failed scrape drops that
/// page; a failed annotation falls back to placeholder metadata. The delay is
/// applied after every page except the last.
#[instrument(skip_all, fields(site = site, max_pages = options.max_pages))]
pub async fn generate_documents(
    site: &str,
    title: &str,
    services: GenerationServices<'_>,
    options: &GenerationOptions,
    progress: &dyn ProgressReporter,
) -> Result<GeneratedDocuments> {
    progress.phase("Mapping site");
    let urls: Vec<String> = services
        .mapper
        .map(site, options.max_pages)
        .await?
        .into_iter()
        .take(options.max_pages)
        .collect();

    if urls.is_empty() {
        return Err(SourcePackError::empty(format!(
            "site mapping returned no URLs for {site}"
        )));
    }

    progress.phase("Scraping and annotating pages");
    let total = urls.len();
    let mut results = Vec::with_capacity(total);

    for (index, url) in urls.iter().enumerate() {
        progress.item(url, index + 1, total);

        match services.scraper.scrape(url).await {
            Ok(page) => {
                let result = annotate_page(services.annotator, url, index, page).await;
                results.push(result);
            }
            Err(e) => warn!(%url, error = %e, "scrape failed, skipping page"),
        }

        if index + 1 < total && !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
    }

    if results.is_empty() {
        return Err(SourcePackError::empty(format!(
            "none of the {total} mapped pages of {site} could be scraped"
        )));
    }

    let description = format!(
        "Documentation generated from {} of {total} pages of {site}",
        results.len()
    );
    let summary_text = render_summary(title, &description, &results);
    let full_text = render_full_text(title, &description, &results);

    info!(mapped = total, processed = results.len(), "generation complete");

    Ok(GeneratedDocuments {
        title: title.to_string(),
        description,
        summary_text,
        full_text,
        results,
        mapped_count: total,
    })
}

async fn annotate_page(
    annotator: &dyn PageAnnotator,
    url: &str,
    index: usize,
    page: ScrapedPage,
) -> GenerationResult {
    let excerpt = truncate_chars(&page.markdown, ANNOTATION_EXCERPT_CHARS);
    let annotation = match annotator.annotate(url, excerpt).await {
        Ok(annotation) => annotation,
        Err(e) => {
            warn!(%url, error = %e, "annotation failed, using fallback metadata");
            Default::default()
        }
    };

    GenerationResult {
        url: url.to_string(),
        title: annotation
            .title
            .or(page.title)
            .unwrap_or_else(|| FALLBACK_TITLE.to_string()),
        description: annotation
            .description
            .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string()),
        markdown: page.markdown.trim().to_string(),
        index,
    }
}

fn render_header(title: &str, description: &str) -> String {
    format!("# {title}\n> {description}\n\n")
}

fn render_summary(title: &str, description: &str, results: &[GenerationResult]) -> String {
    let mut out = render_header(title, description);
    for result in results {
        out.push_str(&format!(
            "- [{}]({}): {}\n",
            result.title, result.url, result.description
        ));
    }
    out.trim_end().to_string()
}

fn render_full_text(title: &str, description: &str, results: &[GenerationResult]) -> String {
    let pages: Vec<String> = results
        .iter()
        .map(|r| format!("## {}\nSource: {}\n\n{}", r.title, r.url, r.markdown))
        .collect();
    format!("{}{}", render_header(title, description), pages.join(PAGE_SEPARATOR))
}
