//! Readability-style main-content extraction.
//!
//! Strips page chrome and boilerplate, locates the element most likely to
//! hold the article body, and normalizes it to plain text.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::normalize::html_to_text;

/// Text and metadata recovered from a full HTML page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadableDocument {
    /// Page title (`og:title`, `<title>`, or first `h1`).
    pub title: Option<String>,
    /// Publication timestamp as advertised by the page.
    pub published_at: Option<String>,
    /// Main-content plain text; empty when nothing readable was found.
    pub text: String,
}

/// Minimum paragraph length (in chars) that contributes to a container score.
const MIN_PARAGRAPH_CHARS: usize = 25;

static CHROME_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "nav, header, footer, aside, form, script, style, noscript, iframe, template, svg, \
         button, [role=navigation], [role=banner], [role=contentinfo], [aria-hidden=true]",
    )
    .expect("valid selector")
});

static ATTRIBUTED_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[class], [id]").expect("valid selector"));

static CONTENT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "[itemprop=articleBody]",
        "article .entry-content",
        "article .post-content",
        ".entry-content",
        ".post-content",
        ".article-body",
        ".article-content",
        "article",
        "[role=main]",
        "main",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("valid selector"))
    .collect()
});

static PARAGRAPH_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p, pre, blockquote, li").expect("valid selector"));

static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid selector"));

static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

static UNLIKELY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)-ad-|\bads?\b|advert|banner|breadcrumb|combx|comment|community|cookie|consent|disqus|footer|gdpr|masthead|menu|modal|newsletter|outbrain|pager|pagination|popup|promo|related|remark|replies|share|shoutbox|sidebar|skyscraper|social|sponsor|subscribe|taboola|widget",
    )
    .expect("valid regex")
});

static POSITIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|h-entry|main|page|post|story|text|blog")
        .expect("valid regex")
});

/// Extract the readable main content and page metadata from `html`.
pub fn extract(html: &str) -> ReadableDocument {
    let mut doc = Html::parse_document(html);

    let title = extract_title(&doc);
    let published_at = extract_published(&doc);

    strip_boilerplate(&mut doc);
    let content_html = select_content(&doc);
    let text = html_to_text(&content_html);

    debug!(
        title = title.as_deref().unwrap_or(""),
        text_len = text.len(),
        "readability extraction complete"
    );

    ReadableDocument {
        title,
        published_at,
        text,
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Page title: `og:title`, then `<title>`, then the first `h1`.
pub fn extract_title(doc: &Html) -> Option<String> {
    meta_content(doc, r#"meta[property="og:title"]"#)
        .or_else(|| first_text(doc, "title"))
        .or_else(|| first_text(doc, "h1"))
}

/// Publication time: `article:published_time` meta, then `time[datetime]`.
pub fn extract_published(doc: &Html) -> Option<String> {
    meta_content(doc, r#"meta[property="article:published_time"]"#)
        .or_else(|| meta_content(doc, r#"meta[itemprop="datePublished"]"#))
        .or_else(|| first_attr(doc, "time[datetime]", "datetime"))
}

fn meta_content(doc: &Html, selector: &str) -> Option<String> {
    first_attr(doc, selector, "content")
}

fn first_attr(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn first_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|t| !t.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Boilerplate removal
// ---------------------------------------------------------------------------

/// Detach chrome elements and nodes whose class/id looks like boilerplate.
fn strip_boilerplate(doc: &mut Html) {
    let mut doomed: Vec<_> = doc.select(&CHROME_SEL).map(|el| el.id()).collect();

    doomed.extend(
        doc.select(&ATTRIBUTED_SEL)
            .filter(|el| !matches!(el.value().name(), "html" | "body" | "article" | "main"))
            .filter(|el| {
                let marker = class_and_id(el);
                UNLIKELY_RE.is_match(&marker) && !POSITIVE_RE.is_match(&marker)
            })
            .map(|el| el.id()),
    );

    debug!(removed = doomed.len(), "stripping boilerplate nodes");

    for id in doomed {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn class_and_id(el: &ElementRef<'_>) -> String {
    let value = el.value();
    format!(
        "{} {}",
        value.attr("class").unwrap_or_default(),
        value.attr("id").unwrap_or_default()
    )
}

// ---------------------------------------------------------------------------
// Content selection
// ---------------------------------------------------------------------------

/// Pick the HTML of the element most likely to be the article body.
fn select_content(doc: &Html) -> String {
    for selector in CONTENT_SELECTORS.iter() {
        if let Some(el) = doc.select(selector).find(|el| has_text(el)) {
            return el.inner_html();
        }
    }

    if let Some(best) = best_scored_container(doc) {
        return best.inner_html();
    }

    doc.select(&BODY_SEL)
        .next()
        .map(|body| body.inner_html())
        .unwrap_or_else(|| doc.root_element().inner_html())
}

fn has_text(el: &ElementRef<'_>) -> bool {
    el.text().any(|t| !t.trim().is_empty())
}

/// Score `div`/`section`/`td` containers by the paragraphs they hold.
///
/// Each paragraph adds `1 + commas + min(len / 100, 3)` to its parent and
/// half that to its grandparent; the total is scaled by `1 - link density`.
fn best_scored_container(doc: &Html) -> Option<ElementRef<'_>> {
    let mut scores: HashMap<_, f64> = HashMap::new();

    for para in doc.select(&PARAGRAPH_SEL) {
        let text = collapse_whitespace(&para.text().collect::<String>());
        let len = text.chars().count();
        if len < MIN_PARAGRAPH_CHARS {
            continue;
        }

        let commas = text.matches(',').count() as f64;
        let score = 1.0 + commas + (len as f64 / 100.0).min(3.0);

        let parent = para.parent().and_then(ElementRef::wrap);
        if let Some(parent) = parent.filter(is_container) {
            *scores.entry(parent.id()).or_default() += score;
        }
        let grandparent = parent
            .and_then(|p| p.parent())
            .and_then(ElementRef::wrap);
        if let Some(grandparent) = grandparent.filter(is_container) {
            *scores.entry(grandparent.id()).or_default() += score / 2.0;
        }
    }

    scores
        .into_iter()
        .filter_map(|(id, score)| {
            let el = doc.tree.get(id).and_then(ElementRef::wrap)?;
            Some((el, score * (1.0 - link_density(&el))))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(el, _)| el)
}

fn is_container(el: &ElementRef<'_>) -> bool {
    matches!(el.value().name(), "div" | "section" | "td" | "article" | "main")
}

/// Share of an element's text that sits inside links.
fn link_density(el: &ElementRef<'_>) -> f64 {
    let total: usize = el.text().map(|t| t.trim().len()).sum();
    if total == 0 {
        return 1.0;
    }
    let linked: usize = el
        .select(&LINK_SEL)
        .flat_map(|a| a.text())
        .map(|t| t.trim().len())
        .sum();
    linked as f64 / total as f64
}
