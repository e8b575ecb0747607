//! DOM walker that turns HTML into plain text.

use scraper::{ElementRef, Html, Node};
use tracing::debug;

use crate::cleanup;

/// Elements whose contents never reach the output.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "head", "title", "svg", "iframe", "object",
    "canvas", "video", "audio",
];

/// Elements separated from their neighbours by a blank line.
const PARAGRAPH_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "table", "figure",
];

/// Elements that start on a fresh line.
const BLOCK_TAGS: &[&str] = &[
    "div", "section", "article", "main", "header", "footer", "aside", "nav", "ul", "ol", "dl",
    "dt", "dd", "tr", "form", "fieldset", "address", "details", "summary", "figcaption",
    "caption", "body",
];

/// Knobs for [`html_to_text_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Omit images entirely (otherwise their alt text is kept).
    pub drop_images: bool,
    /// Render links whose text equals their target as the text alone.
    pub collapse_same_text_links: bool,
    /// Keep newlines that appear inside text nodes.
    pub preserve_newlines: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            drop_images: true,
            collapse_same_text_links: true,
            preserve_newlines: true,
        }
    }
}

/// Convert an HTML document or fragment to plain text with default options.
pub fn html_to_text(html: &str) -> String {
    html_to_text_with(html, &NormalizeOptions::default())
}

/// Convert an HTML document or fragment to plain text.
///
/// Never fails: malformed markup degrades to best-effort text, and the result
/// is only empty when the input carried no visible text.
pub fn html_to_text_with(html: &str, opts: &NormalizeOptions) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let doc = if looks_like_document(html) {
        Html::parse_document(html)
    } else {
        Html::parse_fragment(html)
    };

    let mut out = TextWriter::new(opts);
    walk(doc.root_element(), &mut out);
    let text = cleanup::run_pipeline(&out.buf);

    if text.is_empty() {
        let fallback = cleanup::strip_tags(html);
        if !fallback.is_empty() {
            debug!(len = fallback.len(), "DOM walk produced no text, using tag-stripped fallback");
        }
        return fallback;
    }

    text
}

fn looks_like_document(html: &str) -> bool {
    let head = html.chars().take(1024).collect::<String>().to_ascii_lowercase();
    head.contains("<!doctype") || head.contains("<html") || head.contains("<body")
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Accumulates text while tracking pending inter-word whitespace.
struct TextWriter<'a> {
    opts: &'a NormalizeOptions,
    buf: String,
    pending_space: bool,
}

impl<'a> TextWriter<'a> {
    fn new(opts: &'a NormalizeOptions) -> Self {
        Self {
            opts,
            buf: String::new(),
            pending_space: false,
        }
    }

    /// Append a text node, collapsing whitespace runs to single spaces.
    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\n' && self.opts.preserve_newlines {
                self.newline();
            } else if c.is_whitespace() {
                self.pending_space = true;
            } else {
                self.flush_space();
                self.buf.push(c);
            }
        }
    }

    /// Append text verbatim.
    fn push_raw(&mut self, text: &str) {
        self.flush_space();
        self.buf.push_str(text);
    }

    fn flush_space(&mut self) {
        if self.pending_space && !self.at_boundary() {
            self.buf.push(' ');
        }
        self.pending_space = false;
    }

    fn at_boundary(&self) -> bool {
        self.buf.is_empty() || self.buf.ends_with([' ', '\n'])
    }

    fn newline(&mut self) {
        self.pending_space = false;
        self.buf.push('\n');
    }

    /// Make sure the buffer ends with at least `n` newlines.
    fn ensure_lines(&mut self, n: usize) {
        self.pending_space = false;
        if self.buf.is_empty() {
            return;
        }
        let trailing = self.buf.len() - self.buf.trim_end_matches('\n').len();
        for _ in trailing..n {
            self.buf.push('\n');
        }
    }
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

fn walk(el: ElementRef<'_>, out: &mut TextWriter<'_>) {
    let name = el.value().name();
    if SKIPPED_TAGS.contains(&name) {
        return;
    }

    match name {
        "br" => out.newline(),
        "hr" => out.ensure_lines(2),
        "img" => {
            if out.opts.drop_images {
                return;
            }
            if let Some(alt) = el.value().attr("alt").map(str::trim).filter(|a| !a.is_empty()) {
                out.push_raw(&format!("[{alt}]"));
            }
        }
        "pre" => {
            out.ensure_lines(2);
            let code: String = el.text().collect();
            out.push_raw(code.trim_matches('\n'));
            out.ensure_lines(2);
        }
        "a" => write_link(el, out),
        "li" => {
            out.ensure_lines(1);
            out.push_raw("* ");
            walk_children(el, out);
            out.ensure_lines(1);
        }
        "td" | "th" => {
            walk_children(el, out);
            out.pending_space = true;
        }
        tag if PARAGRAPH_TAGS.contains(&tag) => {
            out.ensure_lines(2);
            walk_children(el, out);
            out.ensure_lines(2);
        }
        tag if BLOCK_TAGS.contains(&tag) => {
            out.ensure_lines(1);
            walk_children(el, out);
            out.ensure_lines(1);
        }
        _ => walk_children(el, out),
    }
}

fn walk_children(el: ElementRef<'_>, out: &mut TextWriter<'_>) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_text(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    walk(child_el, out);
                }
            }
            _ => {}
        }
    }
}

fn write_link(el: ElementRef<'_>, out: &mut TextWriter<'_>) {
    let mut inner = TextWriter::new(out.opts);
    walk_children(el, &mut inner);
    let text = inner.buf.split_whitespace().collect::<Vec<_>>().join(" ");

    let href = el.value().attr("href").map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return;
    }

    if !is_followable(href)
        || (out.opts.collapse_same_text_links && same_target(&text, href))
    {
        out.push_text(&text);
    } else {
        out.push_text(&format!("{text} [{href}]"));
    }
}

fn is_followable(href: &str) -> bool {
    !href.is_empty() && !href.starts_with('#') && !href.starts_with("javascript:")
}

fn same_target(text: &str, href: &str) -> bool {
    let href = href.strip_prefix("mailto:").unwrap_or(href);
    text.trim_end_matches('/')
        .eq_ignore_ascii_case(href.trim_end_matches('/'))
}
