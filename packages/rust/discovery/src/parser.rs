//! llms.txt / llms-full.txt parser.
//!
//! Recognizes the parts of the format (<https://llmstxt.org/>) that matter for
//! bundling:
//! - Leading line: `# Title`
//! - Next line: `> Description`
//! - Links anywhere: `- [Title](url): Optional description`
//!
//! Parsing never fails; a document without a title line simply has none.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use sourcepack_shared::DocLink;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Parsed representation of an llms-style document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmsDocument {
    /// The leading H1 title.
    pub title: Option<String>,
    /// The blockquote directly following the title.
    pub description: Option<String>,
    /// Every link line in document order, resolved against the site origin.
    pub links: Vec<DocLink>,
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `# Title`.
static H1_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#\s+(.+)$").expect("H1 regex"));

/// Matches `> Blockquote text`.
static BLOCKQUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>\s*(.+)$").expect("blockquote regex"));

/// Matches `- [Name](url)` or `- [Name](url): Notes`.
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-*]\s+\[([^\]]+)\]\(([^)\s]+)\)(?::\s*(.+))?$").expect("link regex")
});

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse an llms document, resolving relative link targets against `origin`.
pub fn parse_llms_document(content: &str, origin: &Url) -> LlmsDocument {
    let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();

    let title = lines
        .next_if(|line| H1_RE.is_match(line))
        .and_then(|line| H1_RE.captures(line))
        .map(|caps| caps[1].trim().to_string());

    let description = if title.is_some() {
        lines
            .next_if(|line| BLOCKQUOTE_RE.is_match(line))
            .and_then(|line| BLOCKQUOTE_RE.captures(line))
            .map(|caps| caps[1].trim().to_string())
    } else {
        None
    };

    let links = lines
        .filter_map(|line| LINK_RE.captures(line))
        .filter_map(|caps| {
            let url = resolve_link(&caps[2], origin)?;
            Some(DocLink {
                title: caps[1].trim().to_string(),
                url,
                description: caps
                    .get(3)
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|d| !d.is_empty()),
            })
        })
        .collect();

    LlmsDocument {
        title,
        description,
        links,
    }
}

fn resolve_link(target: &str, origin: &Url) -> Option<String> {
    origin.join(target.trim()).ok().map(String::from)
}
