//! Post-walk cleanup passes for normalized plain text.
//!
//! Each pass is a function `&str -> String` applied in sequence.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on raw walker output.
pub(crate) fn run_pipeline(text: &str) -> String {
    let mut result = text.replace("\r\n", "\n");

    result = normalize_whitespace(&result);
    result = clean_blank_lines(&result);
    result.trim().to_string()
}

// ---------------------------------------------------------------------------
// Pass 1: Normalize whitespace
// ---------------------------------------------------------------------------

/// Trim trailing whitespace on every line.
fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Clean up excessive blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of 3+ newlines into exactly 2.
fn clean_blank_lines(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(text, "\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Fallback: strip tags
// ---------------------------------------------------------------------------

/// Crude tag stripper used when the DOM walk produced nothing.
pub(crate) fn strip_tags(html: &str) -> String {
    static HIDDEN_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)<script\b.*?</script>|<style\b.*?</style>|<!--.*?-->")
            .expect("valid regex")
    });
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

    let visible = HIDDEN_RE.replace_all(html, " ");
    let stripped = TAG_RE.replace_all(&visible, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_blank_lines_collapses_excess() {
        assert_eq!(clean_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(clean_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn normalize_whitespace_trims_trailing() {
        assert_eq!(normalize_whitespace("a   \nb\t\nc"), "a\nb\nc");
    }

    #[test]
    fn pipeline_trims_ends() {
        assert_eq!(run_pipeline("\n\n  Title  \n\n\n\nBody \n\n"), "Title\n\nBody");
    }

    #[test]
    fn strip_tags_drops_scripts_and_decodes() {
        let html = "<p>Fish &amp; chips</p><script>var x = 1;</script><b>ok</b>";
        assert_eq!(strip_tags(html), "Fish & chips ok");
    }
}
