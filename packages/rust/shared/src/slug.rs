//! Deterministic identifiers, file names and small counting helpers.

use chrono::NaiveDate;

/// Maximum slug length for entry ids (excluding the index prefix).
pub const ENTRY_SLUG_MAX: usize = 48;

/// Maximum slug length for archive file names (excluding the date suffix).
pub const FILE_SLUG_MAX: usize = 64;

/// Fallback token for entries whose title has no usable characters.
pub const ENTRY_FALLBACK: &str = "entry";

/// Fallback token for archive file names.
pub const ARCHIVE_FALLBACK: &str = "notebooklm-source";

/// Item count used when the requested limit is not an integer.
pub const DEFAULT_ITEM_LIMIT: usize = 15;

/// Upper bound for feed / article item counts.
pub const MAX_ITEM_LIMIT: usize = 40;

/// Convert arbitrary text into a filesystem-safe slug.
///
/// Output contains only `[a-z0-9]` runs joined by single hyphens, is at most
/// `max_len` bytes, and falls back to `fallback` when nothing survives.
pub fn slugify(text: &str, max_len: usize, fallback: &str) -> String {
    let joined = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    // Only ASCII remains, so byte truncation is char-safe.
    let truncated = if joined.len() > max_len {
        &joined[..max_len]
    } else {
        joined.as_str()
    };
    let trimmed = truncated.trim_matches('-');

    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Archive entry id: zero-padded one-based position plus the title slug.
pub fn entry_id(index: usize, title: &str) -> String {
    format!(
        "{:02}-{}",
        index + 1,
        slugify(title, ENTRY_SLUG_MAX, ENTRY_FALLBACK)
    )
}

/// Archive file name derived from the source title and a calendar date.
pub fn archive_file_name(title: &str, date: NaiveDate) -> String {
    format!(
        "{}-{}.zip",
        slugify(title, FILE_SLUG_MAX, ARCHIVE_FALLBACK),
        date.format("%Y-%m-%d")
    )
}

/// Number of whitespace-delimited non-empty tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Parse a requested item count, clamped to `[1, 40]`.
///
/// Non-integer input yields [`DEFAULT_ITEM_LIMIT`]; integer literals too large
/// for `i64` saturate toward the matching bound.
pub fn parse_item_limit(raw: Option<&str>) -> usize {
    let Some(raw) = raw.map(str::trim) else {
        return DEFAULT_ITEM_LIMIT;
    };

    match raw.parse::<i64>() {
        Ok(n) => clamp_count(n, MAX_ITEM_LIMIT),
        Err(_) if is_integer_literal(raw) => {
            if raw.starts_with('-') {
                1
            } else {
                MAX_ITEM_LIMIT
            }
        }
        Err(_) => DEFAULT_ITEM_LIMIT,
    }
}

/// Clamp a signed count into `[1, max]`.
pub fn clamp_count(n: i64, max: usize) -> usize {
    usize::try_from(n.max(1)).map_or(max, |n| n.min(max))
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Take at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_slug_shaped(s: &str) -> bool {
        let re = regex::Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("regex");
        re.is_match(s)
    }

    #[test]
    fn slugify_basic_titles() {
        assert_eq!(slugify("Hello, World!", 48, "entry"), "hello-world");
        assert_eq!(slugify("  --Rust 2024: What's New?--  ", 48, "entry"), "rust-2024-what-s-new");
        assert_eq!(slugify("a__b  c", 48, "entry"), "a-b-c");
    }

    #[test]
    fn slugify_falls_back_on_symbol_only_input() {
        assert_eq!(slugify("", 48, "entry"), "entry");
        assert_eq!(slugify("!!! ??? ***", 48, "entry"), "entry");
        assert_eq!(slugify("日本語", 48, "notebooklm-source"), "notebooklm-source");
    }

    #[test]
    fn slugify_truncates_without_trailing_hyphen() {
        let title = "word ".repeat(30);
        let slug = slugify(&title, 48, "entry");
        assert!(slug.len() <= 48);
        assert!(!slug.ends_with('-'));
        assert!(is_slug_shaped(&slug));
    }

    #[test]
    fn slugify_output_is_always_slug_shaped_or_fallback() {
        let titles = [
            "Ünïcödé Tïtle",
            "C++ & Rust",
            "---",
            "2024-01-01 release",
            "tab\tseparated\nlines",
            "émoji 🚀 launch",
        ];
        for title in titles {
            let slug = slugify(title, 48, "entry");
            assert!(slug == "entry" || is_slug_shaped(&slug), "bad slug {slug:?} for {title:?}");
        }
    }

    #[test]
    fn slugify_is_deterministic() {
        assert_eq!(slugify("Same Title", 48, "entry"), slugify("Same Title", 48, "entry"));
    }

    #[test]
    fn entry_id_is_zero_padded() {
        assert_eq!(entry_id(0, "First Post"), "01-first-post");
        assert_eq!(entry_id(9, "???"), "10-entry");
        assert_eq!(entry_id(99, "x"), "100-x");
    }

    #[test]
    fn archive_file_name_uses_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).expect("date");
        assert_eq!(archive_file_name("My Blog", date), "my-blog-2024-03-09.zip");
        assert_eq!(archive_file_name("", date), "notebooklm-source-2024-03-09.zip");
    }

    #[test]
    fn word_count_examples() {
        assert_eq!(word_count("a  b\tc"), 3);
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("  \n\t "), 0);
    }

    #[test]
    fn item_limit_clamps_and_defaults() {
        assert_eq!(parse_item_limit(Some("10")), 10);
        assert_eq!(parse_item_limit(Some("0")), 1);
        assert_eq!(parse_item_limit(Some("-7")), 1);
        assert_eq!(parse_item_limit(Some("41")), 40);
        assert_eq!(parse_item_limit(Some(" 40 ")), 40);
        assert_eq!(parse_item_limit(Some("abc")), 15);
        assert_eq!(parse_item_limit(Some("3.5")), 15);
        assert_eq!(parse_item_limit(Some("")), 15);
        assert_eq!(parse_item_limit(None), 15);
        assert_eq!(parse_item_limit(Some("99999999999999999999999")), 40);
        assert_eq!(parse_item_limit(Some("-99999999999999999999999")), 1);
    }

    #[test]
    fn item_limit_matches_min_max_formula() {
        for n in -5..60_i64 {
            let expected = n.clamp(1, 40) as usize;
            assert_eq!(parse_item_limit(Some(&n.to_string())), expected);
        }
    }

    #[test]
    fn truncate_chars_respects_code_points() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
