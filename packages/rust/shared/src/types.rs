//! Core domain types for SourcePack bundles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema identifier written into every `manifest.json`.
pub const MANIFEST_SCHEMA_URI: &str = "https://sourcepack.dev/schema/manifest/v1.json";

/// Body substituted when every extraction candidate came back empty.
pub const PLACEHOLDER_TEXT: &str = "No content could be extracted for this entry.";

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// A single resolved item destined for the archive.
///
/// Entries are produced by a resolver, never mutated afterwards, and consumed
/// by the archive builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Position-derived identifier, unique within one archive.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Canonical URL of the item.
    pub url: String,
    /// Publication timestamp as reported upstream (RFC 3339 when parseable).
    pub published_at: Option<String>,
    /// Plain-text body, never empty.
    pub text_content: String,
}

impl Entry {
    /// Build an entry at `index`, deriving its id from the position and title.
    ///
    /// An empty body is replaced by [`PLACEHOLDER_TEXT`].
    pub fn new(
        index: usize,
        title: impl Into<String>,
        url: impl Into<String>,
        published_at: Option<String>,
        text_content: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let text_content = text_content.into();
        let text_content = if text_content.trim().is_empty() {
            PLACEHOLDER_TEXT.to_string()
        } else {
            text_content
        };

        Self {
            id: crate::slug::entry_id(index, &title),
            title,
            url: url.into(),
            published_at,
            text_content,
        }
    }

    /// Number of whitespace-delimited words in the body.
    pub fn word_count(&self) -> usize {
        crate::slug::word_count(&self.text_content)
    }
}

// ---------------------------------------------------------------------------
// Source metadata + manifest
// ---------------------------------------------------------------------------

/// Describes where a bundle came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub title: String,
    pub description: String,
    pub url: String,
}

/// The `manifest.json` written at the root of every entry archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Schema identifier ([`MANIFEST_SCHEMA_URI`]).
    pub schema_uri: String,
    /// When the archive was generated.
    pub generated_at: DateTime<Utc>,
    /// Where the entries came from.
    pub source_metadata: SourceMetadata,
    /// One record per written entry file, in archive order.
    pub entries: Vec<ManifestEntry>,
    /// Aggregate statistics over `entries`.
    pub stats: ManifestStats,
}

/// Index record for one entry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: String,
    pub title: String,
    pub url: String,
    pub published_at: Option<String>,
    pub word_count: usize,
    /// Path of the entry file inside the archive.
    pub file: String,
}

/// Counts derived from the surviving entry list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestStats {
    pub entry_count: usize,
    pub total_words: usize,
}

// ---------------------------------------------------------------------------
// Repository bundling
// ---------------------------------------------------------------------------

/// One archive member that survived classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoFile {
    /// Rewritten destination path (de-prefixed, possibly `.txt`-suffixed).
    pub path: String,
    /// Original leaf file name.
    pub name: String,
    /// Lowercased original extension (empty when none).
    pub original_extension: String,
    /// Leaf name as written to the output archive.
    pub converted_name: String,
    /// Byte length of the copied content.
    pub size: u64,
    /// Whether the file was classified as source code.
    pub is_code: bool,
}

/// Optional identity of the repository being bundled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoIdentity {
    pub owner: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
}

// ---------------------------------------------------------------------------
// Documentation resolution
// ---------------------------------------------------------------------------

/// A reference parsed from an llms.txt-style link list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocLink {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
}

/// One successfully scraped and annotated page inside the generation pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub url: String,
    pub title: String,
    pub description: String,
    pub markdown: String,
    /// Position of the URL in the mapped list.
    pub index: usize,
}
