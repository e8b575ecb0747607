//! Entry archive assembly.
//!
//! Layout:
//! ```text
//! <file-name>.zip
//! ├── manifest.json
//! ├── 01-first-entry.md        (or articles/01-first-entry.md when namespaced)
//! ├── 02-second-entry.md
//! └── sources.json
//! ```

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use sourcepack_shared::{
    Entry, MANIFEST_SCHEMA_URI, Manifest, ManifestEntry, ManifestStats, Result, SourceMetadata,
    SourcePackError, archive_file_name,
};

use crate::encoding::EncodedArchive;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SOURCES_FILE: &str = "sources.json";

/// Knobs for [`build_archive`].
#[derive(Debug, Clone, Default)]
pub struct ArchiveOptions {
    /// Directory the per-entry files are placed under (e.g. `articles`).
    pub namespace: Option<String>,
    /// Generation timestamp; defaults to now.
    pub generated_at: Option<DateTime<Utc>>,
}

/// Full-fidelity record stored in `sources.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub title: String,
    pub url: String,
    pub published_at: Option<String>,
    pub text_content: String,
}

/// A finished archive, still in raw bytes.
#[derive(Debug, Clone)]
pub struct BuiltArchive {
    pub manifest: Manifest,
    pub bytes: Vec<u8>,
    pub file_name: String,
}

impl BuiltArchive {
    /// Base64-encode the archive for transport.
    pub fn encode(&self) -> EncodedArchive {
        EncodedArchive::from_bytes(&self.bytes, &self.file_name)
    }
}

/// Render the text file written for a single entry.
pub fn render_entry(entry: &Entry) -> String {
    let mut out = format!("# {}\n", entry.title);
    if let Some(published) = entry.published_at.as_deref().filter(|p| !p.is_empty()) {
        out.push_str(&format!("Published: {published}\n"));
    }
    out.push_str(&format!("Source: {}\n\n", entry.url));
    out.push_str(entry.text_content.trim_end());
    out.push('\n');
    out
}

/// Build the manifest, per-entry files and `sources.json` into one zip.
///
/// The entry list must already be final: an empty list is rejected and
/// nothing is written.
#[instrument(skip_all, fields(entries = entries.len(), source = %source.url))]
pub fn build_archive(
    entries: &[Entry],
    source: &SourceMetadata,
    options: &ArchiveOptions,
) -> Result<BuiltArchive> {
    if entries.is_empty() {
        return Err(SourcePackError::empty("no entries to archive"));
    }

    let generated_at = options.generated_at.unwrap_or_else(Utc::now);
    let prefix = options
        .namespace
        .as_deref()
        .map(|ns| ns.trim_matches('/'))
        .filter(|ns| !ns.is_empty())
        .map(|ns| format!("{ns}/"))
        .unwrap_or_default();

    let manifest_entries: Vec<ManifestEntry> = entries
        .iter()
        .map(|entry| ManifestEntry {
            id: entry.id.clone(),
            title: entry.title.clone(),
            url: entry.url.clone(),
            published_at: entry.published_at.clone(),
            word_count: entry.word_count(),
            file: format!("{prefix}{}.md", entry.id),
        })
        .collect();

    let stats = ManifestStats {
        entry_count: manifest_entries.len(),
        total_words: manifest_entries.iter().map(|e| e.word_count).sum(),
    };

    let manifest = Manifest {
        schema_uri: MANIFEST_SCHEMA_URI.to_string(),
        generated_at,
        source_metadata: source.clone(),
        entries: manifest_entries,
        stats,
    };

    let sources: BTreeMap<&str, SourceRecord> = entries
        .iter()
        .map(|entry| {
            (
                entry.id.as_str(),
                SourceRecord {
                    title: entry.title.clone(),
                    url: entry.url.clone(),
                    published_at: entry.published_at.clone(),
                    text_content: entry.text_content.clone(),
                },
            )
        })
        .collect();

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    write_file(&mut zip, options, MANIFEST_FILE, &to_json(&manifest)?)?;
    for (entry, record) in entries.iter().zip(&manifest.entries) {
        write_file(&mut zip, options, &record.file, render_entry(entry).as_bytes())?;
    }
    write_file(&mut zip, options, SOURCES_FILE, &to_json(&sources)?)?;

    let bytes = zip.finish()?.into_inner();
    let file_name = archive_file_name(&source.title, generated_at.date_naive());

    info!(
        file_name = %file_name,
        entry_count = stats.entry_count,
        total_words = stats.total_words,
        bytes = bytes.len(),
        "archive built"
    );

    Ok(BuiltArchive {
        manifest,
        bytes,
        file_name,
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value)
        .map_err(|e| SourcePackError::Archive(format!("json serialization: {e}")))
}

fn write_file(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    name: &str,
    contents: &[u8],
) -> Result<()> {
    zip.start_file(name, options)?;
    zip.write_all(contents)
        .map_err(|e| SourcePackError::Archive(format!("{name}: {e}")))
}
