//! Base64 transport encoding and archive read-back.

use std::io::{Cursor, Read};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use tracing::debug;
use zip::ZipArchive;

use sourcepack_shared::{Manifest, Result, SourcePackError};

use crate::builder::MANIFEST_FILE;

/// Transport form of an archive: `{ base64, fileName }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedArchive {
    pub base64: String,
    pub file_name: String,
}

impl EncodedArchive {
    pub fn from_bytes(bytes: &[u8], file_name: impl Into<String>) -> Self {
        Self {
            base64: STANDARD.encode(bytes),
            file_name: file_name.into(),
        }
    }

    /// Raw zip bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        decode_base64(&self.base64)
    }
}

/// One member of a decoded archive.
#[derive(Debug, Clone)]
pub struct ArchiveFile {
    pub name: String,
    pub contents: Vec<u8>,
}

impl ArchiveFile {
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.contents).ok()
    }
}

/// All members of an archive, in archive order.
#[derive(Debug, Clone, Default)]
pub struct DecodedArchive {
    pub files: Vec<ArchiveFile>,
}

impl DecodedArchive {
    pub fn file(&self, name: &str) -> Option<&ArchiveFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Parse the entry archive's `manifest.json`.
    pub fn manifest(&self) -> Result<Manifest> {
        let file = self.file(MANIFEST_FILE).ok_or_else(|| {
            SourcePackError::parse("archive", format!("missing {MANIFEST_FILE}"))
        })?;
        serde_json::from_slice(&file.contents)
            .map_err(|e| SourcePackError::parse(MANIFEST_FILE, e.to_string()))
    }
}

/// Decode a base64 payload and read every member of the zip inside it.
pub fn decode_archive(payload: &str) -> Result<DecodedArchive> {
    read_archive(&decode_base64(payload)?)
}

/// Read every file member of a zip held in memory.
pub fn read_archive(bytes: &[u8]) -> Result<DecodedArchive> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let mut files = Vec::with_capacity(zip.len());

    for index in 0..zip.len() {
        let mut member = zip.by_index(index)?;
        if member.is_dir() {
            continue;
        }
        let name = member.name().to_string();
        let mut contents = Vec::new();
        member
            .read_to_end(&mut contents)
            .map_err(|e| SourcePackError::Archive(format!("{name}: {e}")))?;
        files.push(ArchiveFile { name, contents });
    }

    debug!(files = files.len(), "archive read");
    Ok(DecodedArchive { files })
}

fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(payload.trim())
        .map_err(|e| SourcePackError::Archive(format!("invalid base64 payload: {e}")))
}
