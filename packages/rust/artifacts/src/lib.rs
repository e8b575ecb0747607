//! Archive Builder.
//!
//! Serializes a finalized entry list into a zip containing `manifest.json`,
//! one text file per entry and `sources.json`, and encodes it for transport.

mod builder;
mod encoding;

pub use builder::{
    ArchiveOptions, BuiltArchive, MANIFEST_FILE, SOURCES_FILE, SourceRecord, build_archive,
    render_entry,
};
pub use encoding::{ArchiveFile, DecodedArchive, EncodedArchive, decode_archive, read_archive};
