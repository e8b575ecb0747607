//! Shared types, error model, and configuration for SourcePack.
//!
//! This crate is the foundation depended on by all other SourcePack crates.
//! It provides:
//! - [`SourcePackError`]: the unified error type
//! - Domain types ([`Entry`], [`Manifest`], [`RepoFile`], [`DocLink`])
//! - The slug/id allocator and counting helpers ([`slug`])
//! - Configuration ([`AppConfig`], config loading)
//! - HTTP client builders and URL validation ([`http`])
//! - The [`ProgressReporter`] hook used by every resolver

pub mod config;
pub mod error;
pub mod http;
pub mod progress;
pub mod slug;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnnotationConfig, AppConfig, DefaultsConfig, FeedConfig, MappingConfig, RepositoryConfig,
    clamp_max_pages, config_dir, config_file_path, init_config, load_config, load_config_from,
    resolve_api_key,
};
pub use error::{Result, RetryHints, SourcePackError};
pub use progress::{ProgressReporter, SilentProgress};
pub use slug::{archive_file_name, entry_id, parse_item_limit, slugify, word_count};
pub use types::{
    DocLink, Entry, GenerationResult, MANIFEST_SCHEMA_URI, Manifest, ManifestEntry,
    ManifestStats, PLACEHOLDER_TEXT, RepoFile, RepoIdentity, SourceMetadata,
};
