//! Repository bundling.
//!
//! This crate provides:
//! - [`BundlerTables`]: the static classification tables (ignored directories,
//!   pass-through and code extensions)
//! - [`bundle_archive`]: filter, rename and re-package a zip of source files
//! - [`parse_repository_url`] / [`download_zipball`]: fetch a repository
//!   archive from the code-hosting API

mod bundle;
mod github;
mod tables;

pub use bundle::{
    REPO_MANIFEST_NAME, RepoBundle, RepoManifest, RepoSource, RepoStats, bundle_archive,
};
pub use github::{RepoRef, download_zipball, parse_repository_url};
pub use tables::{BundlerTables, Classification};
