//! Core orchestration for SourcePack.
//!
//! This crate ties together feed resolution, article extraction, llms.txt
//! discovery, documentation generation and repository bundling into the
//! request-level entry points on [`Pipeline`].

pub mod docs;
pub mod generation;
pub mod pipeline;
pub mod services;

pub use docs::{DocsOptions, DocsResolution, DocsSource, GenerationCredentials, resolve_docs};
pub use pipeline::{
    ArticlesRequest, Bundle, DocsRequest, FeedRequest, Pipeline, Response,
};
pub use sourcepack_shared::{ProgressReporter, SilentProgress};
