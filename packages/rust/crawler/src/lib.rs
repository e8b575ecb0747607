//! Article fetching and main-content extraction.
//!
//! This crate provides:
//! - [`ArticleExtractor`]: fail-soft fetch + readability extraction of a web page
//! - [`ExtractedArticle`]: the text and metadata recovered from one page

pub mod article;

pub use article::{ArticleExtractor, ExtractedArticle};
