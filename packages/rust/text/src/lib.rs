//! HTML-to-plain-text normalization and main-content extraction.
//!
//! [`html_to_text`] walks a parsed DOM and emits readable plain text;
//! [`readability::extract`] narrows a full page down to its main article
//! before normalizing it.

mod cleanup;
mod normalize;
pub mod readability;

pub use normalize::{NormalizeOptions, html_to_text, html_to_text_with};
pub use readability::{ReadableDocument, extract};
