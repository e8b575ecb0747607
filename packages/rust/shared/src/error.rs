//! Error types for SourcePack.
//!
//! Library crates use [`SourcePackError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use serde::Serialize;

/// Top-level error type for all SourcePack operations.
#[derive(Debug, thiserror::Error)]
pub enum SourcePackError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A required request field is missing or malformed.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A URL failed syntactic validation before any network call.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A required upstream fetch answered with a non-2xx status.
    #[error("upstream returned HTTP {status} for {url}")]
    Upstream { url: String, status: u16 },

    /// Transport-level failure on a required fetch.
    #[error("network error: {0}")]
    Network(String),

    /// The fetched document could not be understood.
    #[error("could not understand {what}: {message}")]
    Parse { what: String, message: String },

    /// Nothing usable was discovered (zero items, files or URLs).
    #[error("{message}")]
    Empty { message: String },

    /// The documentation resolver exhausted every branch.
    #[error("no llms.txt or llms-full.txt document found for {site}")]
    NoDocument { site: String, can_generate: bool },

    /// A mapping, scrape or annotation service call failed.
    #[error("{service} service error: {message}")]
    Service { service: String, message: String },

    /// Zip encoding or decoding failed.
    #[error("archive error: {0}")]
    Archive(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SourcePackError>;

/// Resolver-specific hints carried by failure results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryHints {
    /// Upstream status surfaced to the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    /// Generation would be possible if credentials were supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_generate: Option<bool>,
}

impl SourcePackError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an invalid-URL error.
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a parse error for the named kind of document.
    pub fn parse(what: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            message: msg.into(),
        }
    }

    /// Create an empty-result error.
    pub fn empty(msg: impl Into<String>) -> Self {
        Self::Empty {
            message: msg.into(),
        }
    }

    /// Create a service error for the named external service.
    pub fn service(service: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Service {
            service: service.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// HTTP-class status reported in failure results.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Empty { .. } | Self::NoDocument { .. } => 404,
            Self::Parse { .. } => 422,
            Self::Upstream { .. } | Self::Network(_) | Self::Service { .. } => 502,
            Self::InvalidUrl { .. } | Self::Config { .. } | Self::Archive(_) | Self::Io { .. } => {
                500
            }
        }
    }

    /// Hints a caller can act on when retrying.
    pub fn retry_hints(&self) -> RetryHints {
        match self {
            Self::Upstream { status, .. } => RetryHints {
                upstream_status: Some(*status),
                ..Default::default()
            },
            Self::NoDocument { can_generate, .. } => RetryHints {
                can_generate: Some(*can_generate),
                ..Default::default()
            },
            _ => RetryHints::default(),
        }
    }
}

impl From<zip::result::ZipError> for SourcePackError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = SourcePackError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = SourcePackError::Upstream {
            url: "https://x.test/feed".into(),
            status: 503,
        };
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[test]
    fn status_classes_follow_taxonomy() {
        assert_eq!(SourcePackError::invalid_url("nope", "relative URL").status_code(), 500);
        assert_eq!(SourcePackError::parse("feed", "bad xml").status_code(), 422);
        assert_eq!(SourcePackError::empty("feed has no items").status_code(), 404);
        assert_eq!(SourcePackError::validation("siteUrl is required").status_code(), 400);
        assert_eq!(SourcePackError::Network("reset".into()).status_code(), 502);
    }

    #[test]
    fn no_document_carries_generation_hint() {
        let err = SourcePackError::NoDocument {
            site: "https://x.test".into(),
            can_generate: true,
        };
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.retry_hints().can_generate, Some(true));
        assert_eq!(err.retry_hints().upstream_status, None);
    }
}
