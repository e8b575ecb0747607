//! HTTP client construction and URL helpers shared by every resolver.

use reqwest::Client;
use url::Url;

use crate::error::{Result, SourcePackError};

/// Descriptive User-Agent for feed, probe and service requests.
pub const USER_AGENT: &str = concat!(
    "SourcePack/",
    env!("CARGO_PKG_VERSION"),
    " (+https://llmstxt.org)"
);

/// Standard desktop browser User-Agent used for article pages.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Maximum number of redirects followed by any client.
const MAX_REDIRECTS: usize = 5;

/// Build a client identifying itself as SourcePack.
pub fn build_client() -> Result<Client> {
    build_client_with_agent(USER_AGENT)
}

/// Build a client that presents a desktop browser User-Agent.
pub fn build_browser_client() -> Result<Client> {
    build_client_with_agent(BROWSER_USER_AGENT)
}

fn build_client_with_agent(agent: &str) -> Result<Client> {
    Client::builder()
        .user_agent(agent)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(|e| SourcePackError::Network(format!("failed to build HTTP client: {e}")))
}

/// Parse and validate an absolute `http(s)` URL.
pub fn parse_http_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SourcePackError::invalid_url(raw, "URL is empty"));
    }

    let url = Url::parse(trimmed).map_err(|e| SourcePackError::invalid_url(raw, e))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(SourcePackError::invalid_url(
                raw,
                format!("unsupported scheme '{other}'"),
            ));
        }
    }

    if url.host_str().is_none() {
        return Err(SourcePackError::invalid_url(raw, "URL has no host"));
    }

    Ok(url)
}

/// Extract the origin (scheme + host + port) from a URL.
pub fn origin_url(url: &Url) -> Result<String> {
    let scheme = url.scheme();
    let host = url
        .host_str()
        .ok_or_else(|| SourcePackError::invalid_url(url.as_str(), "URL has no host"))?;

    match url.port() {
        Some(port) => Ok(format!("{scheme}://{host}:{port}")),
        None => Ok(format!("{scheme}://{host}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_url_simple() {
        let url = Url::parse("https://docs.example.com/foo/bar").unwrap();
        assert_eq!(origin_url(&url).unwrap(), "https://docs.example.com");
    }

    #[test]
    fn test_origin_url_with_port() {
        let url = Url::parse("http://localhost:3000/docs").unwrap();
        assert_eq!(origin_url(&url).unwrap(), "http://localhost:3000");
    }

    #[test]
    fn parse_http_url_accepts_web_urls() {
        let url = parse_http_url("  https://blog.example.com/feed.xml ").unwrap();
        assert_eq!(url.host_str(), Some("blog.example.com"));
    }

    #[test]
    fn parse_http_url_rejects_garbage() {
        for raw in ["", "not a url", "/relative/path", "ftp://example.com/feed", "mailto:a@b.c"] {
            let err = parse_http_url(raw).unwrap_err();
            assert!(
                matches!(err, SourcePackError::InvalidUrl { .. }),
                "expected InvalidUrl for {raw:?}, got {err:?}"
            );
        }
    }
}
