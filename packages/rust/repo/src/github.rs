//! GitHub repository references and zipball download.

use reqwest::Client;
use tracing::{debug, info, instrument};

use sourcepack_shared::{RepoIdentity, Result, SourcePackError};

/// Owner/name pair identifying a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Canonical web URL.
    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }

    pub fn identity(&self) -> RepoIdentity {
        RepoIdentity {
            owner: Some(self.owner.clone()),
            name: Some(self.name.clone()),
            url: Some(self.url()),
        }
    }
}

/// Parse `https://github.com/o/n`, `github.com/o/n` or the `o/n` shorthand.
///
/// A trailing `.git` and any path after the repository name are ignored.
pub fn parse_repository_url(input: &str) -> Result<RepoRef> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SourcePackError::validation("repository URL is required"));
    }

    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);

    let path = match without_scheme.split_once('/') {
        Some((host, rest)) if host.contains('.') || host.contains(':') => {
            let host = host.to_ascii_lowercase();
            if host != "github.com" && host != "www.github.com" {
                return Err(SourcePackError::validation(format!(
                    "unsupported repository host '{host}' (only github.com)"
                )));
            }
            rest
        }
        _ => without_scheme,
    };

    let mut segments = path
        .split(['/', '?', '#'])
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let owner = segments.next();
    let name = segments.next().map(|n| n.strip_suffix(".git").unwrap_or(n));

    match (owner, name) {
        (Some(owner), Some(name)) if is_valid_segment(owner) && is_valid_segment(name) => {
            Ok(RepoRef {
                owner: owner.to_string(),
                name: name.to_string(),
            })
        }
        _ => Err(SourcePackError::validation(format!(
            "'{trimmed}' is not a GitHub repository (expected owner/name)"
        ))),
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Download the default-branch zipball through the REST API.
#[instrument(skip_all, fields(repo = %format!("{}/{}", repo.owner, repo.name)))]
pub async fn download_zipball(client: &Client, api_base: &str, repo: &RepoRef) -> Result<Vec<u8>> {
    let url = format!(
        "{}/repos/{}/{}/zipball",
        api_base.trim_end_matches('/'),
        repo.owner,
        repo.name
    );
    debug!(%url, "downloading zipball");

    let response = client
        .get(&url)
        .header("Accept", "application/vnd.github+json")
        .send()
        .await
        .map_err(|e| SourcePackError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourcePackError::Upstream {
            url,
            status: status.as_u16(),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SourcePackError::Network(format!("{url}: failed to read body: {e}")))?;

    info!(bytes = bytes.len(), "zipball downloaded");
    Ok(bytes.to_vec())
}
