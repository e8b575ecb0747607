//! Application configuration for SourcePack.
//!
//! User config lives at `~/.sourcepack/sourcepack.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SourcePackError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sourcepack.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sourcepack";

/// Default page budget for the documentation generation pipeline.
pub const DEFAULT_MAX_PAGES: usize = 20;

/// Hard cap for the documentation generation page budget.
pub const MAX_PAGES_CAP: usize = 50;

// ---------------------------------------------------------------------------
// Config structs (matching sourcepack.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Feed resolver settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Site-mapping / scraping service.
    #[serde(default)]
    pub mapping: MappingConfig,

    /// Annotation (text generation) service.
    #[serde(default)]
    pub annotation: AnnotationConfig,

    /// Repository bundler settings.
    #[serde(default)]
    pub repository: RepositoryConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory archives are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Feed / article item count when none is requested.
    #[serde(default = "default_item_limit")]
    pub item_limit: usize,

    /// Page budget for documentation generation.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            item_limit: default_item_limit(),
            max_pages: default_max_pages(),
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}
fn default_item_limit() -> usize {
    crate::slug::DEFAULT_ITEM_LIMIT
}
fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

/// `[feed]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Fixed feed URL used when a request names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_url: Option<String>,

    /// Fetch each item's page and prefer the extracted article text.
    #[serde(default)]
    pub full_articles: bool,
}

/// `[mapping]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_mapping_key_env")]
    pub api_key_env: String,

    /// Base URL of the mapping/scrape service.
    #[serde(default = "default_mapping_base_url")]
    pub base_url: String,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_mapping_key_env(),
            base_url: default_mapping_base_url(),
        }
    }
}

fn default_mapping_key_env() -> String {
    "FIRECRAWL_API_KEY".into()
}
fn default_mapping_base_url() -> String {
    "https://api.firecrawl.dev".into()
}

/// `[annotation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_annotation_key_env")]
    pub api_key_env: String,

    /// Base URL of an OpenAI-compatible chat completions API.
    #[serde(default = "default_annotation_base_url")]
    pub base_url: String,

    /// Model used for page annotation.
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_annotation_key_env(),
            base_url: default_annotation_base_url(),
            model: default_model(),
        }
    }
}

fn default_annotation_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_annotation_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}

/// `[repository]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Code-hosting API base used for zipball downloads.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Directory names skipped in addition to the built-in denylist.
    #[serde(default)]
    pub extra_ignored_dirs: Vec<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            extra_ignored_dirs: Vec::new(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sourcepack/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SourcePackError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sourcepack/sourcepack.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SourcePackError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SourcePackError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SourcePackError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SourcePackError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SourcePackError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve an API key: an explicit value wins, then the named env var.
///
/// Blank values count as absent.
pub fn resolve_api_key(explicit: Option<&str>, env_var: &str) -> Option<String> {
    explicit
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .or_else(|| {
            std::env::var(env_var)
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
        })
}

/// Clamp a requested documentation page budget into `[1, 50]`.
pub fn clamp_max_pages(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_MAX_PAGES)
        .clamp(1, MAX_PAGES_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("FIRECRAWL_API_KEY"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.item_limit, 15);
        assert_eq!(parsed.defaults.max_pages, 20);
        assert_eq!(parsed.annotation.model, "gpt-4o-mini");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[feed]
preset_url = "https://blog.example.com/rss.xml"
full_articles = true

[repository]
extra_ignored_dirs = ["generated"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(
            config.feed.preset_url.as_deref(),
            Some("https://blog.example.com/rss.xml")
        );
        assert!(config.feed.full_articles);
        assert_eq!(config.repository.extra_ignored_dirs, vec!["generated"]);
        assert_eq!(config.repository.api_base, "https://api.github.com");
        assert_eq!(config.mapping.base_url, "https://api.firecrawl.dev");
    }

    #[test]
    fn explicit_api_key_wins() {
        let key = resolve_api_key(Some("sk-explicit"), "SP_TEST_NONEXISTENT_KEY_12345");
        assert_eq!(key.as_deref(), Some("sk-explicit"));
    }

    #[test]
    fn missing_or_blank_api_key_is_none() {
        assert!(resolve_api_key(None, "SP_TEST_NONEXISTENT_KEY_12345").is_none());
        assert!(resolve_api_key(Some("   "), "SP_TEST_NONEXISTENT_KEY_12345").is_none());
    }

    #[test]
    fn blank_explicit_key_falls_back_to_env() {
        let var = "SP_TEST_BLANK_FALLBACK_KEY";
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var(var, "sk-from-env") };
        let key = resolve_api_key(Some("   "), var);
        unsafe { std::env::remove_var(var) };
        assert_eq!(key.as_deref(), Some("sk-from-env"));
    }

    #[test]
    fn max_pages_clamps() {
        assert_eq!(clamp_max_pages(None), 20);
        assert_eq!(clamp_max_pages(Some(0)), 1);
        assert_eq!(clamp_max_pages(Some(500)), 50);
        assert_eq!(clamp_max_pages(Some(7)), 7);
    }
}
