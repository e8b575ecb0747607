//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;

use sourcepack_artifacts::{MANIFEST_FILE, read_archive};
use sourcepack_core::pipeline::{
    ArticlesRequest, Bundle, DocsRequest, FeedRequest, Pipeline, Response,
};
use sourcepack_core::{ProgressReporter, SilentProgress};
use sourcepack_repo::{REPO_MANIFEST_NAME, RepoManifest};
use sourcepack_shared::{AppConfig, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SourcePack: bundle web sources into NotebookLM-ready archives.
#[derive(Parser)]
#[command(
    name = "sourcepack",
    version,
    about = "Turn feeds, articles, documentation sites and repositories into NotebookLM-ready zip archives.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print the result object as JSON instead of writing the archive.
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory archives are written to (defaults to `[defaults].output_dir`).
    #[arg(long, global = true)]
    pub out: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Bundle the latest items of an RSS or Atom feed.
    Feed {
        /// Feed URL (falls back to `[feed].preset_url`).
        url: Option<String>,

        /// Number of items to bundle (1-40).
        #[arg(short, long)]
        limit: Option<String>,

        /// Fetch each item's page and prefer the extracted article text.
        #[arg(long)]
        full_articles: bool,
    },

    /// Bundle a list of article URLs, in order.
    Articles {
        /// Article URLs (at most 40).
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Bundle a documentation site via llms-full.txt, generation, or llms.txt.
    Docs(DocsArgs),

    /// Re-package a code repository for NotebookLM.
    Repo(RepoArgs),

    /// List the contents of a SourcePack archive.
    Inspect {
        /// Archive path.
        archive: PathBuf,
    },

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
pub(crate) struct DocsArgs {
    /// Documentation site URL.
    site_url: String,

    /// Page budget for generation (1-50).
    #[arg(long)]
    max_pages: Option<usize>,

    /// Mapping/scrape service key. Falls back to the env var named by
    /// `mapping.api_key_env` in the config.
    #[arg(long)]
    mapping_api_key: Option<String>,

    /// Annotation service key. Falls back to the env var named by
    /// `annotation.api_key_env` in the config.
    #[arg(long)]
    annotation_api_key: Option<String>,

    /// Also fetch the documents an llms.txt index links to.
    #[arg(long)]
    resolve_links: bool,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub(crate) struct RepoArgs {
    /// GitHub repository URL or `owner/name`.
    #[arg(long)]
    url: Option<String>,

    /// Local zip archive of a repository.
    #[arg(long)]
    archive: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sourcepack=info",
        1 => "sourcepack=debug",
        _ => "sourcepack=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Where and how a finished bundle is delivered.
struct Output {
    json: bool,
    dir: PathBuf,
}

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<ExitCode> {
    let Cli {
        json, out, command, ..
    } = cli;

    match command {
        Command::Feed {
            url,
            limit,
            full_articles,
        } => {
            let (pipeline, output, progress) = prepare(json, out)?;
            let request = FeedRequest {
                feed_url: url,
                item_limit: limit,
                full_articles,
            };
            let result = pipeline.bundle_feed(&request, progress.as_ref()).await;
            deliver(&output, result)
        }
        Command::Articles { urls } => {
            let (pipeline, output, progress) = prepare(json, out)?;
            let result = pipeline
                .bundle_articles(&ArticlesRequest { urls }, progress.as_ref())
                .await;
            deliver(&output, result)
        }
        Command::Docs(args) => {
            let (pipeline, output, progress) = prepare(json, out)?;
            let request = DocsRequest {
                site_url: args.site_url,
                max_pages: args.max_pages,
                mapping_api_key: args.mapping_api_key,
                annotation_api_key: args.annotation_api_key,
                resolve_links: args.resolve_links,
            };
            let result = pipeline.bundle_docs(&request, progress.as_ref()).await;
            deliver(&output, result)
        }
        Command::Repo(RepoArgs { url, archive }) => {
            let (pipeline, output, progress) = prepare(json, out)?;
            let result = match (url, archive) {
                (Some(url), _) => pipeline.bundle_repository(&url, progress.as_ref()).await,
                (None, Some(path)) => {
                    let bytes = std::fs::read(&path)
                        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
                    let file_name = path.file_name().and_then(|n| n.to_str());
                    pipeline.bundle_upload(&bytes, file_name, None, progress.as_ref())
                }
                (None, None) => return Err(eyre!("either --url or --archive is required")),
            };
            deliver(&output, result)
        }
        Command::Inspect { archive } => {
            cmd_inspect(&archive)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config { action } => {
            match action {
                ConfigAction::Init => cmd_config_init()?,
                ConfigAction::Show => cmd_config_show()?,
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load config and build the pipeline plus a progress display for one bundle command.
fn prepare(json: bool, out: Option<PathBuf>) -> Result<(Pipeline, Output, Box<dyn ProgressReporter>)> {
    let config = load_config()?;
    let output = Output {
        json,
        dir: out.unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir)),
    };
    let pipeline = Pipeline::new(config)?;
    info!(out = %output.dir.display(), json, "pipeline ready");

    // Keep stdout clean for the JSON result.
    let progress: Box<dyn ProgressReporter> = if json {
        Box::new(SilentProgress)
    } else {
        Box::new(CliProgress::new())
    };
    Ok((pipeline, output, progress))
}

/// Print the result contract (`--json`) or write the archive to disk.
fn deliver<P: Serialize>(
    output: &Output,
    result: sourcepack_shared::Result<Bundle<P>>,
) -> Result<ExitCode> {
    if output.json {
        let response = Response::from_result(result);
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(if response.is_ok() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let bundle = result?;
    let bytes = bundle.archive.to_bytes()?;
    std::fs::create_dir_all(&output.dir)
        .wrap_err_with(|| format!("failed to create {}", output.dir.display()))?;
    let path = output.dir.join(&bundle.archive.file_name);
    std::fs::write(&path, &bytes).wrap_err_with(|| format!("failed to write {}", path.display()))?;

    info!(path = %path.display(), bytes = bytes.len(), "archive written");
    println!();
    println!("  Archive written: {}", path.display());
    println!("  Size:            {} bytes", bytes.len());
    println!();

    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item(&self, label: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {label}"));
    }

    fn done(&self, summary: &str) {
        self.spinner.finish_and_clear();
        println!("  {summary}");
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

// ---------------------------------------------------------------------------
// Inspect + config
// ---------------------------------------------------------------------------

fn cmd_inspect(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).wrap_err_with(|| format!("failed to read {}", path.display()))?;
    let archive = read_archive(&bytes)?;

    println!("{}", path.display());
    for file in &archive.files {
        println!("  {:>9}  {}", file.contents.len(), file.name);
    }
    println!();

    if archive.file(MANIFEST_FILE).is_some() {
        let manifest = archive.manifest()?;
        println!("  Source:  {} ({})", manifest.source_metadata.title, manifest.source_metadata.url);
        println!("  Entries: {}", manifest.entries.len());
        println!("  Words:   {}", manifest.stats.total_words);
    } else if let Some(file) = archive.file(REPO_MANIFEST_NAME) {
        let manifest: RepoManifest = serde_json::from_slice(&file.contents)
            .wrap_err_with(|| format!("invalid {REPO_MANIFEST_NAME}"))?;
        let name = manifest.repo.name.as_deref().unwrap_or("repository");
        println!("  Repository: {name}");
        println!(
            "  Files:      {} of {} included, {} code files converted",
            manifest.stats.included_files,
            manifest.stats.total_files,
            manifest.stats.code_files_converted
        );
    } else {
        println!("  No manifest found.");
    }
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn repo_requires_exactly_one_source() {
        assert!(Cli::try_parse_from(["sourcepack", "repo"]).is_err());
        assert!(
            Cli::try_parse_from(["sourcepack", "repo", "--url", "o/n", "--archive", "x.zip"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["sourcepack", "repo", "--url", "o/n"]).is_ok());
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "sourcepack",
            "feed",
            "https://blog.example.com/feed.xml",
            "--limit",
            "5",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Feed { url, limit, .. } => {
                assert_eq!(url.as_deref(), Some("https://blog.example.com/feed.xml"));
                assert_eq!(limit.as_deref(), Some("5"));
            }
            _ => panic!("expected feed command"),
        }
    }

    #[test]
    fn docs_keys_default_to_none_without_flags() {
        let cli = Cli::try_parse_from(["sourcepack", "docs", "https://docs.example.com"]).unwrap();
        match cli.command {
            Command::Docs(args) => {
                assert_eq!(args.site_url, "https://docs.example.com");
                assert!(args.mapping_api_key.is_none());
                assert!(args.annotation_api_key.is_none());
            }
            _ => panic!("expected docs command"),
        }
    }
}
