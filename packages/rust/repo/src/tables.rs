//! Static classification tables for the repository bundler.
//!
//! The tables are plain data: the bundler receives them by reference and never
//! mutates them. Config can extend the ignored-directory list.

use std::collections::BTreeSet;

/// Build, dependency, version-control and cache directory names.
const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "target",
    "vendor",
    "__pycache__",
    ".next",
    ".nuxt",
    ".cache",
    "coverage",
    ".venv",
    "venv",
    ".idea",
    ".vscode",
    "out",
    "bin",
    "obj",
    ".gradle",
    ".svn",
    ".hg",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    ".turbo",
    "bower_components",
    "jspm_packages",
];

/// Documents, images and media copied unchanged.
const PASSTHROUGH_EXTENSIONS: &[&str] = &[
    // documents
    "pdf", "txt", "md", "markdown", "mdx", "rst", "adoc", "docx", "doc", "rtf", "csv",
    // images
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff",
    // media
    "mp3", "wav", "m4a", "aac", "ogg", "flac", "mp4", "mov", "webm",
];

/// Source code and structured config copied with a `.txt` suffix.
const CODE_EXTENSIONS: &[&str] = &[
    "rs", "py", "pyi", "js", "mjs", "cjs", "ts", "mts", "cts", "jsx", "tsx", "go", "java",
    "kt", "kts", "scala", "groovy", "swift", "m", "mm", "c", "h", "cc", "cpp", "cxx", "hpp",
    "hh", "cs", "fs", "vb", "rb", "php", "pl", "pm", "lua", "r", "dart", "ex", "exs", "erl",
    "hrl", "hs", "ml", "mli", "clj", "cljs", "elm", "zig", "nim", "jl", "sol", "sh", "bash",
    "zsh", "fish", "ps1", "bat", "cmd", "sql", "graphql", "gql", "proto", "html", "htm", "css",
    "scss", "sass", "less", "vue", "svelte", "astro", "json", "jsonc", "yaml", "yml", "toml",
    "xml", "ini", "cfg", "conf", "env", "gradle", "cmake", "mk", "tf", "tfvars", "hcl", "nix",
    "dockerfile", "ipynb",
];

/// Extension-less file names treated as code.
const CODE_FILE_NAMES: &[&str] = &[
    "Dockerfile",
    "Makefile",
    "GNUmakefile",
    "Rakefile",
    "Gemfile",
    "Procfile",
    "Jenkinsfile",
    "Vagrantfile",
    "Brewfile",
    "Justfile",
    "Tiltfile",
];

/// How a single archive member is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Copied unchanged.
    Passthrough,
    /// Copied with a `.txt` suffix appended to the output path.
    Code,
    /// Dropped.
    Unsupported,
}

/// Immutable lookup tables injected into the bundler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlerTables {
    pub ignored_dirs: BTreeSet<String>,
    pub passthrough_extensions: BTreeSet<String>,
    pub code_extensions: BTreeSet<String>,
    pub code_file_names: BTreeSet<String>,
}

impl Default for BundlerTables {
    fn default() -> Self {
        Self {
            ignored_dirs: to_set(IGNORED_DIRS),
            passthrough_extensions: to_set(PASSTHROUGH_EXTENSIONS),
            code_extensions: to_set(CODE_EXTENSIONS),
            code_file_names: CODE_FILE_NAMES.iter().map(|name| name.to_ascii_lowercase()).collect(),
        }
    }
}

fn to_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl BundlerTables {
    /// Default tables plus extra ignored directory names (e.g. from config).
    pub fn with_extra_ignored_dirs<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tables = Self::default();
        tables.ignored_dirs.extend(
            extra
                .into_iter()
                .map(|d| d.as_ref().trim().trim_matches('/').to_string())
                .filter(|d| !d.is_empty()),
        );
        tables
    }

    /// True when any directory component of `path` is on the denylist.
    pub fn is_ignored_path(&self, path: &str) -> bool {
        let mut components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        components.pop();
        components.iter().any(|c| self.ignored_dirs.contains(*c))
    }

    /// Classify a leaf file name by its (case-insensitive) extension.
    pub fn classify(&self, file_name: &str) -> Classification {
        let ext = extension_of(file_name);

        if ext.is_empty() {
            return if self.code_file_names.contains(&file_name.to_ascii_lowercase()) {
                Classification::Code
            } else {
                Classification::Unsupported
            };
        }

        if self.passthrough_extensions.contains(&ext) {
            Classification::Passthrough
        } else if self.code_extensions.contains(&ext) {
            Classification::Code
        } else {
            Classification::Unsupported
        }
    }
}

/// Lowercased extension of a leaf file name; empty when there is none.
pub(crate) fn extension_of(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}
