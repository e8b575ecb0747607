//! Zip-in, zip-out repository bundling.

use std::collections::HashSet;
use std::io::{Cursor, Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use sourcepack_shared::{RepoFile, RepoIdentity, Result, SourcePackError};

use crate::tables::{BundlerTables, Classification, extension_of};

/// Name of the manifest written at the root of every repository bundle.
pub const REPO_MANIFEST_NAME: &str = "notebooklm-manifest.json";

/// Where the input archive came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoSource {
    /// Downloaded from the code-hosting API.
    Github,
    /// Uploaded directly by the caller.
    Upload,
}

/// Aggregate counters for one bundling run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoStats {
    /// Non-directory members in the input archive.
    pub total_files: usize,
    /// Members copied into the output archive.
    pub included_files: usize,
    /// Included members that received a `.txt` suffix.
    pub code_files_converted: usize,
}

/// Contents of `notebooklm-manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoManifest {
    pub source: RepoSource,
    pub generated_at: DateTime<Utc>,
    pub repo: RepoIdentity,
    pub stats: RepoStats,
    pub files: Vec<RepoFile>,
}

/// The re-packaged archive plus its manifest.
#[derive(Debug, Clone)]
pub struct RepoBundle {
    pub archive: Vec<u8>,
    pub manifest: RepoManifest,
}

/// Filter, rename and re-package the members of a zip archive.
///
/// Directory entries, members under an ignored directory and dot-files are
/// skipped. Pass-through files are copied unchanged; code files get a `.txt`
/// suffix; everything else is dropped. A single root folder whose name
/// contains the repository name is stripped from every path.
#[instrument(skip_all, fields(source = ?source, repo = identity.name.as_deref().unwrap_or("")))]
pub fn bundle_archive(
    input: &[u8],
    identity: &RepoIdentity,
    source: RepoSource,
    tables: &BundlerTables,
    generated_at: DateTime<Utc>,
) -> Result<RepoBundle> {
    let mut archive = ZipArchive::new(Cursor::new(input))
        .map_err(|e| SourcePackError::parse("repository archive", e.to_string()))?;

    let repo_name = identity
        .name
        .as_deref()
        .map(|n| n.trim().to_ascii_lowercase())
        .filter(|n| !n.is_empty());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut stats = RepoStats::default();
    let mut files: Vec<RepoFile> = Vec::new();
    let mut written: HashSet<String> = HashSet::new();

    for index in 0..archive.len() {
        let mut member = archive.by_index(index)?;
        if member.is_dir() {
            continue;
        }
        stats.total_files += 1;

        let raw_name = member.name().replace('\\', "/");
        if member.enclosed_name().is_none() {
            warn!(name = %raw_name, "skipping unsafe archive path");
            continue;
        }

        let relative = strip_root(&raw_name, repo_name.as_deref());
        if tables.is_ignored_path(relative) {
            continue;
        }

        let leaf = relative.rsplit('/').next().unwrap_or(relative);
        if leaf.is_empty() || leaf.starts_with('.') {
            continue;
        }

        let (out_path, is_code) = match tables.classify(leaf) {
            Classification::Passthrough => (relative.to_string(), false),
            Classification::Code => (format!("{relative}.txt"), true),
            Classification::Unsupported => {
                debug!(path = relative, "unsupported file type");
                continue;
            }
        };

        if !written.insert(out_path.clone()) {
            warn!(path = %out_path, "duplicate output path, skipping");
            continue;
        }

        let mut content = Vec::new();
        member
            .read_to_end(&mut content)
            .map_err(|e| SourcePackError::Archive(format!("{raw_name}: {e}")))?;

        writer.start_file(out_path.as_str(), options)?;
        writer
            .write_all(&content)
            .map_err(|e| SourcePackError::Archive(format!("{out_path}: {e}")))?;

        stats.included_files += 1;
        if is_code {
            stats.code_files_converted += 1;
        }

        let converted_name = out_path.rsplit('/').next().unwrap_or(&out_path).to_string();
        files.push(RepoFile {
            name: leaf.to_string(),
            original_extension: extension_of(leaf),
            converted_name,
            size: content.len() as u64,
            is_code,
            path: out_path,
        });
    }

    if files.is_empty() {
        return Err(SourcePackError::empty(
            "no supported files found in the repository archive",
        ));
    }

    let manifest = RepoManifest {
        source,
        generated_at,
        repo: identity.clone(),
        stats,
        files,
    };

    let json = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| SourcePackError::Archive(format!("manifest serialization: {e}")))?;
    writer.start_file(REPO_MANIFEST_NAME, options)?;
    writer
        .write_all(&json)
        .map_err(|e| SourcePackError::Archive(format!("{REPO_MANIFEST_NAME}: {e}")))?;

    let archive = writer.finish()?.into_inner();

    info!(
        total = stats.total_files,
        included = stats.included_files,
        converted = stats.code_files_converted,
        bytes = archive.len(),
        "repository bundled"
    );

    Ok(RepoBundle { archive, manifest })
}

/// Drop a wrapping root folder whose name contains the repository name.
fn strip_root<'a>(path: &'a str, repo_name: Option<&str>) -> &'a str {
    let Some(name) = repo_name else {
        return path;
    };
    match path.split_once('/') {
        Some((root, rest)) if !rest.is_empty() && root.to_ascii_lowercase().contains(name) => {
            rest
        }
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, body) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(body.as_bytes()).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    fn read_member(archive: &[u8], name: &str) -> Option<String> {
        let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut file = zip.by_name(name).ok()?;
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        Some(out)
    }

    fn identity(name: &str) -> RepoIdentity {
        RepoIdentity {
            owner: Some("octo".into()),
            name: Some(name.into()),
            url: Some(format!("https://github.com/octo/{name}")),
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn bundles_github_zipball() {
        let input = zip_of(&[
            ("octo-widgets-abc123/", ""),
            ("octo-widgets-abc123/src/", ""),
            ("octo-widgets-abc123/src/app.py", "print('hi')\n"),
            ("octo-widgets-abc123/src/lib/util.ts", "export const x = 1;\n"),
            ("octo-widgets-abc123/README.md", "# Widgets\n"),
            ("octo-widgets-abc123/assets/logo.png", "PNG"),
            ("octo-widgets-abc123/Dockerfile", "FROM scratch\n"),
            ("octo-widgets-abc123/node_modules/x/index.js", "module.exports = 1;"),
            ("octo-widgets-abc123/.env", "SECRET=1"),
            ("octo-widgets-abc123/LICENSE", "MIT"),
        ]);

        let bundle = bundle_archive(
            &input,
            &identity("widgets"),
            RepoSource::Github,
            &BundlerTables::default(),
            now(),
        )
        .unwrap();

        let stats = bundle.manifest.stats;
        assert_eq!(stats.total_files, 8);
        assert_eq!(stats.included_files, 5);
        assert_eq!(stats.code_files_converted, 3);

        let paths: Vec<&str> = bundle.manifest.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "src/app.py.txt",
                "src/lib/util.ts.txt",
                "README.md",
                "assets/logo.png",
                "Dockerfile.txt",
            ]
        );

        let app = &bundle.manifest.files[0];
        assert_eq!(app.name, "app.py");
        assert_eq!(app.original_extension, "py");
        assert_eq!(app.converted_name, "app.py.txt");
        assert_eq!(app.size, 12);
        assert!(app.is_code);

        assert_eq!(read_member(&bundle.archive, "src/app.py.txt").as_deref(), Some("print('hi')\n"));
        assert_eq!(read_member(&bundle.archive, "README.md").as_deref(), Some("# Widgets\n"));
        assert!(read_member(&bundle.archive, "node_modules/x/index.js").is_none());
        assert!(read_member(&bundle.archive, ".env").is_none());
    }

    #[test]
    fn manifest_is_written_into_archive() {
        let input = zip_of(&[("src/app.py", "x = 1\n")]);
        let bundle = bundle_archive(
            &input,
            &RepoIdentity::default(),
            RepoSource::Upload,
            &BundlerTables::default(),
            now(),
        )
        .unwrap();

        assert_eq!(bundle.manifest.files[0].path, "src/app.py.txt");

        let json = read_member(&bundle.archive, REPO_MANIFEST_NAME).expect("manifest");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["source"], "upload");
        assert_eq!(value["generatedAt"], "2024-06-01T12:00:00Z");
        assert_eq!(value["stats"]["includedFiles"], 1);
        assert_eq!(value["stats"]["codeFilesConverted"], 1);
        assert_eq!(value["files"][0]["convertedName"], "app.py.txt");
    }

    #[test]
    fn root_without_repo_name_is_kept() {
        let input = zip_of(&[("other-root/notes.md", "n")]);
        let bundle = bundle_archive(
            &input,
            &identity("widgets"),
            RepoSource::Github,
            &BundlerTables::default(),
            now(),
        )
        .unwrap();
        assert_eq!(bundle.manifest.files[0].path, "other-root/notes.md");
    }

    #[test]
    fn archive_with_only_excluded_files_fails() {
        let input = zip_of(&[
            ("node_modules/x/index.js", "1"),
            (".env", "SECRET=1"),
            ("LICENSE", "MIT"),
        ]);
        let err = bundle_archive(
            &input,
            &RepoIdentity::default(),
            RepoSource::Upload,
            &BundlerTables::default(),
            now(),
        )
        .unwrap_err();

        assert!(matches!(err, SourcePackError::Empty { .. }));
        assert!(err.to_string().contains("no supported files"));
    }

    #[test]
    fn unsafe_paths_are_skipped() {
        let input = zip_of(&[("../evil.py", "boom"), ("ok.md", "fine")]);
        let bundle = bundle_archive(
            &input,
            &RepoIdentity::default(),
            RepoSource::Upload,
            &BundlerTables::default(),
            now(),
        )
        .unwrap();
        assert_eq!(bundle.manifest.stats.total_files, 2);
        assert_eq!(bundle.manifest.stats.included_files, 1);
        assert_eq!(bundle.manifest.files[0].path, "ok.md");
    }

    #[test]
    fn invalid_zip_is_a_parse_error() {
        let err = bundle_archive(
            b"definitely not a zip",
            &RepoIdentity::default(),
            RepoSource::Upload,
            &BundlerTables::default(),
            now(),
        )
        .unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn strip_root_requires_name_match() {
        assert_eq!(strip_root("octo-widgets-1/src/a.rs", Some("widgets")), "src/a.rs");
        assert_eq!(strip_root("Widgets-Main/a.rs", Some("widgets")), "a.rs");
        assert_eq!(strip_root("src/a.rs", Some("widgets")), "src/a.rs");
        assert_eq!(strip_root("widgets", Some("widgets")), "widgets");
        assert_eq!(strip_root("octo-widgets-1/a.rs", None), "octo-widgets-1/a.rs");
    }
}
