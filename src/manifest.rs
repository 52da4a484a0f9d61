//! Repository manifest inspection and pipeline generation.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};

use crate::analysis::{AnalysisError, Analyzer, RepoFiles};

/// Build files collected into the manifest.
pub const MANIFEST_FILES: [&str; 7] = [
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "Dockerfile",
    "pom.xml",
    "build.gradle",
    "Cargo.toml",
];

/// Directories never descended into.
pub const SKIPPED_DIRS: [&str; 2] = [".git", "target"];

/// Per-file content cap, in characters.
pub const MANIFEST_CONTENT_CHARS: usize = 4_000;

/// Placeholder stored for files that exist but cannot be read as UTF-8.
pub const UNREADABLE: &str = "<unreadable>";

/// CI system a generated pipeline targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PipelineTarget {
    /// GitHub Actions workflow YAML.
    #[default]
    Github,
    /// Declarative Jenkinsfile.
    Jenkins,
}

impl std::fmt::Display for PipelineTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Github => f.write_str("github"),
            Self::Jenkins => f.write_str("jenkins"),
        }
    }
}

/// Walk `root` and collect known build files keyed by relative path.
///
/// # Errors
///
/// Returns an error if `root` itself cannot be listed. Unreadable
/// subdirectories are skipped and unreadable files are recorded as
/// [`UNREADABLE`].
pub fn inspect_repo(root: &Path) -> io::Result<RepoFiles> {
    let mut manifest = RepoFiles::new();
    walk(root, root, &mut manifest, true)?;
    debug!(root = %root.display(), files = manifest.len(), "repository inspected");
    Ok(manifest)
}

fn walk(root: &Path, dir: &Path, manifest: &mut RepoFiles, top: bool) -> io::Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if top => return Err(e),
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
            return Ok(());
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if !SKIPPED_DIRS.contains(&name.as_ref()) {
                walk(root, &path, manifest, false)?;
            }
        } else if MANIFEST_FILES.contains(&name.as_ref()) {
            let key = relative_key(root, &path);
            let content = fs::read_to_string(&path)
                .map(|text| text.chars().take(MANIFEST_CONTENT_CHARS).collect())
                .unwrap_or_else(|_| UNREADABLE.to_owned());
            manifest.insert(key, content);
        }
    }
    Ok(())
}

fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Ask the model for a CI pipeline suited to `manifest`.
///
/// Returns the suggested pipeline, falling back to the raw model text.
///
/// # Errors
///
/// Returns [`AnalysisError`] when the provider call fails.
pub async fn generate_pipeline(
    analyzer: &Analyzer,
    manifest: &RepoFiles,
    target: PipelineTarget,
) -> Result<Option<String>, AnalysisError> {
    let detected = manifest.keys().cloned().collect::<Vec<_>>().join("\n");
    let request =
        format!("Please generate a {target} CI pipeline for this project.\nDetected files:\n{detected}");

    info!(%target, files = manifest.len(), "generating pipeline");
    let analysis = analyzer.analyze(&request, Some(manifest)).await?;
    Ok(analysis.patch().map(str::to_owned).or(analysis.raw))
}
