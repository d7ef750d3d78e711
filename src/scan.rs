//! File discovery for the ingestion pipelines.
//!
//! Walks the workspace with `walkdir`, filtering by include/exclude globs
//! (via `globset`), a binary-extension deny list, and a size cap. Also
//! locates `SKILL.md` files and session logs.
//!
//! `.git/`, `target/`, and `node_modules/` are always excluded.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::WorkspaceConfig;

/// Extensions that are never read as text.
const BINARY_EXTENSIONS: &[&str] = &[
    "pyc", "so", "o", "a", "png", "jpg", "jpeg", "gif", "zip", "tar", "gz",
];

pub const SKILL_FILE_NAME: &str = "SKILL.md";

/// A workspace file selected for ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedFile {
    pub path: PathBuf,
    /// Path relative to the workspace root, used as the chunk `source`.
    pub relative: String,
    pub size: u64,
}

/// Candidate files under `root`, sorted by relative path.
pub fn scan_workspace(root: &Path, config: &WorkspaceConfig) -> Result<Vec<ScannedFile>> {
    if !root.exists() {
        bail!("Workspace root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        if has_binary_extension(path) {
            continue;
        }

        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::warn!(path = %rel_str, error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if size > config.max_file_bytes {
            tracing::debug!(path = %rel_str, size, "skipping oversized file");
            continue;
        }

        files.push(ScannedFile {
            path: path.to_path_buf(),
            relative: rel_str,
            size,
        });
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

/// Every `SKILL.md` under `dir`, sorted. A missing directory yields nothing.
pub fn find_skill_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        tracing::debug!(dir = %dir.display(), "skills directory not found");
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() && entry.file_name() == SKILL_FILE_NAME {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

/// Session logs (`*.jsonl`) directly inside `dir`, sorted by name.
pub fn list_session_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        bail!("Sessions directory not found: {}", dir.display());
    }

    let mut logs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "jsonl") {
            logs.push(path);
        }
    }
    logs.sort();
    Ok(logs)
}

/// Name of the skill a `SKILL.md` belongs to: its parent directory's name.
pub fn skill_name(skill_file: &Path) -> String {
    skill_file
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
