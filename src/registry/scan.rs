//! Library scanning
//!
//! Walks the component library and builds the registry data contract.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use super::{ComponentRegistry, FileEntry};
use crate::utils::relative_path;

/// File extensions picked up by a scan
pub const SCANNED_EXTENSIONS: &[&str] = &[".svelte", ".js", ".ts", ".json", ".css", ".scss", ".svg"];

/// Scan `root` recursively into a registry
///
/// Hidden directories and `node_modules` are skipped, as is anything
/// matching one of the `ignore` globs (matched against the relative path).
pub fn scan_library(root: &Path, ignore: &[String]) -> Result<ComponentRegistry> {
    let ignore_set = build_ignore_set(ignore)?;
    let mut registry = ComponentRegistry::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_skipped_dir(entry));

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to scan {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy();
        if !SCANNED_EXTENSIONS.iter().any(|ext| file_name.ends_with(ext)) {
            continue;
        }

        let Some(relative) = relative_path(root, path) else {
            continue;
        };
        if ignore_set.is_match(&relative) {
            debug!("Ignoring {}", relative);
            continue;
        }

        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        registry.insert(FileEntry::new(&relative, source));
    }

    info!("Component registry built with {} total files", registry.len());

    Ok(registry)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == "node_modules"
}

fn build_ignore_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).with_context(|| format!("Invalid ignore pattern: {}", pattern))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
