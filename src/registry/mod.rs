//! Component registry
//!
//! The in-memory snapshot of the component library that backs every
//! `virtual:file/` import. Produced by a file scan, consumed read-only by
//! bundling passes.

mod scan;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub use scan::{scan_library, SCANNED_EXTENSIONS};

/// Extension of single-file components
pub const COMPONENT_EXTENSION: &str = ".svelte";

/// Extension of vector images inlined as data URIs
pub const VECTOR_EXTENSION: &str = ".svg";

/// One file known to the virtual file system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// File name without extension
    pub name: String,

    /// Path relative to the library root, unique within the registry
    pub full_path: String,

    /// File content
    pub source: String,

    /// File extension including the dot (e.g. `.svelte`)
    pub extension: String,

    /// Whether this is a single-file component
    pub is_component: bool,

    /// Whether this is an inlined binary-ish asset
    pub is_binary: bool,

    /// Parent directory relative to the library root
    pub directory: String,
}

impl FileEntry {
    /// Build an entry from a relative path and its content, deriving the
    /// remaining fields
    pub fn new(full_path: &str, source: impl Into<String>) -> Self {
        let full_path = full_path.trim_start_matches("./").to_string();
        let file_name = full_path.rsplit('/').next().unwrap_or(&full_path);
        let (name, extension) = match file_name.rfind('.') {
            Some(idx) if idx > 0 => (&file_name[..idx], &file_name[idx..]),
            _ => (file_name, ""),
        };
        let directory = match full_path.rfind('/') {
            Some(idx) => full_path[..idx].to_string(),
            None => ".".to_string(),
        };

        Self {
            name: name.to_string(),
            source: source.into(),
            extension: extension.to_string(),
            is_component: extension == COMPONENT_EXTENSION,
            is_binary: extension == VECTOR_EXTENSION,
            directory,
            full_path,
        }
    }
}

/// Mapping from `fullPath` to its [`FileEntry`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRegistry {
    /// Path-based lookup table for every registered file
    #[serde(default)]
    pub files_by_path: BTreeMap<String, Arc<FileEntry>>,
}

impl ComponentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of entries
    pub fn from_entries(entries: impl IntoIterator<Item = FileEntry>) -> Self {
        let mut registry = Self::new();
        for entry in entries {
            registry.insert(entry);
        }
        registry
    }

    /// Load a registry from its JSON data contract
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse registry: {}", path.display()))
    }

    /// Write the registry to its JSON data contract
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write registry: {}", path.display()))
    }

    /// Insert or replace an entry, keyed by its `full_path`
    pub fn insert(&mut self, entry: FileEntry) {
        self.files_by_path.insert(entry.full_path.clone(), Arc::new(entry));
    }

    /// Exact path lookup
    pub fn get(&self, path: &str) -> Option<&Arc<FileEntry>> {
        self.files_by_path.get(path)
    }

    /// Lookup that retries by stripping leading path segments, outermost
    /// first, until a match is found
    pub fn find(&self, path: &str) -> Option<&Arc<FileEntry>> {
        if let Some(entry) = self.get(path) {
            return Some(entry);
        }

        let mut rest = path;
        while let Some(idx) = rest.find('/') {
            rest = &rest[idx + 1..];
            if let Some(entry) = self.get(rest) {
                return Some(entry);
            }
        }

        None
    }

    /// All component entries in path order
    pub fn components(&self) -> impl Iterator<Item = &Arc<FileEntry>> {
        self.files_by_path.values().filter(|entry| entry.is_component)
    }

    /// Shallow copy with extra entries layered on top
    pub fn overlay(&self, entries: impl IntoIterator<Item = FileEntry>) -> Self {
        let mut copy = self.clone();
        for entry in entries {
            copy.insert(entry);
        }
        copy
    }

    /// Total number of files
    pub fn len(&self) -> usize {
        self.files_by_path.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.files_by_path.is_empty()
    }
}
