//! Virtual file system plugin
//!
//! Serves every local import from the registry snapshot under the
//! `virtual:file/` prefix. Missing files get typed placeholders, vector
//! images become data URIs and JSON becomes a default export.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::{debug, warn};

use super::{LoadResult, Plugin, PluginContext, ResolveResult, TransformResult};
use crate::config::LibraryConfig;
use crate::error::Result;
use crate::registry::{ComponentRegistry, COMPONENT_EXTENSION, VECTOR_EXTENSION};
use crate::resolver::{
    is_identifier, is_relative, is_remote_url, is_stylesheet, resolve_virtual_path, to_virtual_id, virtual_path,
    VIRTUAL_PREFIX,
};
use crate::transform::CompileError;

/// Characters `encodeURIComponent` leaves alone
const URI_COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const SVG_PLACEHOLDER: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"></svg>"#;

/// Resolver and loader for the in-memory component library
pub struct VirtualFilePlugin {
    facade: String,
    index: String,
}

impl VirtualFilePlugin {
    pub fn new(library: &LibraryConfig) -> Self {
        Self {
            facade: library.facade.clone(),
            index: library.index.clone(),
        }
    }
}

#[async_trait]
impl Plugin for VirtualFilePlugin {
    fn name(&self) -> &str {
        "virtual-file"
    }

    async fn resolve_id(&self, specifier: &str, importer: Option<&str>, _ctx: &PluginContext) -> Result<ResolveResult> {
        if specifier.starts_with(VIRTUAL_PREFIX) {
            return Ok(ResolveResult::Resolved(specifier.to_string()));
        }

        if is_stylesheet(specifier) {
            return Ok(ResolveResult::Skip);
        }

        if specifier == self.facade {
            return Ok(ResolveResult::Resolved(to_virtual_id(&self.index)));
        }

        // Imports made by remote modules belong to the remote resolver
        if importer.is_some_and(is_remote_url) {
            return Ok(ResolveResult::Skip);
        }

        if is_relative(specifier) {
            let Some(importer_path) = importer.and_then(virtual_path) else {
                return Ok(ResolveResult::Skip);
            };
            return Ok(match resolve_virtual_path(importer_path, specifier) {
                Some(path) => ResolveResult::Resolved(to_virtual_id(&path)),
                None => {
                    debug!("'{}' from {} climbs above the registry root", specifier, importer_path);
                    ResolveResult::Skip
                }
            });
        }

        if is_local_file(specifier) {
            let path = specifier.trim_start_matches("./");
            return Ok(ResolveResult::Resolved(to_virtual_id(path)));
        }

        Ok(ResolveResult::Skip)
    }

    async fn load(&self, id: &str, ctx: &PluginContext) -> Result<LoadResult> {
        let Some(path) = virtual_path(id) else {
            return Ok(LoadResult::Skip);
        };

        if let Some(entry) = ctx.registry.find(path) {
            if entry.full_path != path {
                debug!("Matched {} as {}", path, entry.full_path);
            }
            return Ok(LoadResult::Loaded(entry.source.clone()));
        }

        if path == self.index {
            debug!("Generating library index for {}", path);
            return Ok(LoadResult::Loaded(library_index(&ctx.registry)));
        }

        warn!("File not found in registry: {}", path);
        Ok(LoadResult::Loaded(placeholder(path)))
    }

    async fn transform(&self, code: &str, id: &str, ctx: &PluginContext) -> Result<TransformResult> {
        let Some(path) = virtual_path(id) else {
            return Ok(TransformResult::Skip);
        };

        let is_vector = id.ends_with(VECTOR_EXTENSION)
            || ctx
                .registry
                .get(path)
                .is_some_and(|entry| entry.extension == VECTOR_EXTENSION);
        if is_vector {
            return Ok(TransformResult::Transformed(format!(
                "export default \"{}\";",
                svg_data_uri(code)
            )));
        }

        if id.ends_with(".json") {
            serde_json::from_str::<serde_json::Value>(code)
                .map_err(|e| CompileError::new(format!("Invalid JSON in {}: {}", path, e)))?;
            return Ok(TransformResult::Transformed(format!("export default {};", code.trim())));
        }

        Ok(TransformResult::Skip)
    }
}

/// Bare specifier that names a file rather than a package
///
/// A dotted specifier whose first segment carries a version or scope
/// (`pkg@1.0.0/x.js`, `@scope/pkg`) is left to the remote resolver.
fn is_local_file(specifier: &str) -> bool {
    if specifier.starts_with("virtual:") || specifier.starts_with("http") || specifier.starts_with('/') {
        return false;
    }
    if specifier.starts_with('\0') || !specifier.contains('.') {
        return false;
    }
    let first_segment = specifier.split('/').next().unwrap_or(specifier);
    !first_segment.contains('@')
}

/// Content served for a path missing from the registry
fn placeholder(path: &str) -> String {
    if path.ends_with(COMPONENT_EXTENSION) {
        format!("<div>Component not found: {}</div>", path)
    } else if path.ends_with(VECTOR_EXTENSION) {
        SVG_PLACEHOLDER.to_string()
    } else {
        format!("/* File not found: {} */", path)
    }
}

/// Percent-encoded `data:` URI safe inside either quote style
fn svg_data_uri(svg: &str) -> String {
    let encoded = utf8_percent_encode(svg, URI_COMPONENT_SET)
        .to_string()
        .replace('\'', "%27")
        .replace('"', "%22");
    format!("data:image/svg+xml;charset=utf-8,{}", encoded)
}

/// Aggregation module re-exporting every component by name
fn library_index(registry: &ComponentRegistry) -> String {
    let mut names: Vec<&str> = Vec::new();
    let mut index = String::new();

    for entry in registry.components() {
        if entry.name.starts_with("__") || !is_identifier(&entry.name) || names.contains(&entry.name.as_str()) {
            continue;
        }
        names.push(&entry.name);
        index.push_str(&format!(
            "export {{ default as {} }} from '{}';\n",
            entry.name,
            to_virtual_id(&entry.full_path)
        ));
    }

    index
}
