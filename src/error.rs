//! Bundling pass errors
//!
//! Only the failures listed here escape a bundling pass. Missing virtual
//! files, unrecognized imports and broken style blocks are recovered inside
//! the component that hit them.

use thiserror::Error;

use crate::transform::CompileError;

/// Result alias used by plugins and the bundler
pub type Result<T, E = BundleError> = std::result::Result<T, E>;

/// A failure that aborts the current bundling pass
#[derive(Debug, Error)]
pub enum BundleError {
    /// Package metadata could not be fetched or parsed
    #[error("Failed to resolve package {specifier}: {cause}")]
    Resolve { specifier: String, cause: String },

    /// Remote module answered with a non-success status
    #[error("Failed to fetch {url}: {status} {status_text}")]
    HttpStatus {
        url: String,
        status: u16,
        status_text: String,
    },

    /// Remote module could not be fetched at all
    #[error("Failed to load module {url}: {cause}")]
    Fetch { url: String, cause: String },

    /// No plugin claimed an import
    #[error("Could not resolve '{specifier}' from '{importer}'")]
    Unresolved { specifier: String, importer: String },

    /// No plugin produced content for a resolved id
    #[error("Could not load '{0}'")]
    Unloaded(String),

    /// Component, script or data compilation failed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A failure raised while processing a module, annotated with that module
    #[error("{source}")]
    InModule {
        id: String,
        source: Box<BundleError>,
    },
}

impl BundleError {
    /// Annotate this error with the module being processed when it occurred
    pub fn in_module(self, id: &str) -> Self {
        BundleError::InModule {
            id: id.to_string(),
            source: Box::new(self),
        }
    }

    /// The underlying failure, without module annotations
    pub fn root(&self) -> &BundleError {
        match self {
            BundleError::InModule { source, .. } => source.root(),
            other => other,
        }
    }

    /// Module chain from the failing module out to the entry
    pub fn module_trail(&self) -> Vec<&str> {
        let mut trail = Vec::new();
        let mut current = self;
        while let BundleError::InModule { id, source } = current {
            trail.push(id.as_str());
            current = source;
        }
        trail.reverse();
        trail
    }

    /// Short label of the failure category
    pub fn kind(&self) -> &'static str {
        match self.root() {
            BundleError::Resolve { .. } | BundleError::Unresolved { .. } => "ResolveError",
            BundleError::HttpStatus { .. } | BundleError::Fetch { .. } | BundleError::Unloaded(_) => {
                "LoadError"
            }
            BundleError::Compile(_) => "CompileError",
            BundleError::InModule { .. } => unreachable!("root() never returns a wrapper"),
        }
    }
}
