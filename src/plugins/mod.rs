//! Plugin system for the playground bundler
//!
//! Rollup-style resolve/load/transform hooks. Plugins are tried in
//! registration order; the first one that answers a resolve or load wins,
//! and transforms chain through every plugin.

mod catch_all;
mod component;
mod remote;
mod style_stub;
mod virtual_file;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::registry::ComponentRegistry;

pub use catch_all::{CatchAllPlugin, EMPTY_MODULE_PREFIX};
pub use component::ComponentPlugin;
pub use remote::RemotePlugin;
pub use style_stub::{StyleStubPlugin, EMPTY_STYLE_PREFIX};
pub use virtual_file::VirtualFilePlugin;

/// Plugin hook context
pub struct PluginContext {
    /// Registry snapshot of the current pass, including overlaid entries
    pub registry: Arc<ComponentRegistry>,
}

/// Result of a resolve hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveResult {
    /// Continue to next plugin
    Skip,
    /// Resolved module id
    Resolved(String),
}

/// Result of a load hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult {
    /// Continue to next plugin
    Skip,
    /// Loaded content
    Loaded(String),
}

/// Result of a transform hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformResult {
    /// Leave the code unchanged
    Skip,
    /// Transformed code
    Transformed(String),
}

/// Plugin trait - implement this to take part in a bundling pass
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Plugin name for logging and debugging
    fn name(&self) -> &str;

    /// Resolve an import specifier to a module id
    /// Return ResolveResult::Skip to let other plugins handle it
    async fn resolve_id(
        &self,
        _specifier: &str,
        _importer: Option<&str>,
        _ctx: &PluginContext,
    ) -> Result<ResolveResult> {
        Ok(ResolveResult::Skip)
    }

    /// Load the content of a module
    /// Return LoadResult::Skip to let other plugins handle it
    async fn load(&self, _id: &str, _ctx: &PluginContext) -> Result<LoadResult> {
        Ok(LoadResult::Skip)
    }

    /// Transform the code of a module
    /// Return TransformResult::Skip to leave code unchanged
    async fn transform(&self, _code: &str, _id: &str, _ctx: &PluginContext) -> Result<TransformResult> {
        Ok(TransformResult::Skip)
    }
}

/// Plugin manager
pub struct PluginManager {
    plugins: Vec<Arc<dyn Plugin>>,
    context: PluginContext,
}

impl PluginManager {
    /// Create a plugin manager for one pass over `registry`
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self {
            plugins: Vec::new(),
            context: PluginContext { registry },
        }
    }

    /// Register a plugin
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    /// Run resolve_id hooks
    pub async fn resolve_id(&self, specifier: &str, importer: Option<&str>) -> Result<Option<String>> {
        for plugin in &self.plugins {
            match plugin.resolve_id(specifier, importer, &self.context).await? {
                ResolveResult::Skip => continue,
                ResolveResult::Resolved(id) => {
                    debug!("[{}] resolved {} -> {}", plugin.name(), specifier, id);
                    return Ok(Some(id));
                }
            }
        }
        Ok(None)
    }

    /// Run load hooks
    pub async fn load(&self, id: &str) -> Result<Option<String>> {
        for plugin in &self.plugins {
            match plugin.load(id, &self.context).await? {
                LoadResult::Skip => continue,
                LoadResult::Loaded(content) => {
                    debug!("[{}] loaded {}", plugin.name(), id);
                    return Ok(Some(content));
                }
            }
        }
        Ok(None)
    }

    /// Run transform hooks
    pub async fn transform(&self, code: &str, id: &str) -> Result<String> {
        let mut current_code = code.to_string();

        for plugin in &self.plugins {
            match plugin.transform(&current_code, id, &self.context).await? {
                TransformResult::Skip => continue,
                TransformResult::Transformed(code) => {
                    debug!("[{}] transformed {}", plugin.name(), id);
                    current_code = code;
                }
            }
        }

        Ok(current_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        answer: Option<&'static str>,
    }

    #[async_trait]
    impl Plugin for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn resolve_id(&self, _specifier: &str, _importer: Option<&str>, _ctx: &PluginContext) -> Result<ResolveResult> {
            Ok(match self.answer {
                Some(id) => ResolveResult::Resolved(id.to_string()),
                None => ResolveResult::Skip,
            })
        }

        async fn transform(&self, code: &str, _id: &str, _ctx: &PluginContext) -> Result<TransformResult> {
            Ok(TransformResult::Transformed(format!("{}+{}", code, self.name)))
        }
    }

    fn manager(plugins: Vec<Fixed>) -> PluginManager {
        let mut manager = PluginManager::new(Arc::new(ComponentRegistry::new()));
        for plugin in plugins {
            manager.register(Arc::new(plugin));
        }
        manager
    }

    #[tokio::test]
    async fn test_first_answer_wins() {
        let manager = manager(vec![
            Fixed { name: "a", answer: None },
            Fixed { name: "b", answer: Some("from-b") },
            Fixed { name: "c", answer: Some("from-c") },
        ]);

        assert_eq!(manager.resolve_id("x", None).await.unwrap().as_deref(), Some("from-b"));
    }

    #[tokio::test]
    async fn test_no_answer() {
        let manager = manager(vec![Fixed { name: "a", answer: None }]);
        assert_eq!(manager.resolve_id("x", None).await.unwrap(), None);
        assert_eq!(manager.load("x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_transforms_chain() {
        let manager = manager(vec![
            Fixed { name: "a", answer: None },
            Fixed { name: "b", answer: None },
        ]);
        assert_eq!(manager.transform("code", "id").await.unwrap(), "code+a+b");
    }
}
