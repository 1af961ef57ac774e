//! Fallback plugin that stubs imports no other plugin claimed

use async_trait::async_trait;
use tracing::debug;

use super::{LoadResult, Plugin, PluginContext, ResolveResult};
use crate::error::Result;
use crate::resolver::{is_relative, VIRTUAL_PREFIX};

/// Id prefix of stubbed imports
pub const EMPTY_MODULE_PREFIX: &str = "\0empty:";

/// Lowest-priority resolver: anything nobody else claimed becomes an empty
/// module
pub struct CatchAllPlugin;

#[async_trait]
impl Plugin for CatchAllPlugin {
    fn name(&self) -> &str {
        "catch-all"
    }

    async fn resolve_id(&self, specifier: &str, _importer: Option<&str>, _ctx: &PluginContext) -> Result<ResolveResult> {
        if specifier.starts_with("https://") || specifier.starts_with("virtual:") || is_relative(specifier) {
            return Ok(ResolveResult::Skip);
        }
        debug!("Stubbing unrecognized import '{}'", specifier);
        Ok(ResolveResult::Resolved(format!("{}{}", EMPTY_MODULE_PREFIX, specifier)))
    }

    async fn load(&self, id: &str, _ctx: &PluginContext) -> Result<LoadResult> {
        if id.starts_with(EMPTY_MODULE_PREFIX) {
            return Ok(LoadResult::Loaded("export default {}; // Empty module".to_string()));
        }
        Ok(LoadResult::Skip)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::registry::ComponentRegistry;

    #[tokio::test]
    async fn test_claims_bare_identifiers() {
        let ctx = PluginContext {
            registry: Arc::new(ComponentRegistry::new()),
        };

        let resolved = CatchAllPlugin.resolve_id("totally-unrecognized-thing", None, &ctx).await.unwrap();
        assert_eq!(resolved, ResolveResult::Resolved("\0empty:totally-unrecognized-thing".to_string()));

        let loaded = CatchAllPlugin.load("\0empty:totally-unrecognized-thing", &ctx).await.unwrap();
        assert_eq!(loaded, LoadResult::Loaded("export default {}; // Empty module".to_string()));
    }

    #[tokio::test]
    async fn test_leaves_routable_specifiers() {
        let ctx = PluginContext {
            registry: Arc::new(ComponentRegistry::new()),
        };

        for specifier in ["https://unpkg.com/a", &format!("{}a.js", VIRTUAL_PREFIX), "./a", "../a"] {
            assert_eq!(
                CatchAllPlugin.resolve_id(specifier, None, &ctx).await.unwrap(),
                ResolveResult::Skip,
                "{}",
                specifier
            );
        }
    }
}
