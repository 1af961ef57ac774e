//! Empty-module stubs for stylesheet imports

use async_trait::async_trait;

use super::{LoadResult, Plugin, PluginContext, ResolveResult};
use crate::error::Result;
use crate::resolver::is_stylesheet;

/// Id prefix of stubbed stylesheet imports
pub const EMPTY_STYLE_PREFIX: &str = "\0empty-style:";

/// Turns every stylesheet import into an empty module
///
/// Page styles never come from arbitrary imports; component styles reach the
/// result through the component compiler instead.
pub struct StyleStubPlugin;

#[async_trait]
impl Plugin for StyleStubPlugin {
    fn name(&self) -> &str {
        "empty-style"
    }

    async fn resolve_id(&self, specifier: &str, _importer: Option<&str>, _ctx: &PluginContext) -> Result<ResolveResult> {
        if is_stylesheet(specifier) {
            return Ok(ResolveResult::Resolved(format!("{}{}", EMPTY_STYLE_PREFIX, specifier)));
        }
        Ok(ResolveResult::Skip)
    }

    async fn load(&self, id: &str, _ctx: &PluginContext) -> Result<LoadResult> {
        if id.starts_with(EMPTY_STYLE_PREFIX) {
            return Ok(LoadResult::Loaded("export default {}; // Empty style module".to_string()));
        }
        Ok(LoadResult::Skip)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::registry::ComponentRegistry;

    fn ctx() -> PluginContext {
        PluginContext {
            registry: Arc::new(ComponentRegistry::new()),
        }
    }

    #[tokio::test]
    async fn test_stubs_stylesheets() {
        let ctx = ctx();
        let resolved = StyleStubPlugin.resolve_id("./theme.scss", Some("virtual:file/a.js"), &ctx).await.unwrap();
        assert_eq!(resolved, ResolveResult::Resolved("\0empty-style:./theme.scss".to_string()));

        let loaded = StyleStubPlugin.load("\0empty-style:./theme.scss", &ctx).await.unwrap();
        assert_eq!(loaded, LoadResult::Loaded("export default {}; // Empty style module".to_string()));
    }

    #[tokio::test]
    async fn test_ignores_scripts() {
        let ctx = ctx();
        assert_eq!(StyleStubPlugin.resolve_id("./a.js", None, &ctx).await.unwrap(), ResolveResult::Skip);
        assert_eq!(StyleStubPlugin.load("virtual:file/a.css.js", &ctx).await.unwrap(), LoadResult::Skip);
    }
}
