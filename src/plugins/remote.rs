//! Remote package plugin
//!
//! Resolves bare package imports to CDN URLs, resolves relative imports made
//! by remote modules against their post-redirect URL, and loads remote
//! content through the session caches.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{LoadResult, Plugin, PluginContext, ResolveResult};
use crate::error::{BundleError, Result};
use crate::resolver::{is_relative, is_remote_url, PackageSpecifier};
use crate::session::Session;

/// Fields of `package.json` that select the entry point
#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    browser: Option<serde_json::Value>,
    #[serde(default)]
    module: Option<serde_json::Value>,
    #[serde(default)]
    main: Option<serde_json::Value>,
}

impl PackageManifest {
    /// `browser`, then `module`, then `main`, then `index.js`
    ///
    /// Object-form `browser` maps are ignored.
    fn entry_point(&self) -> String {
        [&self.browser, &self.module, &self.main]
            .into_iter()
            .filter_map(|field| field.as_ref().and_then(|value| value.as_str()))
            .find(|entry| !entry.is_empty())
            .unwrap_or("index.js")
            .trim_start_matches("./")
            .to_string()
    }
}

/// Resolver and loader for packages served by the CDN
pub struct RemotePlugin {
    session: Arc<Session>,
}

impl RemotePlugin {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Resolve `specifier` against the final URL of `importer`
    fn resolve_from_remote(&self, specifier: &str, importer: &str) -> Result<String> {
        let base = self.session.redirect_for(importer).unwrap_or_else(|| importer.to_string());
        let resolved = Url::parse(&base)
            .and_then(|base| base.join(specifier))
            .map_err(|e| BundleError::Resolve {
                specifier: specifier.to_string(),
                cause: e.to_string(),
            })?;
        Ok(resolved.to_string())
    }

    /// Entry point of a package, `None` when the CDN does not know it
    async fn entry_point(&self, package: &PackageSpecifier, specifier: &str) -> Result<Option<String>> {
        let key = package.cache_key();
        if let Some(entry) = self.session.cached_entry(&key) {
            return Ok(Some(entry));
        }

        let resolve_error = |cause: String| BundleError::Resolve {
            specifier: specifier.to_string(),
            cause,
        };

        let url = format!("{}/package.json", package.base_url(self.session.config().cdn_base()));
        let response = self
            .session
            .fetcher()
            .fetch(&url)
            .await
            .map_err(|e| resolve_error(e.to_string()))?;

        if response.status == 404 {
            debug!("No package '{}' on the CDN", key);
            return Ok(None);
        }
        if !response.is_success() {
            return Err(resolve_error(format!(
                "{} returned {} {}",
                url, response.status, response.status_text
            )));
        }

        let manifest: PackageManifest =
            serde_json::from_str(&response.body).map_err(|e| resolve_error(format!("invalid package.json: {}", e)))?;
        let entry = manifest.entry_point();

        debug!("Entry point of {} is {}", key, entry);
        self.session.cache_entry(&key, &entry);

        Ok(Some(entry))
    }
}

#[async_trait]
impl Plugin for RemotePlugin {
    fn name(&self) -> &str {
        "remote"
    }

    async fn resolve_id(&self, specifier: &str, importer: Option<&str>, _ctx: &PluginContext) -> Result<ResolveResult> {
        if is_remote_url(specifier) {
            return Ok(ResolveResult::Resolved(specifier.to_string()));
        }

        if specifier.starts_with("virtual:") || specifier.starts_with('\0') {
            return Ok(ResolveResult::Skip);
        }

        let is_path = is_relative(specifier) || specifier.starts_with('/');
        if is_path {
            return Ok(match importer.filter(|importer| is_remote_url(importer)) {
                Some(importer) => ResolveResult::Resolved(self.resolve_from_remote(specifier, importer)?),
                None => ResolveResult::Skip,
            });
        }

        let Some(package) = PackageSpecifier::parse(specifier) else {
            return Ok(ResolveResult::Skip);
        };
        let base = package.base_url(self.session.config().cdn_base());

        if let Some(subpath) = &package.subpath {
            return Ok(ResolveResult::Resolved(format!("{}/{}", base, subpath)));
        }

        Ok(match self.entry_point(&package, specifier).await? {
            Some(entry) => ResolveResult::Resolved(format!("{}/{}", base, entry)),
            None => ResolveResult::Skip,
        })
    }

    async fn load(&self, id: &str, _ctx: &PluginContext) -> Result<LoadResult> {
        if !is_remote_url(id) {
            return Ok(LoadResult::Skip);
        }

        if let Some(content) = self.session.cached_content(id) {
            return Ok(LoadResult::Loaded(content));
        }

        let response = self.session.fetcher().fetch(id).await.map_err(|e| BundleError::Fetch {
            url: id.to_string(),
            cause: e.to_string(),
        })?;

        if response.url != id {
            self.session.record_redirect(id, &response.url);
        }

        if !response.is_success() {
            return Err(BundleError::HttpStatus {
                url: id.to_string(),
                status: response.status,
                status_text: response.status_text,
            });
        }

        self.session.cache_content(id, &response.body);
        Ok(LoadResult::Loaded(response.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::MockFetcher;
    use crate::registry::ComponentRegistry;
    use crate::session::testing::session;

    fn ctx() -> PluginContext {
        PluginContext {
            registry: Arc::new(ComponentRegistry::new()),
        }
    }

    fn resolved(id: &str) -> ResolveResult {
        ResolveResult::Resolved(id.to_string())
    }

    #[test]
    fn test_manifest_entry_point_order() {
        let manifest: PackageManifest =
            serde_json::from_str(r#"{"browser": "./dist/browser.js", "module": "esm.js", "main": "cjs.js"}"#).unwrap();
        assert_eq!(manifest.entry_point(), "dist/browser.js");

        let manifest: PackageManifest =
            serde_json::from_str(r#"{"browser": {"./x.js": false}, "module": "esm.js", "main": "cjs.js"}"#).unwrap();
        assert_eq!(manifest.entry_point(), "esm.js");

        let manifest: PackageManifest = serde_json::from_str(r#"{"main": "lib/index.js"}"#).unwrap();
        assert_eq!(manifest.entry_point(), "lib/index.js");

        assert_eq!(PackageManifest::default().entry_point(), "index.js");
    }

    #[tokio::test]
    async fn test_entry_point_is_fetched_once() {
        let fetcher = MockFetcher::new().route("https://unpkg.com/left-pad@latest/package.json", r#"{"main": "index.js"}"#);
        let (session, fetcher) = session(fetcher, &[]);
        let plugin = RemotePlugin::new(session);
        let ctx = ctx();

        for _ in 0..2 {
            assert_eq!(
                plugin.resolve_id("left-pad", Some("virtual:file/__entry__.js"), &ctx).await.unwrap(),
                resolved("https://unpkg.com/left-pad@latest/index.js")
            );
        }
        assert_eq!(
            plugin.resolve_id("left-pad/index.js", None, &ctx).await.unwrap(),
            resolved("https://unpkg.com/left-pad@latest/index.js")
        );
        assert_eq!(fetcher.count("https://unpkg.com/left-pad@latest/package.json"), 1);
        assert_eq!(fetcher.total(), 1);
    }

    #[tokio::test]
    async fn test_versioned_and_scoped_subpaths() {
        let (session, fetcher) = session(MockFetcher::new(), &[]);
        let plugin = RemotePlugin::new(session);
        let ctx = ctx();

        assert_eq!(
            plugin.resolve_id("lodash-es@4.17.21/debounce.js", None, &ctx).await.unwrap(),
            resolved("https://unpkg.com/lodash-es@4.17.21/debounce.js")
        );
        assert_eq!(
            plugin.resolve_id("@floating-ui/dom@1.6.0/dist/index.mjs", None, &ctx).await.unwrap(),
            resolved("https://unpkg.com/@floating-ui/dom@1.6.0/dist/index.mjs")
        );
        assert_eq!(fetcher.total(), 0);
    }

    #[tokio::test]
    async fn test_unknown_package_is_declined() {
        let (session, _) = session(MockFetcher::new(), &[]);
        let plugin = RemotePlugin::new(session);

        let result = plugin.resolve_id("totally-unrecognized-thing", None, &ctx()).await.unwrap();
        assert_eq!(result, ResolveResult::Skip);
    }

    #[tokio::test]
    async fn test_metadata_failure_names_package() {
        let fetcher = MockFetcher::new()
            .route_status("https://unpkg.com/flaky@latest/package.json", 503, "Service Unavailable")
            .route("https://unpkg.com/broken@latest/package.json", "<html>not json</html>");
        let (session, _) = session(fetcher, &[]);
        let plugin = RemotePlugin::new(session);

        let err = plugin.resolve_id("flaky", None, &ctx()).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to resolve package flaky: "));
        assert!(err.to_string().contains("503 Service Unavailable"));

        let err = plugin.resolve_id("broken", None, &ctx()).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to resolve package broken: invalid package.json"));
    }

    #[tokio::test]
    async fn test_relative_imports_follow_redirects() {
        let fetcher = MockFetcher::new().route_redirect(
            "https://unpkg.com/pkg@latest/index.js",
            "https://unpkg.com/pkg@2.0.0/dist/index.js",
            "export * from './util.js';",
        );
        let (session, _) = session(fetcher, &[]);
        let plugin = RemotePlugin::new(session.clone());
        let ctx = ctx();
        let importer = "https://unpkg.com/pkg@latest/index.js";

        assert_eq!(
            plugin.resolve_id("./util.js", Some(importer), &ctx).await.unwrap(),
            resolved("https://unpkg.com/pkg@latest/util.js")
        );

        plugin.load(importer, &ctx).await.unwrap();
        assert_eq!(
            session.redirect_for(importer).as_deref(),
            Some("https://unpkg.com/pkg@2.0.0/dist/index.js")
        );
        assert_eq!(
            plugin.resolve_id("./util.js", Some(importer), &ctx).await.unwrap(),
            resolved("https://unpkg.com/pkg@2.0.0/dist/util.js")
        );
        assert_eq!(
            plugin.resolve_id("../package.json", Some(importer), &ctx).await.unwrap(),
            resolved("https://unpkg.com/pkg@2.0.0/package.json")
        );
        assert_eq!(
            plugin.resolve_id("/other@1/x.js", Some(importer), &ctx).await.unwrap(),
            resolved("https://unpkg.com/other@1/x.js")
        );
    }

    #[tokio::test]
    async fn test_relative_imports_from_local_modules_are_declined() {
        let (session, _) = session(MockFetcher::new(), &[]);
        let plugin = RemotePlugin::new(session);

        let result = plugin.resolve_id("./x.js", Some("virtual:file/a.js"), &ctx()).await.unwrap();
        assert_eq!(result, ResolveResult::Skip);
    }

    #[tokio::test]
    async fn test_load_caches_content() {
        let fetcher = MockFetcher::new().route("https://unpkg.com/a@1/a.js", "export default 1;");
        let (session, fetcher) = session(fetcher, &[]);
        let plugin = RemotePlugin::new(session);
        let ctx = ctx();

        for _ in 0..3 {
            assert_eq!(
                plugin.load("https://unpkg.com/a@1/a.js", &ctx).await.unwrap(),
                LoadResult::Loaded("export default 1;".to_string())
            );
        }
        assert_eq!(fetcher.count("https://unpkg.com/a@1/a.js"), 1);
    }

    #[tokio::test]
    async fn test_load_failure_reports_status() {
        let (session, _) = session(MockFetcher::new(), &[]);
        let plugin = RemotePlugin::new(session);

        let err = plugin.load("https://unpkg.com/a@1/missing.js", &ctx()).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch https://unpkg.com/a@1/missing.js: 404 Not Found");
    }

    #[tokio::test]
    async fn test_local_ids_are_not_loaded() {
        let (session, fetcher) = session(MockFetcher::new(), &[]);
        let plugin = RemotePlugin::new(session);
        let ctx = ctx();

        assert_eq!(plugin.load("virtual:file/__entry__.js", &ctx).await.unwrap(), LoadResult::Skip);
        assert_eq!(plugin.load("\0empty:x", &ctx).await.unwrap(), LoadResult::Skip);
        assert_eq!(fetcher.total(), 0);
    }
}
