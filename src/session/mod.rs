//! Long-lived bundling session
//!
//! A session is the state of one playground worker: the registry snapshot,
//! the remote caches, the per-pass stylesheet accumulator and the
//! collaborators every bundling pass uses. Caches live as long as the
//! session and are never evicted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::config::Config;
use crate::fetch::{FetchError, Fetcher, HttpFetcher};
use crate::registry::ComponentRegistry;
use crate::transform::{ComponentCompiler, LightningStyleCompiler, MarkupCompiler, Preprocessor, StyleCompiler};

/// State shared by every bundling pass of one worker
pub struct Session {
    config: Config,

    registry: RwLock<Arc<ComponentRegistry>>,
    registry_stale: AtomicBool,

    /// Resolved remote URL -> fetched text
    content_cache: DashMap<String, String>,

    /// `name@version` -> entry-point path inside the package
    entry_cache: DashMap<String, String>,

    /// Requested remote URL -> final URL after redirects
    redirect_cache: DashMap<String, String>,

    /// Stylesheet fragments of the current pass
    styles: Mutex<String>,

    fetcher: Arc<dyn Fetcher>,
    preprocessor: Preprocessor,
    component_compiler: Arc<dyn ComponentCompiler>,
}

impl Session {
    /// Create a session with explicit collaborators
    pub fn new(
        config: Config,
        registry: ComponentRegistry,
        fetcher: Arc<dyn Fetcher>,
        style_compiler: Arc<dyn StyleCompiler>,
        component_compiler: Arc<dyn ComponentCompiler>,
    ) -> Self {
        let preprocessor = Preprocessor::new(style_compiler, config.styles.languages.clone());

        Self {
            config,
            registry: RwLock::new(Arc::new(registry)),
            registry_stale: AtomicBool::new(false),
            content_cache: DashMap::new(),
            entry_cache: DashMap::new(),
            redirect_cache: DashMap::new(),
            styles: Mutex::new(String::new()),
            fetcher,
            preprocessor,
            component_compiler,
        }
    }

    /// Create a session using the HTTP fetcher and the built-in compilers
    pub fn with_defaults(config: Config, registry: ComponentRegistry) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(Duration::from_secs(config.remote.timeout_secs))?;
        let style_compiler: Arc<dyn StyleCompiler> = Arc::new(LightningStyleCompiler::new());
        let component_compiler = Arc::new(MarkupCompiler::new(style_compiler.clone()));

        Ok(Self::new(
            config,
            registry,
            Arc::new(fetcher),
            style_compiler,
            component_compiler,
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn component_compiler(&self) -> &dyn ComponentCompiler {
        self.component_compiler.as_ref()
    }

    /// Current registry snapshot
    pub fn registry(&self) -> Arc<ComponentRegistry> {
        self.registry.read().clone()
    }

    /// Replace the registry snapshot wholesale
    pub fn replace_registry(&self, registry: ComponentRegistry) {
        debug!("Registry replaced ({} files)", registry.len());
        *self.registry.write() = Arc::new(registry);
    }

    /// The host asked for a registry refresh
    pub fn mark_registry_stale(&self) {
        self.registry_stale.store(true, Ordering::SeqCst);
    }

    /// The host delivered (or confirmed) an updated registry
    pub fn registry_updated(&self, registry: Option<ComponentRegistry>) {
        if let Some(registry) = registry {
            self.replace_registry(registry);
        }
        self.registry_stale.store(false, Ordering::SeqCst);
    }

    /// A pass completed against the current registry
    pub fn mark_registry_refreshed(&self) {
        self.registry_stale.store(false, Ordering::SeqCst);
    }

    pub fn is_registry_stale(&self) -> bool {
        self.registry_stale.load(Ordering::SeqCst)
    }

    /// Clear the stylesheet accumulator at the start of a pass
    pub fn reset_styles(&self) {
        self.styles.lock().clear();
    }

    /// Append a compiled stylesheet fragment
    pub fn append_styles(&self, css: &str) {
        self.styles.lock().push_str(css);
    }

    /// Stylesheet accumulated during the current pass
    pub fn styles(&self) -> String {
        self.styles.lock().clone()
    }

    pub fn cached_content(&self, url: &str) -> Option<String> {
        self.content_cache.get(url).map(|entry| entry.value().clone())
    }

    pub fn cache_content(&self, url: &str, content: &str) {
        self.content_cache.insert(url.to_string(), content.to_string());
    }

    pub fn cached_entry(&self, package: &str) -> Option<String> {
        self.entry_cache.get(package).map(|entry| entry.value().clone())
    }

    pub fn cache_entry(&self, package: &str, entry: &str) {
        self.entry_cache.insert(package.to_string(), entry.to_string());
    }

    /// Final URL a request for `url` settled at, if it was redirected
    pub fn redirect_for(&self, url: &str) -> Option<String> {
        self.redirect_cache.get(url).map(|entry| entry.value().clone())
    }

    pub fn record_redirect(&self, url: &str, final_url: &str) {
        debug!("Redirect {} -> {}", url, final_url);
        self.redirect_cache.insert(url.to_string(), final_url.to_string());
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Session builders for tests

    use super::*;
    use crate::fetch::testing::MockFetcher;
    use crate::registry::FileEntry;

    /// A session on the default config backed by `fetcher` and `files`
    pub fn session(fetcher: MockFetcher, files: &[(&str, &str)]) -> (Arc<Session>, Arc<MockFetcher>) {
        let fetcher = Arc::new(fetcher);
        let registry = ComponentRegistry::from_entries(
            files.iter().map(|(path, source)| FileEntry::new(path, *source)),
        );
        let style_compiler: Arc<dyn StyleCompiler> = Arc::new(LightningStyleCompiler::new());
        let session = Session::new(
            Config::default_config(),
            registry,
            fetcher.clone(),
            style_compiler.clone(),
            Arc::new(MarkupCompiler::new(style_compiler)),
        );
        (Arc::new(session), fetcher)
    }
}
