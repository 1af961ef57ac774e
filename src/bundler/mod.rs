//! Core bundler implementation
//!
//! One bundling pass: classify the input, synthesize the entry module,
//! build the module graph through the plugin chain and link it into a
//! single self-invoking bundle.

mod graph;
mod linker;
mod syntax;

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::{BundleError, Result};
use crate::plugins::{CatchAllPlugin, ComponentPlugin, PluginManager, RemotePlugin, StyleStubPlugin, VirtualFilePlugin};
use crate::registry::{ComponentRegistry, FileEntry};
use crate::session::Session;
use crate::transform::COMPONENT_FILE;
use crate::utils::{first_lines, format_duration, format_size};

pub use graph::{Module, ModuleGraph, ModuleId};
pub use linker::link;
pub use syntax::ModuleSyntax;

/// Registry path of the synthetic entry module
pub const ENTRY_FILE: &str = "__entry__.js";

/// Resolved id of the synthetic entry module
pub const ENTRY_ID: &str = "virtual:file/__entry__.js";

/// Number of stack lines kept in a formatted error
const STACK_LINES: usize = 5;

/// Outcome of one bundling pass
///
/// Either `code` and `styles` are set, or `error` is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilationResult {
    pub code: Option<String>,
    pub styles: Option<String>,
    pub error: Option<String>,
}

impl CompilationResult {
    pub fn success(code: String, styles: String) -> Self {
        Self {
            code: Some(code),
            styles: Some(styles),
            error: None,
        }
    }

    pub fn failure(error: String) -> Self {
        Self {
            code: None,
            styles: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// How the pasted source is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Single-file component, mounted by a generated entry
    Component,
    /// Plain script, used as the entry verbatim
    Script,
}

impl InputKind {
    pub fn classify(source: &str) -> Self {
        if source.trim_start().starts_with('<') {
            InputKind::Component
        } else {
            InputKind::Script
        }
    }
}

/// The playground bundler
pub struct Bundler {
    session: Arc<Session>,
}

impl Bundler {
    /// Create a bundler running passes against `session`
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Run a bundling pass and fold any failure into a formatted error
    pub async fn compile(&self, source: &str) -> CompilationResult {
        let start = Instant::now();

        match self.bundle(source).await {
            Ok(code) => {
                let styles = self.session.styles();
                info!(
                    "Bundled {} ({} styles) in {}",
                    format_size(code.len()),
                    format_size(styles.len()),
                    format_duration(start.elapsed())
                );
                self.session.mark_registry_refreshed();
                CompilationResult::success(code, styles)
            }
            Err(e) => {
                error!("Bundling failed: {}", e);
                CompilationResult::failure(format_error(&e))
            }
        }
    }

    /// Run a bundling pass, returning the bundle text
    ///
    /// Styles collected during the pass are available from the session
    /// afterwards.
    pub async fn bundle(&self, source: &str) -> Result<String> {
        self.session.reset_styles();

        let kind = InputKind::classify(source);
        info!("Bundling {:?} input ({} bytes)", kind, source.len());

        let mut overlay = Vec::new();
        let entry_source = match kind {
            InputKind::Component => {
                let preprocessed = self.session.preprocessor().process(source);
                overlay.push(FileEntry::new(COMPONENT_FILE, preprocessed));
                self.session
                    .component_compiler()
                    .mount_entry(&format!("./{}", COMPONENT_FILE))
            }
            InputKind::Script => source.to_string(),
        };
        overlay.push(FileEntry::new(ENTRY_FILE, entry_source));

        let registry = Arc::new(self.session.registry().overlay(overlay));
        let plugins = self.plugins(registry);

        let pass = Pass {
            plugins,
            graph: RwLock::new(ModuleGraph::new()),
        };
        pass.process_module(ENTRY_ID, true).await?;

        let graph = pass.graph.into_inner();
        debug!("Module graph has {} modules", graph.len());

        Ok(link(&graph, &self.session.config().output.name))
    }

    /// The plugin chain, in priority order
    fn plugins(&self, registry: Arc<ComponentRegistry>) -> PluginManager {
        let mut plugins = PluginManager::new(registry);
        plugins.register(Arc::new(StyleStubPlugin));
        plugins.register(Arc::new(VirtualFilePlugin::new(&self.session.config().library)));
        plugins.register(Arc::new(ComponentPlugin::new(self.session.clone())));
        plugins.register(Arc::new(RemotePlugin::new(self.session.clone())));
        plugins.register(Arc::new(CatchAllPlugin));
        plugins
    }
}

/// Graph construction state of one pass
struct Pass {
    plugins: PluginManager,
    graph: RwLock<ModuleGraph>,
}

impl Pass {
    /// Load, transform, parse and add a module, then its dependencies
    ///
    /// Returns a boxed future so the recursion has a nameable, `Send` type
    fn process_module<'a>(&'a self, id: &'a str, is_entry: bool) -> BoxFuture<'a, Result<ModuleId>> {
        Box::pin(async move {
            let existing = self.graph.read().get_module_id(id);
            if let Some(existing) = existing {
                return Ok(existing);
            }

            let annotate = |e: BundleError| e.in_module(id);

            let source = self
                .plugins
                .load(id)
                .await
                .map_err(annotate)?
                .ok_or_else(|| BundleError::Unloaded(id.to_string()).in_module(id))?;
            let code = self.plugins.transform(&source, id).await.map_err(annotate)?;
            let syntax = ModuleSyntax::parse(id, &code).map_err(|e| annotate(e.into()))?;
            let specifiers = syntax.dependencies().to_vec();

            let module_id = self.graph.write().add_module(Module::new(id, code, syntax, is_entry));

            for specifier in specifiers {
                let resolved = self
                    .plugins
                    .resolve_id(&specifier, Some(id))
                    .await
                    .map_err(annotate)?
                    .ok_or_else(|| {
                        BundleError::Unresolved {
                            specifier: specifier.clone(),
                            importer: id.to_string(),
                        }
                        .in_module(id)
                    })?;

                self.process_module(&resolved, false).await.map_err(annotate)?;

                if let Some(module) = self.graph.write().get_module_mut(module_id) {
                    module.resolved.insert(specifier, resolved);
                }
            }

            Ok(module_id)
        })
    }
}

/// Render a pass failure as the multi-line message shown to the user
pub fn format_error(err: &BundleError) -> String {
    let root = err.root();
    let mut message = format!("Error: {}", root);

    let mut stack = vec![format!("{}: {}", err.kind(), root)];
    if let BundleError::Compile(compile) = root {
        if let Some(excerpt) = &compile.stack_excerpt {
            stack.extend(excerpt.lines().map(str::to_string));
        }
    }
    stack.extend(err.module_trail().into_iter().map(|id| format!("    at {}", id.escape_debug())));

    message.push_str("\n\nStack trace:\n");
    message.push_str(&first_lines(&stack.join("\n"), STACK_LINES));

    if let BundleError::Compile(compile) = root {
        if let Some(frame) = &compile.source_frame {
            message.push_str("\n\nFrame: ");
            message.push_str(frame);
        }
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::MockFetcher;
    use crate::session::testing::session;
    use crate::transform::CompileError;
    use pretty_assertions::assert_eq;

    async fn compile(session: &Arc<Session>, source: &str) -> CompilationResult {
        Bundler::new(session.clone()).compile(source).await
    }

    #[test]
    fn test_classify_input() {
        assert_eq!(InputKind::classify("  \n<div>hi</div>"), InputKind::Component);
        assert_eq!(InputKind::classify("console.log(1)"), InputKind::Script);
        assert_eq!(InputKind::classify("// <div>\nx"), InputKind::Script);
    }

    #[tokio::test]
    async fn test_component_input() {
        let (session, fetcher) = session(MockFetcher::new(), &[]);
        let result = compile(&session, "<div>hi</div>").await;

        assert!(result.is_success(), "{:?}", result.error);
        let code = result.code.unwrap();
        assert!(code.starts_with("var playground = (function () {"));
        assert!(code.contains("__pg_modules[\"virtual:file/__component__.svelte\"]"));
        assert!(code.contains("host.innerHTML = `<div>hi</div>`;"));
        assert!(code.contains("const app = Component({ target: document.body });"));
        assert_eq!(result.styles.as_deref(), Some(""));
        assert_eq!(fetcher.total(), 0);
    }

    #[tokio::test]
    async fn test_script_input_is_the_entry() {
        let (session, _) = session(MockFetcher::new(), &[]);
        let result = compile(&session, "console.log(1)").await;

        let code = result.code.unwrap();
        assert!(code.contains("__pg_modules[\"virtual:file/__entry__.js\"] = function (module, exports, require) {\nconsole.log(1)\n  };"));
        assert!(!code.contains("__component__"));
        assert!(!code.contains("Component_"));
    }

    #[tokio::test]
    async fn test_component_styles_are_collected_per_pass() {
        let (session, _) = session(MockFetcher::new(), &[]);
        let styled = "<p class=\"x\">x</p>\n<style>.x { color: red; }</style>";

        let first = compile(&session, styled).await;
        assert!(first.styles.unwrap().contains("color: red"));

        let second = compile(&session, "<p>plain</p>").await;
        assert_eq!(second.styles.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_remote_package_entry_point() {
        let fetcher = MockFetcher::new()
            .route("https://unpkg.com/left-pad@latest/package.json", r#"{"main": "index.js"}"#)
            .route(
                "https://unpkg.com/left-pad@latest/index.js",
                "module.exports = function leftPad(s) { return s; };",
            );
        let (session, fetcher) = session(fetcher, &[]);

        let source = "import leftPad from 'left-pad';\nimport again from 'left-pad@latest/index.js';\nconsole.log(leftPad('x'), again);";
        let result = compile(&session, source).await;

        let code = result.code.unwrap();
        assert!(code.contains("__pg_modules[\"https://unpkg.com/left-pad@latest/index.js\"]"));
        assert!(code.contains("module.exports = function leftPad(s)"));
        assert_eq!(fetcher.count("https://unpkg.com/left-pad@latest/package.json"), 1);
        assert_eq!(fetcher.count("https://unpkg.com/left-pad@latest/index.js"), 1);

        compile(&session, source).await;
        assert_eq!(fetcher.count("https://unpkg.com/left-pad@latest/package.json"), 1);
        assert_eq!(fetcher.total(), 2);
    }

    #[tokio::test]
    async fn test_unknown_bare_specifier_becomes_empty_module() {
        let (session, _) = session(MockFetcher::new(), &[]);
        let result = compile(&session, "import thing from 'totally-unrecognized-thing';\nconsole.log(thing);").await;

        assert!(result.is_success(), "{:?}", result.error);
        let code = result.code.unwrap();
        assert!(code.contains("__pg_modules[\"\\u0000empty:totally-unrecognized-thing\"]"));
        assert!(code.contains("const __default__ = {}; // Empty module"));
    }

    #[tokio::test]
    async fn test_relative_imports_in_redirected_module() {
        let fetcher = MockFetcher::new()
            .route_redirect(
                "https://unpkg.com/pkg@latest/index.js",
                "https://unpkg.com/pkg@2.0.0/dist/index.js",
                "export { helper } from './helper.js';",
            )
            .route("https://unpkg.com/pkg@2.0.0/dist/helper.js", "export const helper = 1;");
        let (session, _) = session(fetcher, &[]);

        let result = compile(&session, "import { helper } from 'pkg@latest/index.js';\nconsole.log(helper);").await;

        assert!(result.is_success(), "{:?}", result.error);
        assert!(result.code.unwrap().contains("__pg_modules[\"https://unpkg.com/pkg@2.0.0/dist/helper.js\"]"));
    }

    #[tokio::test]
    async fn test_minified_remote_module() {
        let fetcher = MockFetcher::new()
            .route(
                "https://unpkg.com/mini@1/index.js",
                r#"import a from"./a.js";import b from"./b.js";const c=a+b;export{c as default};"#,
            )
            .route("https://unpkg.com/mini@1/a.js", "export default 1;")
            .route("https://unpkg.com/mini@1/b.js", "export default 2;");
        let (session, fetcher) = session(fetcher, &[]);

        let result = compile(&session, "import mini from 'https://unpkg.com/mini@1/index.js';\nconsole.log(mini);").await;

        assert_eq!(result.error, None);
        assert_eq!(fetcher.count("https://unpkg.com/mini@1/a.js"), 1);
        assert_eq!(fetcher.count("https://unpkg.com/mini@1/b.js"), 1);

        let code = result.code.unwrap();
        assert!(code.contains("__pg_modules[\"https://unpkg.com/mini@1/b.js\"]"));
        assert!(code.contains(
            "const __pg_m1 = require(\"https://unpkg.com/mini@1/b.js\"); const b = __pg_default(__pg_m1);const c=a+b;"
        ));
        assert!(code.contains("\"default\": function () { return c; }"));
        assert!(!code.contains("import"));
        assert!(!code.contains("export{"));
        assert!(!code.contains("export "));
    }

    #[tokio::test]
    async fn test_unparseable_remote_module_fails_the_pass() {
        let fetcher = MockFetcher::new().route("https://unpkg.com/broken@1/index.js", "export const = ;");
        let (session, _) = session(fetcher, &[]);

        let result = compile(&session, "import 'https://unpkg.com/broken@1/index.js';").await;

        let error = result.error.unwrap();
        assert!(error.starts_with("Error: Failed to parse https://unpkg.com/broken@1/index.js: "));
        assert!(error.contains("\n    at https://unpkg.com/broken@1/index.js\n    at virtual:file/__entry__.js"));
        assert_eq!(result.code, None);
    }

    #[tokio::test]
    async fn test_markup_text_is_not_module_syntax() {
        let (session, fetcher) = session(MockFetcher::new(), &[]);
        let result = compile(&session, "<pre>\nimport pad from 'left-pad';\n</pre>").await;

        assert_eq!(result.error, None);
        assert_eq!(fetcher.total(), 0);
        assert!(result.code.unwrap().contains("<pre>\nimport pad from 'left-pad';\n</pre>"));
    }

    #[tokio::test]
    async fn test_registry_component_with_svg_and_sibling() {
        let files = [
            (
                "components/card/Card.svelte",
                "<script>\n  import icon from './icon.svg';\n  import Badge from '../badge/Badge.svelte';\n</script>\n<img src={icon} />",
            ),
            ("components/card/icon.svg", "<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>"),
        ];
        let (session, _) = session(MockFetcher::new(), &files);

        let result = compile(&session, "<script>\n  import Card from 'components/card/Card.svelte';\n</script>\n<p>card</p>").await;

        assert!(result.is_success(), "{:?}", result.error);
        let code = result.code.unwrap();
        assert!(code.contains("const __default__ = \"data:image/svg+xml;charset=utf-8,%3Csvg"));
        assert!(code.contains("Component not found: components/badge/Badge.svelte"));
    }

    #[tokio::test]
    async fn test_library_facade() {
        let files = [("components/button/Button.svelte", "<button>ok</button>")];
        let (session, _) = session(MockFetcher::new(), &files);

        let result = compile(&session, "import { Button } from 'sourcegraph-ui';\nButton({ target: document.body });").await;

        let code = result.code.unwrap();
        assert!(code.contains("__pg_modules[\"virtual:file/lib/components/index.ts\"]"));
        assert!(code.contains("__pg_modules[\"virtual:file/components/button/Button.svelte\"]"));
    }

    #[tokio::test]
    async fn test_bundling_is_idempotent() {
        let fetcher = MockFetcher::new()
            .route("https://unpkg.com/left-pad@latest/package.json", r#"{"main": "index.js"}"#)
            .route("https://unpkg.com/left-pad@latest/index.js", "module.exports = 1;");
        let (session, _) = session(fetcher, &[("util/a.js", "export const a = 1;")]);
        let source = "import { a } from './util/a.js';\nimport pad from 'left-pad';\nconsole.log(a, pad);";

        let first = compile(&session, source).await;
        let second = compile(&session, source).await;
        assert_eq!(first, second);

        let component = "<p>{1 + 1}</p>\n<style>p { color: blue; }</style>";
        assert_eq!(compile(&session, component).await, compile(&session, component).await);
    }

    #[tokio::test]
    async fn test_successful_pass_clears_stale_registry() {
        let (session, _) = session(MockFetcher::new(), &[]);
        session.mark_registry_stale();

        compile(&session, "console.log(1)").await;
        assert!(!session.is_registry_stale());
    }

    #[tokio::test]
    async fn test_remote_load_failure() {
        let (session, _) = session(MockFetcher::new(), &[]);
        let result = compile(&session, "import x from 'https://unpkg.com/gone@1/x.js';").await;

        assert_eq!(
            result.error.as_deref(),
            Some(
                "Error: Failed to fetch https://unpkg.com/gone@1/x.js: 404 Not Found\n\n\
                 Stack trace:\n\
                 LoadError: Failed to fetch https://unpkg.com/gone@1/x.js: 404 Not Found\n    \
                 at https://unpkg.com/gone@1/x.js\n    \
                 at virtual:file/__entry__.js"
            )
        );
        assert_eq!(result.code, None);
        assert_eq!(result.styles, None);
    }

    #[tokio::test]
    async fn test_component_compile_failure_has_frame() {
        let (session, _) = session(MockFetcher::new(), &[]);
        let result = compile(&session, "<div>\n  {#if ok}yes{/if}\n</div>").await;

        let error = result.error.unwrap();
        assert!(error.starts_with("Error: Block syntax '{#' is not supported\n\nStack trace:\nCompileError: "));
        assert!(error.contains("\n    at __component__.svelte:2:3\n    at virtual:file/__component__.svelte"));
        assert!(error.contains("\n\nFrame: 1: <div>\n2:   {#if ok}yes{/if}\n     ^"));
    }

    #[tokio::test]
    async fn test_escaping_the_registry_root_is_unresolved() {
        let (session, _) = session(MockFetcher::new(), &[]);
        let result = compile(&session, "import x from '../outside.js';").await;

        assert!(result
            .error
            .unwrap()
            .starts_with("Error: Could not resolve '../outside.js' from 'virtual:file/__entry__.js'"));
    }

    #[test]
    fn test_format_error_truncates_stack() {
        let mut err = BundleError::Compile(CompileError {
            message: "Unexpected token".to_string(),
            stack_excerpt: Some("    at A.svelte:1:1".to_string()),
            source_frame: None,
        });
        for id in ["virtual:file/a.js", "virtual:file/b.js", "virtual:file/c.js", "virtual:file/d.js"] {
            err = err.in_module(id);
        }

        let formatted = format_error(&err);
        assert_eq!(
            formatted,
            "Error: Unexpected token\n\nStack trace:\n\
             CompileError: Unexpected token\n    \
             at A.svelte:1:1\n    \
             at virtual:file/a.js\n    \
             at virtual:file/b.js\n    \
             at virtual:file/c.js"
        );
    }
}
