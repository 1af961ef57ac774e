//! Bundle serialization
//!
//! Every module becomes a factory in a small CommonJS-style runtime. ES
//! module syntax is rewritten onto that runtime: imports become `require`
//! calls against resolved ids, exports become live getters on `exports`.

use std::collections::BTreeMap;

use super::graph::{Module, ModuleGraph};
use super::syntax::{ImportBindings, Rewrite};
use crate::resolver::is_identifier;

const RUNTIME: &str = r#"  var __pg_modules = {};
  var __pg_cache = {};

  function __pg_require(id) {
    if (__pg_cache[id]) return __pg_cache[id].exports;
    var factory = __pg_modules[id];
    if (!factory) throw new Error("Module not found: " + id);
    var module = { exports: {} };
    __pg_cache[id] = module;
    factory.call(module.exports, module, module.exports, __pg_require);
    return module.exports;
  }

  function __pg_default(m) {
    return m && m.__esModule ? m.default : m;
  }

  function __pg_mark(exports) {
    if (!exports.__esModule) Object.defineProperty(exports, "__esModule", { value: true });
  }

  function __pg_export(exports, getters) {
    __pg_mark(exports);
    for (var key in getters) {
      Object.defineProperty(exports, key, { enumerable: true, get: getters[key] });
    }
  }

  function __pg_reexport(exports, source) {
    __pg_mark(exports);
    Object.keys(source).forEach(function (key) {
      if (key === "default" || Object.prototype.hasOwnProperty.call(exports, key)) return;
      Object.defineProperty(exports, key, { enumerable: true, get: function () { return source[key]; } });
    });
  }
"#;

/// Serialize the graph into one self-invoking bundle assigned to `name`
pub fn link(graph: &ModuleGraph, name: &str) -> String {
    let mut bundle = String::new();

    bundle.push_str(&format!("var {} = (function () {{\n", name));
    bundle.push_str(RUNTIME);

    for module in graph.modules() {
        bundle.push_str(&format!(
            "\n  // {}\n  __pg_modules[{}] = function (module, exports, require) {{\n",
            module.id.escape_debug(),
            quote(&module.id)
        ));
        bundle.push_str(&rewrite_module(module));
        if !bundle.ends_with('\n') {
            bundle.push('\n');
        }
        bundle.push_str("  };\n");
    }

    if let Some(entry) = graph.entry() {
        bundle.push_str(&format!("\n  return __pg_require({});\n", quote(&entry.id)));
    }
    bundle.push_str("})();\n");

    bundle
}

/// JS string literal for `value`
fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Renders the rewrites of one module
struct Rewriter<'a> {
    resolved: &'a BTreeMap<String, String>,
    getters: Vec<(String, String)>,
    temps: usize,
}

impl<'a> Rewriter<'a> {
    fn new(resolved: &'a BTreeMap<String, String>) -> Self {
        Self {
            resolved,
            getters: Vec::new(),
            temps: 0,
        }
    }

    /// Resolved id of `specifier`, keeping unknown specifiers as written
    fn resolve(&self, specifier: &'a str) -> &'a str {
        self.resolved.get(specifier).map(String::as_str).unwrap_or(specifier)
    }

    fn require(&self, specifier: &'a str) -> String {
        format!("require({})", quote(self.resolve(specifier)))
    }

    fn temp(&mut self) -> String {
        let name = format!("__pg_m{}", self.temps);
        self.temps += 1;
        name
    }

    fn getter(&mut self, exported: &str, expression: &str) {
        if !self.getters.iter().any(|(name, _)| name == exported) {
            self.getters.push((exported.to_string(), expression.to_string()));
        }
    }

    fn render(&mut self, rewrite: &'a Rewrite) -> String {
        match rewrite {
            Rewrite::Remove => String::new(),
            Rewrite::Import { specifier, bindings } => self.import(specifier, bindings),
            Rewrite::ReexportAll { specifier } => format!("__pg_reexport(exports, {});", self.require(specifier)),
            Rewrite::ReexportNamespace { specifier, exported } => {
                let temp = self.temp();
                self.getter(exported, &temp);
                format!("const {} = {};", temp, self.require(specifier))
            }
            Rewrite::ReexportNamed { specifier, names } => {
                let temp = self.temp();
                for (imported, exported) in names {
                    let expression = if imported == "default" {
                        format!("__pg_default({})", temp)
                    } else {
                        member(&temp, imported)
                    };
                    self.getter(exported, &expression);
                }
                format!("const {} = {};", temp, self.require(specifier))
            }
            Rewrite::ExportList { names } => {
                for (local, exported) in names {
                    self.getter(exported, local);
                }
                String::new()
            }
            Rewrite::ExportDeclaration { names } => {
                for name in names {
                    self.getter(name, name);
                }
                String::new()
            }
            Rewrite::DefaultDeclaration { name } => {
                self.getter("default", name);
                String::new()
            }
            Rewrite::DefaultExpression => {
                self.getter("default", "__default__");
                "const __default__ = ".to_string()
            }
            Rewrite::Terminate => ";".to_string(),
            Rewrite::DynamicImport { specifier } => {
                format!("Promise.resolve().then(function () {{ return {}; }})", self.require(specifier))
            }
            Rewrite::RequireArgument { specifier } => quote(self.resolve(specifier)),
        }
    }

    fn import(&mut self, specifier: &'a str, bindings: &ImportBindings) -> String {
        if bindings.is_empty() {
            return format!("{};", self.require(specifier));
        }

        let temp = self.temp();
        let mut statements = vec![format!("const {} = {};", temp, self.require(specifier))];

        if let Some(default) = &bindings.default {
            statements.push(format!("const {} = __pg_default({});", default, temp));
        }
        if let Some(namespace) = &bindings.namespace {
            statements.push(format!("const {} = {};", namespace, temp));
        }
        if !bindings.named.is_empty() {
            let pattern: Vec<String> = bindings
                .named
                .iter()
                .map(|(imported, local)| {
                    if imported == local {
                        local.clone()
                    } else if is_identifier(imported) {
                        format!("{}: {}", imported, local)
                    } else {
                        format!("{}: {}", quote(imported), local)
                    }
                })
                .collect();
            statements.push(format!("const {{ {} }} = {};", pattern.join(", "), temp));
        }

        statements.join(" ")
    }

    fn export_header(&self) -> Option<String> {
        if self.getters.is_empty() {
            return None;
        }
        let getters: Vec<String> = self
            .getters
            .iter()
            .map(|(name, expression)| format!("{}: function () {{ return {}; }}", quote(name), expression))
            .collect();
        Some(format!("__pg_export(exports, {{ {} }});\n", getters.join(", ")))
    }
}

/// Rewrite one module body onto the runtime
pub fn rewrite_module(module: &Module) -> String {
    let mut rewriter = Rewriter::new(&module.resolved);
    let mut code = String::with_capacity(module.code.len());
    let mut pos = 0;

    for edit in module.syntax.edits() {
        // Inside a statement that was already dropped
        if edit.start < pos || edit.end > module.code.len() {
            continue;
        }
        code.push_str(&module.code[pos..edit.start]);
        code.push_str(&rewriter.render(&edit.rewrite));
        pos = edit.end;
    }
    code.push_str(&module.code[pos..]);

    match rewriter.export_header() {
        Some(header) => format!("{}{}", header, code),
        None => code,
    }
}

/// `object.name`, or `object["name"]` when `name` is not an identifier
fn member(object: &str, name: &str) -> String {
    if is_identifier(name) {
        format!("{}.{}", object, name)
    } else {
        format!("{}[{}]", object, quote(name))
    }
}
