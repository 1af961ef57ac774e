//! Module graph data structures

use std::collections::{BTreeMap, HashMap};

use super::syntax::ModuleSyntax;

/// Index of a module in discovery order
pub type ModuleId = usize;

/// A module in the dependency graph
#[derive(Debug, Clone)]
pub struct Module {
    /// Resolved id produced by the resolver plugins
    pub id: String,

    /// Code after loading and transformation
    pub code: String,

    /// Dependencies and rewrite sites of `code`
    pub syntax: ModuleSyntax,

    /// Whether this is the pass entry point
    pub is_entry: bool,

    /// Import specifier -> resolved id
    pub resolved: BTreeMap<String, String>,
}

impl Module {
    pub fn new(id: &str, code: String, syntax: ModuleSyntax, is_entry: bool) -> Self {
        Self {
            id: id.to_string(),
            code,
            syntax,
            is_entry,
            resolved: BTreeMap::new(),
        }
    }
}

/// The module dependency graph of one bundling pass
#[derive(Debug, Default)]
pub struct ModuleGraph {
    /// Modules in discovery order
    modules: Vec<Module>,

    /// Map from resolved id to module index
    id_to_index: HashMap<String, ModuleId>,
}

impl ModuleGraph {
    /// Create a new empty module graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module to the graph, returning the existing index for a known id
    pub fn add_module(&mut self, module: Module) -> ModuleId {
        if let Some(&index) = self.id_to_index.get(&module.id) {
            return index;
        }

        let index = self.modules.len();
        self.id_to_index.insert(module.id.clone(), index);
        self.modules.push(module);

        index
    }

    /// Get module index from its resolved id
    pub fn get_module_id(&self, id: &str) -> Option<ModuleId> {
        self.id_to_index.get(id).copied()
    }

    /// Get a mutable reference to a module
    pub fn get_module_mut(&mut self, index: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(index)
    }

    /// All modules in discovery order
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    /// The entry module, if one was added
    pub fn entry(&self) -> Option<&Module> {
        self.modules.iter().find(|module| module.is_entry)
    }

    /// Total number of modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if graph is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(id: &str, is_entry: bool) -> Module {
        Module::new(id, String::new(), ModuleSyntax::default(), is_entry)
    }

    #[test]
    fn test_module_graph_basic() {
        let mut graph = ModuleGraph::new();

        let id = graph.add_module(Module::new(
            "virtual:file/__entry__.js",
            "console.log('test')".to_string(),
            ModuleSyntax::default(),
            true,
        ));
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get_module_id("virtual:file/__entry__.js"), Some(id));
        assert_eq!(graph.entry().map(|m| m.id.as_str()), Some("virtual:file/__entry__.js"));
    }

    #[test]
    fn test_duplicate_ids_are_merged() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module(module("a", true));
        let again = graph.add_module(Module::new("a", "ignored".to_string(), ModuleSyntax::default(), false));

        assert_eq!(a, again);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get_module_mut(a).map(|m| m.code.as_str()), Some(""));
    }

    #[test]
    fn test_modules_keep_discovery_order() {
        let mut graph = ModuleGraph::new();
        for id in ["entry", "c", "b"] {
            graph.add_module(module(id, id == "entry"));
        }
        graph.add_module(module("c", false));

        assert_eq!(graph.modules().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["entry", "c", "b"]);
        assert!(!graph.is_empty());
    }
}
