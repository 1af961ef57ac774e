//! Module syntax scan
//!
//! Every module is parsed once. The scan records the specifiers the module
//! depends on, in source order, and the byte ranges the linker rewrites onto
//! the bundle runtime. Text inside strings, comments and template literals is
//! never mistaken for module syntax.

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};
use tracing::debug;

use crate::transform::CompileError;

/// Names bound by an import statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportBindings {
    pub default: Option<String>,
    pub namespace: Option<String>,
    /// `(imported, local)` pairs
    pub named: Vec<(String, String)>,
}

impl ImportBindings {
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.namespace.is_none() && self.named.is_empty()
    }
}

/// What replaces one range of module source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// Type-only syntax, dropped
    Remove,
    /// `import ... from "x"` or `import "x"`
    Import {
        specifier: String,
        bindings: ImportBindings,
    },
    /// `export * from "x"`
    ReexportAll { specifier: String },
    /// `export * as ns from "x"`
    ReexportNamespace { specifier: String, exported: String },
    /// `export { a as b } from "x"`, as `(imported, exported)` pairs
    ReexportNamed {
        specifier: String,
        names: Vec<(String, String)>,
    },
    /// `export { a as b }`, as `(local, exported)` pairs
    ExportList { names: Vec<(String, String)> },
    /// The `export` keyword of a declaration binding `names`
    ExportDeclaration { names: Vec<String> },
    /// `export default` in front of a named function or class
    DefaultDeclaration { name: String },
    /// `export default` in front of an expression or anonymous declaration
    DefaultExpression,
    /// Statement terminator after an anonymous default declaration
    Terminate,
    /// `import("x")`
    DynamicImport { specifier: String },
    /// The string argument of `require("x")`
    RequireArgument { specifier: String },
}

/// A rewrite of the byte range `start..end`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub rewrite: Rewrite,
}

/// Dependencies and rewrite sites of one module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSyntax {
    dependencies: Vec<String>,
    edits: Vec<Edit>,
}

impl ModuleSyntax {
    /// Parse `code`, the content of module `id`
    ///
    /// Sources are parsed as ES modules first. Code that only parses as a
    /// classic script (sloppy-mode CommonJS) is accepted too. `.ts` modules
    /// are parsed as TypeScript so type-only imports can be dropped.
    pub fn parse(id: &str, code: &str) -> Result<Self, CompileError> {
        let allocator = Allocator::default();
        let typescript = id.ends_with(".ts");

        let module_type = SourceType::default().with_module(true).with_typescript(typescript);
        let ret = Parser::new(&allocator, code, module_type).parse();
        if ret.errors.is_empty() {
            return Self::scan(id, code, &ret.program);
        }

        let script_type = SourceType::default().with_typescript(typescript);
        let script = Parser::new(&allocator, code, script_type).parse();
        if script.errors.is_empty() {
            debug!("Parsed {} as a script", id);
            return Self::scan(id, code, &script.program);
        }

        let cause = ret.errors.first().map(|e| e.to_string()).unwrap_or_default();
        Err(CompileError::new(format!("Failed to parse {}: {}", id, cause)))
    }

    fn scan(id: &str, code: &str, program: &Program) -> Result<Self, CompileError> {
        let mut scanner = Scanner::default();
        for statement in &program.body {
            scanner.statement(statement);
        }
        scanner.visit_program(program);

        if let Some(offset) = scanner.unsupported {
            return Err(CompileError::at("Unsupported module syntax", id, code, offset));
        }

        scanner.dependencies.sort_by_key(|(offset, _)| *offset);
        let mut dependencies: Vec<String> = Vec::new();
        for (_, specifier) in scanner.dependencies {
            if !dependencies.contains(&specifier) {
                dependencies.push(specifier);
            }
        }

        scanner.edits.sort_by_key(|edit| (edit.start, edit.end));

        debug!("Found {} dependencies in {}", dependencies.len(), id);

        Ok(Self {
            dependencies,
            edits: scanner.edits,
        })
    }

    /// Specifiers this module imports, first-seen order, without duplicates
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Rewrites ordered by position; ranges never overlap
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }
}

#[derive(Default)]
struct Scanner {
    dependencies: Vec<(u32, String)>,
    edits: Vec<Edit>,
    /// Offset of the first statement the runtime cannot express
    unsupported: Option<usize>,
}

impl Scanner {
    fn depend(&mut self, span: Span, specifier: &str) {
        self.dependencies.push((span.start, specifier.to_string()));
    }

    fn edit(&mut self, start: u32, end: u32, rewrite: Rewrite) {
        self.edits.push(Edit {
            start: start as usize,
            end: end as usize,
            rewrite,
        });
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::ImportDeclaration(decl) => self.import(decl),
            Statement::ExportNamedDeclaration(decl) => self.export_named(decl),
            Statement::ExportDefaultDeclaration(decl) => self.export_default(decl),
            Statement::ExportAllDeclaration(decl) => {
                if decl.export_kind.is_type() {
                    self.edit(decl.span.start, decl.span.end, Rewrite::Remove);
                    return;
                }
                let specifier = decl.source.value.to_string();
                self.depend(decl.span, &specifier);
                let rewrite = match &decl.exported {
                    Some(exported) => Rewrite::ReexportNamespace {
                        specifier,
                        exported: export_name(exported),
                    },
                    None => Rewrite::ReexportAll { specifier },
                };
                self.edit(decl.span.start, decl.span.end, rewrite);
            }
            Statement::TSExportAssignment(decl) => self.unsupported(decl.span),
            Statement::TSNamespaceExportDeclaration(decl) => self.unsupported(decl.span),
            Statement::TSImportEqualsDeclaration(decl) => self.unsupported(decl.span),
            _ => {}
        }
    }

    fn unsupported(&mut self, span: Span) {
        self.unsupported.get_or_insert(span.start as usize);
    }

    fn import(&mut self, decl: &ImportDeclaration) {
        if decl.import_kind.is_type() {
            self.edit(decl.span.start, decl.span.end, Rewrite::Remove);
            return;
        }

        let mut bindings = ImportBindings::default();
        for specifier in decl.specifiers.iter().flatten() {
            match specifier {
                ImportDeclarationSpecifier::ImportSpecifier(named) => {
                    if named.import_kind.is_type() {
                        continue;
                    }
                    let imported = export_name(&named.imported);
                    let local = named.local.name.to_string();
                    if imported == "default" && bindings.default.is_none() {
                        bindings.default = Some(local);
                    } else {
                        bindings.named.push((imported, local));
                    }
                }
                ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => {
                    bindings.default = Some(default.local.name.to_string());
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(namespace) => {
                    bindings.namespace = Some(namespace.local.name.to_string());
                }
            }
        }

        let specifier = decl.source.value.to_string();
        self.depend(decl.span, &specifier);
        self.edit(decl.span.start, decl.span.end, Rewrite::Import { specifier, bindings });
    }

    fn export_named(&mut self, decl: &ExportNamedDeclaration) {
        if decl.export_kind.is_type() {
            self.edit(decl.span.start, decl.span.end, Rewrite::Remove);
            return;
        }

        if let Some(declaration) = &decl.declaration {
            match declared_names(declaration) {
                Some(names) => self.edit(
                    decl.span.start,
                    declaration.span().start,
                    Rewrite::ExportDeclaration { names },
                ),
                None => self.edit(decl.span.start, decl.span.end, Rewrite::Remove),
            }
            return;
        }

        let names: Vec<(String, String)> = decl
            .specifiers
            .iter()
            .filter(|specifier| !specifier.export_kind.is_type())
            .map(|specifier| (export_name(&specifier.local), export_name(&specifier.exported)))
            .collect();

        let rewrite = match &decl.source {
            Some(source) => {
                let specifier = source.value.to_string();
                self.depend(decl.span, &specifier);
                Rewrite::ReexportNamed { specifier, names }
            }
            None => Rewrite::ExportList { names },
        };
        self.edit(decl.span.start, decl.span.end, rewrite);
    }

    fn export_default(&mut self, decl: &ExportDefaultDeclaration) {
        let inner = decl.declaration.span();
        let declared = match &decl.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(function) => {
                Some(function.id.as_ref().map(|id| id.name.to_string()))
            }
            ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                Some(class.id.as_ref().map(|id| id.name.to_string()))
            }
            ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => {
                self.edit(decl.span.start, decl.span.end, Rewrite::Remove);
                return;
            }
            _ => None,
        };

        match declared {
            Some(Some(name)) => self.edit(decl.span.start, inner.start, Rewrite::DefaultDeclaration { name }),
            Some(None) => {
                // An anonymous declaration becomes an expression and needs its own terminator
                self.edit(decl.span.start, inner.start, Rewrite::DefaultExpression);
                self.edit(inner.end, inner.end, Rewrite::Terminate);
            }
            None => self.edit(decl.span.start, inner.start, Rewrite::DefaultExpression),
        }
    }
}

impl<'a> Visit<'a> for Scanner {
    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        if let Expression::StringLiteral(source) = &expr.source {
            let specifier = source.value.to_string();
            self.depend(expr.span, &specifier);
            self.edit(expr.span.start, expr.span.end, Rewrite::DynamicImport { specifier });
        }
        walk::walk_import_expression(self, expr);
    }

    fn visit_call_expression(&mut self, expr: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &expr.callee {
            if callee.name == "require" && expr.arguments.len() == 1 {
                if let Some(Argument::StringLiteral(source)) = expr.arguments.first() {
                    let specifier = source.value.to_string();
                    self.depend(source.span, &specifier);
                    self.edit(source.span.start, source.span.end, Rewrite::RequireArgument { specifier });
                }
            }
        }
        walk::walk_call_expression(self, expr);
    }
}

fn export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::IdentifierName(id) => id.name.to_string(),
        ModuleExportName::IdentifierReference(id) => id.name.to_string(),
        ModuleExportName::StringLiteral(literal) => literal.value.to_string(),
    }
}

/// Bindings introduced by an exported declaration; `None` for type-only ones
fn declared_names(declaration: &Declaration) -> Option<Vec<String>> {
    let mut names = Vec::new();
    match declaration {
        Declaration::VariableDeclaration(variables) => {
            for declarator in &variables.declarations {
                binding_names(&declarator.id, &mut names);
            }
        }
        Declaration::FunctionDeclaration(function) => {
            names.extend(function.id.iter().map(|id| id.name.to_string()));
        }
        Declaration::ClassDeclaration(class) => {
            names.extend(class.id.iter().map(|id| id.name.to_string()));
        }
        _ => return None,
    }
    Some(names)
}

fn binding_names(pattern: &BindingPattern, names: &mut Vec<String>) {
    match pattern {
        BindingPattern::BindingIdentifier(id) => names.push(id.name.to_string()),
        BindingPattern::ObjectPattern(object) => {
            for property in &object.properties {
                binding_names(&property.value, names);
            }
            if let Some(rest) = &object.rest {
                binding_names(&rest.argument, names);
            }
        }
        BindingPattern::ArrayPattern(array) => {
            for element in array.elements.iter().flatten() {
                binding_names(element, names);
            }
            if let Some(rest) = &array.rest {
                binding_names(&rest.argument, names);
            }
        }
        BindingPattern::AssignmentPattern(assignment) => binding_names(&assignment.left, names),
    }
}
