//! Component transformation
//!
//! Style preprocessing and single-file component compilation. The two
//! compilers sit behind traits so a session can be handed different
//! implementations; the built-in ones are [`LightningStyleCompiler`] and
//! [`MarkupCompiler`].

pub mod markup;
pub mod preprocess;
pub mod style;

use thiserror::Error;

pub use markup::MarkupCompiler;
pub use preprocess::Preprocessor;
pub use style::{LightningStyleCompiler, StyleCompiler, StyleError};

/// Registry path of the user's pasted component inside a bundling pass
pub const COMPONENT_FILE: &str = "__component__.svelte";

/// A component compilation failure
///
/// Built explicitly by compilers so the error formatter never has to
/// inspect an opaque failure for optional details.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompileError {
    /// Human-readable description
    pub message: String,

    /// Location lines, innermost first
    pub stack_excerpt: Option<String>,

    /// Source excerpt with a caret under the failing column
    pub source_frame: Option<String>,
}

impl CompileError {
    /// Error without location details
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack_excerpt: None,
            source_frame: None,
        }
    }

    /// Error located at a byte offset of `source`
    pub fn at(message: impl Into<String>, filename: &str, source: &str, offset: usize) -> Self {
        let (line, column) = line_column(source, offset);
        Self {
            message: message.into(),
            stack_excerpt: Some(format!("    at {}:{}:{}", filename, line, column)),
            source_frame: Some(source_frame(source, line, column)),
        }
    }
}

/// Output of compiling one component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledComponent {
    /// ES module code whose default export mounts the component
    pub code: String,

    /// Extracted stylesheet fragment, if the component has styles
    pub css: Option<String>,
}

/// Turns one preprocessed component source into executable module code
pub trait ComponentCompiler: Send + Sync {
    /// Compiler name for logging
    fn name(&self) -> &str;

    /// Compile `source`; `filename` is used in diagnostics only
    fn compile(&self, source: &str, filename: &str) -> Result<CompiledComponent, CompileError>;

    /// Entry module that imports the component at `specifier` and mounts it
    fn mount_entry(&self, specifier: &str) -> String {
        format!(
            "import Component from '{specifier}';\n\nconst app = Component({{ target: document.body }});\n\nexport default app;\n"
        )
    }
}

/// 1-based line and column of a byte offset
pub fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

/// Render up to two lines of context around `line`, with a caret under
/// `column`
pub fn source_frame(source: &str, line: usize, column: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let first = line.saturating_sub(2).max(1);
    let last = line.min(lines.len().max(1));
    let width = last.to_string().len();

    let mut frame = String::new();
    for number in first..=last {
        let text = lines.get(number - 1).copied().unwrap_or("");
        frame.push_str(&format!("{:>width$}: {}\n", number, text, width = width));
        if number == line {
            frame.push_str(&format!("{:>width$}  {}^\n", "", " ".repeat(column - 1), width = width));
        }
    }
    frame.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_line_column() {
        let source = "ab\ncd\nef";
        assert_eq!(line_column(source, 0), (1, 1));
        assert_eq!(line_column(source, 4), (2, 2));
        assert_eq!(line_column(source, 100), (3, 3));
    }

    #[test]
    fn test_source_frame_points_at_column() {
        let source = "<div>\n  {#if x}\n</div>";
        let frame = source_frame(source, 2, 3);
        assert_eq!(frame, "1: <div>\n2:   {#if x}\n     ^");
    }

    #[test]
    fn test_compile_error_at() {
        let err = CompileError::at("Unexpected token", "App.svelte", "a\nbc", 2);
        assert_eq!(err.to_string(), "Unexpected token");
        assert_eq!(err.stack_excerpt.as_deref(), Some("    at App.svelte:2:1"));
        assert!(err.source_frame.unwrap().ends_with('^'));
    }
}
