//! Style compilation
//!
//! Turns preprocessed style-language text into plain CSS.

use std::collections::HashMap;

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Top-level `$name: value;` declarations
static VARIABLE_DECL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*\$([\w-]+)[ \t]*:[ \t]*([^;]+?)[ \t]*(?:!default)?[ \t]*;[ \t]*\r?\n?").unwrap()
});

static VARIABLE_REF_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([\w-]+)").unwrap());

/// Style compilation failure
#[derive(Debug, Error)]
pub enum StyleError {
    #[error("Style parse error: {0}")]
    Parse(String),

    #[error("Style print error: {0}")]
    Print(String),

    #[error("Undefined variable: ${0}")]
    UndefinedVariable(String),
}

/// Style-language source in, CSS out
pub trait StyleCompiler: Send + Sync {
    /// Compiler name for logging
    fn name(&self) -> &str;

    /// Compile one stylesheet
    fn compile(&self, source: &str) -> Result<String, StyleError>;
}

/// Style compiler built on lightningcss
///
/// Handles the SCSS subset the playground needs: `//` comments, top-level
/// variables and nested rules, which are flattened for the configured
/// browser targets.
pub struct LightningStyleCompiler {
    targets: Targets,
}

impl LightningStyleCompiler {
    /// Create a compiler targeting evergreen browsers without native nesting
    pub fn new() -> Self {
        let browsers = Browsers {
            chrome: Some(100 << 16),
            firefox: Some(100 << 16),
            safari: Some(15 << 16),
            ..Browsers::default()
        };
        Self {
            targets: Targets::from(browsers),
        }
    }
}

impl Default for LightningStyleCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleCompiler for LightningStyleCompiler {
    fn name(&self) -> &str {
        "lightningcss"
    }

    fn compile(&self, source: &str) -> Result<String, StyleError> {
        let without_comments = strip_line_comments(source);
        let expanded = expand_variables(&without_comments)?;

        let mut sheet = StyleSheet::parse(&expanded, ParserOptions::default())
            .map_err(|e| StyleError::Parse(e.to_string()))?;

        sheet
            .minify(MinifyOptions {
                targets: self.targets.clone(),
                ..MinifyOptions::default()
            })
            .map_err(|e| StyleError::Print(e.to_string()))?;

        let result = sheet
            .to_css(PrinterOptions {
                targets: self.targets.clone(),
                ..PrinterOptions::default()
            })
            .map_err(|e| StyleError::Print(e.to_string()))?;

        debug!("Compiled {} bytes of style source", source.len());

        Ok(result.code)
    }
}

/// Remove `//` comments outside of strings and `url(...)` schemes
fn strip_line_comments(source: &str) -> String {
    let mut result = String::with_capacity(source.len());

    for line in source.split_inclusive('\n') {
        let mut quote: Option<char> = None;
        let mut prev = ' ';
        let mut cut = None;

        for (idx, c) in line.char_indices() {
            match quote {
                Some(q) if c == q && prev != '\\' => quote = None,
                Some(_) => {}
                None if c == '"' || c == '\'' => quote = Some(c),
                None if c == '/' && prev == '/' => {
                    // `://` belongs to a URL
                    let before = &line[..idx - 1];
                    if !before.ends_with(':') {
                        cut = Some(idx - 1);
                        break;
                    }
                }
                None => {}
            }
            prev = c;
        }

        match cut {
            Some(at) => {
                result.push_str(line[..at].trim_end());
                if line.ends_with('\n') {
                    result.push('\n');
                }
            }
            None => result.push_str(line),
        }
    }

    result
}

/// Inline top-level `$variable` declarations
fn expand_variables(source: &str) -> Result<String, StyleError> {
    let mut variables: HashMap<String, String> = HashMap::new();

    for cap in VARIABLE_DECL_REGEX.captures_iter(source) {
        let value = substitute(&cap[2], &variables)?;
        variables.insert(cap[1].to_string(), value);
    }

    if variables.is_empty() && !source.contains('$') {
        return Ok(source.to_string());
    }

    let body = VARIABLE_DECL_REGEX.replace_all(source, "");
    substitute(&body, &variables)
}

fn substitute(text: &str, variables: &HashMap<String, String>) -> Result<String, StyleError> {
    let mut result = String::with_capacity(text.len());
    let mut last = 0;

    for cap in VARIABLE_REF_REGEX.captures_iter(text) {
        let whole = cap.get(0).unwrap();
        let name = &cap[1];
        let value = variables
            .get(name)
            .ok_or_else(|| StyleError::UndefinedVariable(name.to_string()))?;
        result.push_str(&text[last..whole.start()]);
        result.push_str(value);
        last = whole.end();
    }
    result.push_str(&text[last..]);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_variables() {
        let source = "$primary: #336699;\n$accent: $primary;\n.a { color: $accent; }\n";
        let expanded = expand_variables(source).unwrap();
        assert_eq!(expanded.trim(), ".a { color: #336699; }");
    }

    #[test]
    fn test_undefined_variable() {
        let err = expand_variables(".a { color: $missing; }").unwrap_err();
        assert!(matches!(err, StyleError::UndefinedVariable(name) if name == "missing"));
    }

    #[test]
    fn test_strip_line_comments_keeps_urls() {
        let source = "// heading\n.a { background: url(https://x.test/a.png); } // trailing\n";
        let stripped = strip_line_comments(source);
        assert_eq!(stripped, "\n.a { background: url(https://x.test/a.png); }\n");
    }

    #[test]
    fn test_compile_flattens_nesting() {
        let compiler = LightningStyleCompiler::new();
        let css = compiler
            .compile("$gap: 4px;\n.card {\n  padding: $gap;\n  .title { color: red; }\n}\n")
            .unwrap();

        assert!(css.contains(".card .title"));
        assert!(css.contains("padding: 4px"));
        assert!(!css.contains('$'));
    }

    #[test]
    fn test_compile_reports_undefined_variable() {
        let compiler = LightningStyleCompiler::new();
        let err = compiler.compile(".a { color: $brand; }").unwrap_err();
        assert_eq!(err.to_string(), "Undefined variable: $brand");
    }
}
