//! Built-in single-file component compiler
//!
//! A component is an optional `<script>` block, optional `<style>` blocks and
//! markup. The script becomes the module body, the markup becomes a template
//! literal rendered into a scoping host element, and the styles are nested
//! under the host's scope attribute.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::{CompileError, CompiledComponent, ComponentCompiler, StyleCompiler};
use crate::utils::hash_content;

static OPEN_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<(script|style)(\s[^>]*)?>").unwrap());

static SCRIPT_CLOSE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</script\s*>").unwrap());

static STYLE_CLOSE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</style\s*>").unwrap());

static PROP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([ \t]*)export\s+let\s+([A-Za-z_$][\w$]*)").unwrap());

/// The parts of a component source
struct Sections {
    script: String,
    styles: String,
    /// Source with script and style blocks blanked out, byte offsets intact
    markup: String,
}

/// Compiler for the playground's single-file component format
pub struct MarkupCompiler {
    style_compiler: Arc<dyn StyleCompiler>,
}

impl MarkupCompiler {
    /// Create a compiler that scopes component styles with `style_compiler`
    pub fn new(style_compiler: Arc<dyn StyleCompiler>) -> Self {
        Self { style_compiler }
    }

    fn scope_styles(&self, scope: &str, css: &str) -> String {
        let nested = format!("[{}] {{\n{}\n}}\n", scope, css);
        match self.style_compiler.compile(&nested) {
            Ok(scoped) => scoped,
            Err(e) => {
                warn!("Could not scope component styles, emitting them unscoped: {}", e);
                css.to_string()
            }
        }
    }
}

impl ComponentCompiler for MarkupCompiler {
    fn name(&self) -> &str {
        "markup"
    }

    fn compile(&self, source: &str, filename: &str) -> Result<CompiledComponent, CompileError> {
        let short_name = filename.rsplit('/').next().unwrap_or(filename);
        let hash = hash_content(source.as_bytes());
        let scope = format!("data-pg-{}", hash);

        let sections = split_sections(source, short_name)?;
        let template = render_template(&sections.markup, source, short_name)?;
        let (script, props) = extract_props(&sections.script);

        let mut code = String::new();
        if !script.trim().is_empty() {
            code.push_str(script.trim());
            code.push_str("\n\n");
        }
        code.push_str(
            "const __pg_escape = (value) => String(value ?? '').replace(/[&<>\"']/g, (c) => `&#${c.charCodeAt(0)};`);\n\n",
        );
        code.push_str(&format!("export default function Component_{}(options = {{}}) {{\n", hash));
        code.push_str("  const target = options.target;\n");
        code.push_str("  const props = options.props || {};\n");
        for prop in &props {
            code.push_str(&format!("  if ({0:?} in props) {1} = props[{0:?}];\n", prop, prop));
        }
        code.push_str("  const host = document.createElement('div');\n");
        code.push_str(&format!("  host.setAttribute('{}', '');\n", scope));
        code.push_str("  host.style.display = 'contents';\n");
        code.push_str(&format!("  host.innerHTML = `{}`;\n", template));
        code.push_str("  if (target) target.appendChild(host);\n");
        code.push_str("  return {\n    element: host,\n    destroy() {\n      host.remove();\n    },\n  };\n}\n");

        let css = if sections.styles.trim().is_empty() {
            None
        } else {
            Some(self.scope_styles(&scope, sections.styles.trim()))
        };

        debug!("Compiled component {} ({} props)", short_name, props.len());

        Ok(CompiledComponent { code, css })
    }
}

/// Pull script and style blocks out of the source
fn split_sections(source: &str, filename: &str) -> Result<Sections, CompileError> {
    let mut script = String::new();
    let mut styles = String::new();
    let mut markup = String::with_capacity(source.len());
    let mut pos = 0;

    while let Some(open) = OPEN_TAG_REGEX.captures(&source[pos..]) {
        let whole = open.get(0).unwrap();
        let open_start = pos + whole.start();
        let body_start = pos + whole.end();
        let is_script = open[1].eq_ignore_ascii_case("script");

        let close_regex = if is_script { &*SCRIPT_CLOSE_REGEX } else { &*STYLE_CLOSE_REGEX };
        let Some(close) = close_regex.find(&source[body_start..]) else {
            let tag = if is_script { "script" } else { "style" };
            return Err(CompileError::at(
                format!("<{}> block is not closed", tag),
                filename,
                source,
                open_start,
            ));
        };
        let body_end = body_start + close.start();
        let block_end = body_start + close.end();

        let body = &source[body_start..body_end];
        if is_script {
            script.push_str(body);
            script.push('\n');
        } else {
            styles.push_str(body);
            styles.push('\n');
        }

        markup.push_str(&source[pos..open_start]);
        markup.push_str(&blank(&source[open_start..block_end]));
        pos = block_end;
    }
    markup.push_str(&source[pos..]);

    Ok(Sections { script, styles, markup })
}

/// Replace text with spaces of equal byte length, keeping newlines
fn blank(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\n' { "\n".to_string() } else { " ".repeat(c.len_utf8()) })
        .collect()
}

/// Convert markup into the body of a JS template literal
fn render_template(markup: &str, source: &str, filename: &str) -> Result<String, CompileError> {
    let mut out = String::with_capacity(markup.len());
    let mut depth = 0usize;
    let mut expr_start = 0usize;
    let mut chars = markup.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if depth > 0 {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let expr = markup[expr_start..idx].trim();
                        if expr.is_empty() {
                            return Err(CompileError::at("Empty expression", filename, source, expr_start - 1));
                        }
                        out.push_str("${__pg_escape(");
                        out.push_str(expr);
                        out.push_str(")}");
                    }
                }
                _ => {}
            }
            continue;
        }

        match c {
            '{' => {
                if let Some(&(_, next)) = chars.peek() {
                    if matches!(next, '#' | ':' | '/' | '@') {
                        return Err(CompileError::at(
                            format!("Block syntax '{{{}' is not supported", next),
                            filename,
                            source,
                            idx,
                        ));
                    }
                }
                depth = 1;
                expr_start = idx + 1;
            }
            '}' => {
                return Err(CompileError::at("Unexpected '}'", filename, source, idx));
            }
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' => out.push_str("\\$"),
            _ => out.push(c),
        }
    }

    if depth > 0 {
        return Err(CompileError::at("Expression is not closed", filename, source, expr_start - 1));
    }

    Ok(out.trim().to_string())
}

/// Turn `export let name` declarations into plain `let` bindings and
/// collect their names as props
fn extract_props(script: &str) -> (String, Vec<String>) {
    let props = PROP_REGEX
        .captures_iter(script)
        .map(|cap| cap[2].to_string())
        .collect();
    let rewritten = PROP_REGEX.replace_all(script, "${1}let ${2}").into_owned();
    (rewritten, props)
}
