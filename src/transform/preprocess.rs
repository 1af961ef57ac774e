//! Component preprocessing
//!
//! Compiles `<style lang="...">` blocks written in a preprocessed style
//! language before the component reaches the component compiler.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, warn};

use super::StyleCompiler;

static STYLE_BLOCK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<style(\s[^>]*)?>(.*?)</style\s*>"#).unwrap());

static LANG_ATTR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\s+lang\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

/// Style-block preprocessor for component sources
pub struct Preprocessor {
    style_compiler: Arc<dyn StyleCompiler>,
    languages: Vec<String>,
}

impl Preprocessor {
    /// Create a preprocessor that routes the given `lang` values through
    /// `style_compiler`
    pub fn new(style_compiler: Arc<dyn StyleCompiler>, languages: Vec<String>) -> Self {
        Self {
            style_compiler,
            languages,
        }
    }

    /// Whether `source` has any style block needing preprocessing
    pub fn needs_preprocessing(&self, source: &str) -> bool {
        self.languages.iter().any(|lang| {
            source.contains(&format!("lang=\"{}\"", lang)) || source.contains(&format!("lang='{}'", lang))
        })
    }

    /// Compile recognized style blocks in place
    ///
    /// A block that fails to compile keeps its original content.
    pub fn process(&self, source: &str) -> String {
        if !self.needs_preprocessing(source) {
            return source.to_string();
        }

        STYLE_BLOCK_REGEX
            .replace_all(source, |caps: &Captures| self.process_block(caps))
            .into_owned()
    }

    fn process_block(&self, caps: &Captures) -> String {
        let whole = &caps[0];
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let content = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        let lang = LANG_ATTR_REGEX
            .captures(attrs)
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().to_ascii_lowercase());

        let Some(lang) = lang.filter(|lang| self.languages.iter().any(|l| l.eq_ignore_ascii_case(lang)))
        else {
            return whole.to_string();
        };

        let remaining_attrs = LANG_ATTR_REGEX.replace(attrs, "");

        let css = match self.style_compiler.compile(content) {
            Ok(css) => {
                debug!("Compiled {} style block with {}", lang, self.style_compiler.name());
                css
            }
            Err(e) => {
                warn!("Style compilation error, keeping original {} source: {}", lang, e);
                content.to_string()
            }
        };

        format!("<style{}>{}</style>", remaining_attrs, css)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::StyleError;
    use pretty_assertions::assert_eq;

    struct UpperCase;

    impl StyleCompiler for UpperCase {
        fn name(&self) -> &str {
            "upper"
        }

        fn compile(&self, source: &str) -> Result<String, StyleError> {
            if source.contains("broken") {
                return Err(StyleError::Parse("broken".to_string()));
            }
            Ok(source.to_uppercase())
        }
    }

    fn preprocessor() -> Preprocessor {
        Preprocessor::new(Arc::new(UpperCase), vec!["scss".to_string()])
    }

    #[test]
    fn test_no_style_block_is_noop() {
        let source = "<div>hi</div>";
        assert_eq!(preprocessor().process(source), source);
    }

    #[test]
    fn test_plain_style_block_untouched() {
        let source = "<div>hi</div>\n<style>.a { color: red; }</style>";
        assert_eq!(preprocessor().process(source), source);
    }

    #[test]
    fn test_compiles_recognized_block() {
        let source = "<p>x</p>\n<style lang=\"scss\">.a { b: c; }</style>";
        assert_eq!(preprocessor().process(source), "<p>x</p>\n<style>.A { B: C; }</style>");
    }

    #[test]
    fn test_single_quoted_lang_and_extra_attrs() {
        let source = "<style global lang='scss'>.a {}</style>";
        assert_eq!(preprocessor().process(source), "<style global>.A {}</style>");
    }

    #[test]
    fn test_failure_keeps_original_content() {
        let source = "<style lang=\"scss\">.broken { $x }</style><style lang=\"scss\">.ok {}</style>";
        assert_eq!(
            preprocessor().process(source),
            "<style>.broken { $x }</style><style>.OK {}</style>"
        );
    }

    #[test]
    fn test_other_languages_untouched() {
        let source = "<style lang=\"scss\">.a {}</style><style lang=\"less\">.b {}</style>";
        assert_eq!(
            preprocessor().process(source),
            "<style>.A {}</style><style lang=\"less\">.b {}</style>"
        );
    }
}
