//! Component compilation plugin for `.svelte` modules

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{Plugin, PluginContext, TransformResult};
use crate::error::Result;
use crate::registry::COMPONENT_EXTENSION;
use crate::session::Session;

/// Compiles single-file components and collects their styles into the
/// session's stylesheet accumulator
pub struct ComponentPlugin {
    session: Arc<Session>,
}

impl ComponentPlugin {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Plugin for ComponentPlugin {
    fn name(&self) -> &str {
        "component"
    }

    async fn transform(&self, code: &str, id: &str, _ctx: &PluginContext) -> Result<TransformResult> {
        // Stub ids carry the original specifier, extension included
        if !id.ends_with(COMPONENT_EXTENSION) || id.starts_with('\0') {
            return Ok(TransformResult::Skip);
        }

        let preprocessed = self.session.preprocessor().process(code);
        let compiled = self.session.component_compiler().compile(&preprocessed, id)?;

        if let Some(css) = compiled.css.as_deref() {
            debug!("Collected {} bytes of styles from {}", css.len(), id);
            self.session.append_styles(css);
        }

        Ok(TransformResult::Transformed(compiled.code))
    }
}
