//! Worker message protocol
//!
//! A worker wraps one [`Session`] and answers one message at a time. The
//! same protocol is spoken over stdin/stdout and over the WebSocket server.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::bundler::{Bundler, CompilationResult};
use crate::registry::ComponentRegistry;
use crate::session::Session;

const REFRESH_REGISTRY: &str = "refresh-registry";
const REGISTRY_UPDATED: &str = "registry-updated";
const REGISTRY_REFRESHED: &str = "registry-refreshed";

/// An incoming message
///
/// Control messages carry a `type`; anything else is a bundling request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerRequest {
    /// Correlation id echoed in the reply, any JSON value
    #[serde(default)]
    pub id: Value,

    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub code: Option<String>,

    /// Replacement registry carried by `registry-updated`
    #[serde(default)]
    pub registry: Option<ComponentRegistry>,
}

/// A reply to a request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WorkerResponse {
    /// Outcome of a bundling pass; `null` fields are emitted, not omitted
    Compiled {
        id: Value,
        code: Option<String>,
        styles: Option<String>,
        error: Option<String>,
    },

    /// A request that could not start a pass
    Rejected { id: Value, error: String },

    /// Acknowledgement of `refresh-registry`
    RegistryRefreshed {
        id: Value,
        #[serde(rename = "type")]
        kind: &'static str,
        success: bool,
    },
}

impl WorkerResponse {
    fn compiled(id: Value, result: CompilationResult) -> Self {
        WorkerResponse::Compiled {
            id,
            code: result.code,
            styles: result.styles,
            error: result.error,
        }
    }
}

/// One playground worker
pub struct Worker {
    session: Arc<Session>,
    bundler: Bundler,
}

impl Worker {
    pub fn new(session: Arc<Session>) -> Self {
        let bundler = Bundler::new(session.clone());
        Self { session, bundler }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Handle one message, returning the reply if the message expects one
    pub async fn handle(&self, request: WorkerRequest) -> Option<WorkerResponse> {
        match request.kind.as_deref() {
            Some(REFRESH_REGISTRY) => {
                debug!("Registry marked stale");
                self.session.mark_registry_stale();
                Some(WorkerResponse::RegistryRefreshed {
                    id: request.id,
                    kind: REGISTRY_REFRESHED,
                    success: true,
                })
            }
            Some(REGISTRY_UPDATED) => {
                debug!("Registry update received");
                self.session.registry_updated(request.registry);
                None
            }
            _ => {
                let code = request.code.unwrap_or_default();
                if code.is_empty() {
                    return Some(WorkerResponse::Rejected {
                        id: request.id,
                        error: "No code provided".to_string(),
                    });
                }

                let result = self.bundler.compile(&code).await;
                Some(WorkerResponse::compiled(request.id, result))
            }
        }
    }

    /// Handle one JSON-encoded message, returning the JSON-encoded reply
    ///
    /// Undecodable messages are logged and dropped.
    pub async fn handle_text(&self, text: &str) -> Option<String> {
        let request: WorkerRequest = match serde_json::from_str(text) {
            Ok(request) => request,
            Err(e) => {
                warn!("Ignoring malformed message: {}", e);
                return None;
            }
        };

        let response = self.handle(request).await?;
        match serde_json::to_string(&response) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!("Failed to encode reply: {}", e);
                None
            }
        }
    }
}
