//! Worker server
//!
//! Hosts playground workers behind a WebSocket endpoint. Each connection is
//! one playground instance with its own session and caches.

mod socket;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use colored::Colorize;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::Config;
use crate::registry::ComponentRegistry;

/// Path of the worker WebSocket endpoint
pub const SOCKET_PATH: &str = "/__playground";

/// Shared server state
struct ServerState {
    /// Configuration handed to every new session
    config: Config,

    /// Registry snapshot every new session starts from
    registry: ComponentRegistry,
}

/// WebSocket worker server
pub struct WorkerServer {
    config: Config,
    registry: ComponentRegistry,
}

impl WorkerServer {
    pub fn new(config: Config, registry: ComponentRegistry) -> Self {
        Self { config, registry }
    }

    /// Build the router serving the worker endpoint
    fn router(&self) -> Router {
        let state = Arc::new(ServerState {
            config: self.config.clone(),
            registry: self.registry.clone(),
        });

        Router::new()
            .route(SOCKET_PATH, get(socket::worker_websocket))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind and serve until the process is stopped
    pub async fn start(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        let local: SocketAddr = listener.local_addr()?;

        info!("Worker server listening on ws://{}{}", local, SOCKET_PATH);
        eprintln!(
            "  {} Worker endpoint: {}",
            "→".blue(),
            format!("ws://{}{}", local, SOCKET_PATH).cyan()
        );

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
