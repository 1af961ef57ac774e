//! Serve command implementation

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::Config;
use crate::registry::ComponentRegistry;
use crate::server::WorkerServer;

/// Serve playground workers over WebSocket
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Port to listen on, overriding `server.port`
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to, overriding `server.host`
    #[arg(long)]
    pub host: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, mut config: Config, registry: ComponentRegistry) -> Result<()> {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }

        eprintln!(
            "{} Starting worker server with {} registry files\n",
            "→".blue(),
            registry.len().to_string().cyan()
        );
        eprintln!("  {} Press {} to stop\n", "•".dimmed(), "Ctrl+C".yellow());

        WorkerServer::new(config, registry).start().await
    }
}
