//! Command-line interface for the playground
//!
//! Provides the main CLI structure using clap with subcommands for:
//! - `worker`: Worker protocol over stdin/stdout
//! - `serve`: Worker protocol over WebSocket
//! - `bundle`: One-shot bundling of a source file
//! - `scan`: Registry generation from the component library

mod bundle;
mod scan;
mod serve;
mod worker;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::registry::ComponentRegistry;

pub use bundle::BundleCommand;
pub use scan::ScanCommand;
pub use serve::ServeCommand;
pub use worker::WorkerCommand;

/// Playground bundler - bundles live component sources against a component
/// registry and a package CDN
#[derive(Parser, Debug)]
#[command(name = "playground")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to playground.toml config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Registry JSON file, overriding `registry.path`
    #[arg(long, global = true, env = "PLAYGROUND_REGISTRY")]
    pub registry: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer worker messages from stdin, one JSON object per line
    Worker(WorkerCommand),

    /// Serve workers over WebSocket
    Serve(ServeCommand),

    /// Bundle a single source file
    Bundle(BundleCommand),

    /// Scan the component library into a registry file
    Scan(ScanCommand),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        let config = Config::load_or_default(&self.config)?;

        match &self.command {
            Commands::Worker(cmd) => {
                let registry = load_registry(&config, self.registry.as_deref())?;
                cmd.execute(config, registry).await
            }
            Commands::Serve(cmd) => {
                print_banner();
                let registry = load_registry(&config, self.registry.as_deref())?;
                cmd.execute(config, registry).await
            }
            Commands::Bundle(cmd) => {
                let registry = load_registry(&config, self.registry.as_deref())?;
                cmd.execute(config, registry).await
            }
            Commands::Scan(cmd) => {
                print_banner();
                cmd.execute(&config, self.registry.as_deref())
            }
        }
    }
}

/// Load the registry a session starts from
///
/// An absent registry file yields an empty registry, so bundling still works
/// against the CDN alone.
fn load_registry(config: &Config, path: Option<&Path>) -> Result<ComponentRegistry> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(|| config.registry_path());

    if !path.exists() {
        warn!("Registry {} not found, starting with an empty registry", path.display());
        return Ok(ComponentRegistry::new());
    }

    let registry = ComponentRegistry::load(&path)?;
    info!("Loaded {} registry files from {}", registry.len(), path.display());
    Ok(registry)
}

/// Print the playground banner
fn print_banner() {
    eprintln!(
        "\n{} {} {}\n",
        "⚡".cyan(),
        "Playground".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
