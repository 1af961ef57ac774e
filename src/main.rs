//! Playground - bundles live component sources for the component playground
//!
//! Resolves imports against the component registry and a package CDN,
//! compiles single-file components and links everything into one bundle
//! plus an extracted stylesheet.
//!
//! # Commands
//! - `worker`: worker message protocol over stdin/stdout
//! - `serve`: worker message protocol over WebSocket
//! - `bundle`: one-shot bundling of a file
//! - `scan`: registry generation

use anyhow::Result;
use clap::Parser;
use playground_lib::Cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging/tracing system
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("playground=debug,playground_lib=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("playground=info,playground_lib=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    cli.execute().await
}
