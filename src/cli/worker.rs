//! Worker command implementation

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::config::Config;
use crate::registry::ComponentRegistry;
use crate::session::Session;
use crate::worker::Worker;

/// Answer worker messages on stdin with replies on stdout
#[derive(Args, Debug)]
pub struct WorkerCommand {}

impl WorkerCommand {
    pub async fn execute(&self, config: Config, registry: ComponentRegistry) -> Result<()> {
        let session = Session::with_defaults(config, registry).context("Failed to start worker session")?;
        let worker = Worker::new(Arc::new(session));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await.context("Failed to read message")? {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(reply) = worker.handle_text(&line).await {
                stdout.write_all(reply.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        debug!("Input closed, worker exiting");
        Ok(())
    }
}
