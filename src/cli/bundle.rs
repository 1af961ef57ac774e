//! Bundle command implementation

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::info;

use crate::bundler::Bundler;
use crate::config::Config;
use crate::registry::ComponentRegistry;
use crate::session::Session;
use crate::utils::format_size;

/// Bundle a single component or script
#[derive(Args, Debug)]
pub struct BundleCommand {
    /// Source file to bundle
    pub file: PathBuf,

    /// Write the bundle here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Write the extracted stylesheet here (defaults to the bundle path
    /// with a `.css` extension when `--out` is given)
    #[arg(short, long)]
    pub styles: Option<PathBuf>,
}

impl BundleCommand {
    pub async fn execute(&self, config: Config, registry: ComponentRegistry) -> Result<()> {
        let source = fs::read_to_string(&self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))?;

        info!("Bundling {}", self.file.display());
        let session = Session::with_defaults(config, registry).context("Failed to start bundling session")?;
        let result = Bundler::new(Arc::new(session)).compile(&source).await;

        if let Some(error) = result.error {
            eprintln!("{} {}\n", "✗".red().bold(), "Bundling failed".red());
            eprintln!("{}", error);
            anyhow::bail!("Failed to bundle {}", self.file.display());
        }

        let code = result.code.unwrap_or_default();
        let styles = result.styles.unwrap_or_default();

        match &self.out {
            Some(out) => {
                fs::write(out, &code).with_context(|| format!("Failed to write {}", out.display()))?;
                eprintln!(
                    "{} {} {}",
                    "✓".green().bold(),
                    out.display().to_string().cyan(),
                    format_size(code.len()).dimmed()
                );
            }
            None => print!("{}", code),
        }

        let styles_path = self
            .styles
            .clone()
            .or_else(|| self.out.as_ref().map(|out| out.with_extension("css")));
        if let Some(path) = styles_path {
            fs::write(&path, &styles).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} {} {}",
                "✓".green().bold(),
                path.display().to_string().cyan(),
                format_size(styles.len()).dimmed()
            );
        }

        Ok(())
    }
}
