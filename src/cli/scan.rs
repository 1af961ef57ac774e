//! Scan command implementation

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::Config;
use crate::registry::scan_library;
use crate::utils::format_duration;

/// Scan the component library into the registry data contract
#[derive(Args, Debug)]
pub struct ScanCommand {
    /// Library root, overriding `registry.root`
    pub root: Option<PathBuf>,
}

impl ScanCommand {
    pub fn execute(&self, config: &Config, out: Option<&Path>) -> Result<()> {
        let start = Instant::now();
        let root = self.root.clone().unwrap_or_else(|| config.registry_root());
        let out = out.map(Path::to_path_buf).unwrap_or_else(|| config.registry_path());

        eprintln!("{} Scanning {}...", "→".blue(), root.display());

        let registry = scan_library(&root, &config.registry.ignore)?;
        registry.save(&out)?;

        eprintln!(
            "\n{} Wrote {} files ({} components) to {} in {}\n",
            "✓".green().bold(),
            registry.len(),
            registry.components().count(),
            out.display().to_string().cyan(),
            format_duration(start.elapsed())
        );

        Ok(())
    }
}
