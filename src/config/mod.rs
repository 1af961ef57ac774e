//! Configuration handling for the playground
//!
//! Parses and manages playground.toml configuration files.

mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub use schema::*;

/// Name of the configuration file looked up by default
pub const DEFAULT_CONFIG_FILE: &str = "playground.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Project metadata
    #[serde(default)]
    pub project: ProjectConfig,

    /// Component registry location
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Package CDN settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Library facade settings
    #[serde(default)]
    pub library: LibraryConfig,

    /// Style preprocessing settings
    #[serde(default)]
    pub styles: StylesConfig,

    /// Bundle output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Worker server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Root directory (computed from config file location)
    #[serde(skip)]
    pub root: PathBuf,
}

impl Config {
    /// Load configuration from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let canonical_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let content = fs::read_to_string(&canonical_path)
            .with_context(|| format!("Failed to read config file: {}", canonical_path.display()))?;

        let mut config = Self::parse(&content)?;

        // Set root directory to the directory containing the config file
        config.root = canonical_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(config)
    }

    /// Load the configuration, falling back to defaults when the default
    /// config file is simply absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() && path == Path::new(DEFAULT_CONFIG_FILE) {
            let mut config = Self::default_config();
            config.root = std::env::current_dir()?;
            return Ok(config);
        }
        Self::load(path)
    }

    /// Parse configuration text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| format!("Failed to parse {}", DEFAULT_CONFIG_FILE))?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            root: PathBuf::from("."),
            ..Self::default()
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if !self.remote.cdn.starts_with("http://") && !self.remote.cdn.starts_with("https://") {
            anyhow::bail!("remote.cdn must be an http(s) URL, got '{}'", self.remote.cdn);
        }

        if self.library.facade.is_empty() {
            anyhow::bail!("library.facade must not be empty");
        }

        if self.output.name.is_empty()
            || !self
                .output
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            anyhow::bail!("output.name must be a valid identifier, got '{}'", self.output.name);
        }

        Ok(())
    }

    /// CDN base URL without a trailing slash
    pub fn cdn_base(&self) -> &str {
        self.remote.cdn.trim_end_matches('/')
    }

    /// Get the absolute registry file path
    pub fn registry_path(&self) -> PathBuf {
        self.root.join(&self.registry.path)
    }

    /// Get the absolute library root scanned into the registry
    pub fn registry_root(&self) -> PathBuf {
        self.root.join(&self.registry.root)
    }
}
