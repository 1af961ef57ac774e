//! Configuration schema definitions

use serde::{Deserialize, Serialize};

/// Project metadata configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    #[serde(default = "default_project_name")]
    pub name: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_project_name(),
        }
    }
}

fn default_project_name() -> String {
    "playground".to_string()
}

/// Component registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry JSON file consumed by bundling passes
    #[serde(default = "default_registry_path")]
    pub path: String,

    /// Library root scanned by `playground scan`
    #[serde(default = "default_registry_root")]
    pub root: String,

    /// Glob patterns excluded from scanning
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
            root: default_registry_root(),
            ignore: Vec::new(),
        }
    }
}

fn default_registry_path() -> String {
    "registry.json".to_string()
}

fn default_registry_root() -> String {
    "src/lib".to_string()
}

/// Package CDN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// CDN base URL, packages are served from `<cdn>/<name>@<version>/<path>`
    #[serde(default = "default_cdn")]
    pub cdn: String,

    /// Request timeout in seconds (0 disables the timeout)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            cdn: default_cdn(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_cdn() -> String {
    "https://unpkg.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Component library facade configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Bare specifier that imports the whole library
    #[serde(default = "default_facade")]
    pub facade: String,

    /// Registry path of the aggregation module the facade maps to
    #[serde(default = "default_index")]
    pub index: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            facade: default_facade(),
            index: default_index(),
        }
    }
}

fn default_facade() -> String {
    "sourcegraph-ui".to_string()
}

fn default_index() -> String {
    "lib/components/index.ts".to_string()
}

/// Style preprocessing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesConfig {
    /// `lang` attributes that route a style block through the style compiler
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
        }
    }
}

fn default_languages() -> Vec<String> {
    vec!["scss".to_string()]
}

/// Bundle output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Global variable name the bundle assigns its entry exports to
    #[serde(default = "default_output_name")]
    pub name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            name: default_output_name(),
        }
    }
}

fn default_output_name() -> String {
    "playground".to_string()
}

/// Worker server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to run the worker server on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

fn default_port() -> u16 {
    5178
}

fn default_host() -> String {
    "localhost".to_string()
}
