//! Playground bundler library
//!
//! Bundles live component sources against a virtual component registry and
//! a package CDN, for hosting behind a worker channel.

pub mod bundler;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod plugins;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod session;
pub mod transform;
pub mod utils;
pub mod worker;

pub use bundler::{Bundler, CompilationResult};
pub use cli::Cli;
pub use config::Config;
pub use error::BundleError;
pub use registry::ComponentRegistry;
pub use session::Session;
pub use worker::Worker;
