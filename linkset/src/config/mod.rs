//! Configuration system for Linkset.
//!
//! Configuration is layered: built-in defaults, then the first default
//! configuration file found, then `LINKSET_` environment variables.

mod builder;
mod loader;
mod models;
mod validation;

pub use builder::ConfigBuilder;
pub use loader::ConfigLoader;
pub use models::*;
pub use validation::validate_config;

/// Default configuration file names that the system will look for
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "linkset.toml",
    "linkset.yaml",
    "linkset.yml",
    "linkset.json",
    ".linkset/config.toml",
    ".linkset/config.yaml",
    ".linkset/config.yml",
    ".linkset/config.json",
];

/// Environment variable prefix for Linkset configuration
pub const ENV_PREFIX: &str = "LINKSET_";

/// Configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Error occurred during file loading
    #[error("Failed to load configuration file: {0}")]
    FileLoadError(String),

    /// Error occurred during validation
    #[error("Configuration validation error: {0}")]
    ValidationError(String),

    /// Error occurred during parsing
    #[error("Configuration parsing error: {0}")]
    ParseError(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
