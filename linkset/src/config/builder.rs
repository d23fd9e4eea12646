//! Configuration builder.

use super::{Result, models::*, validation};
use std::path::Path;

/// Builder for creating LinksetConfig instances.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: LinksetConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the store container holding edge records.
    pub fn with_repository_path(mut self, path: impl Into<String>) -> Self {
        self.config.relationships.repository_path = path.into();
        self
    }

    /// Bound the number of store operations in flight per fan-out.
    pub fn with_max_concurrent_operations(mut self, limit: usize) -> Self {
        self.config.relationships.max_concurrent_operations = limit;
        self
    }

    /// Enable or disable expansion of referenced resources.
    pub fn with_expand_references(mut self, enabled: bool) -> Self {
        self.config.relationships.expand_references = enabled;
        self
    }

    /// Reject or pass through unrecognized query filter fields.
    pub fn with_strict_filter_fields(mut self, strict: bool) -> Self {
        self.config.relationships.strict_filter_fields = strict;
        self
    }

    /// Serialize replaces of the same owner within this process.
    pub fn with_serialized_owner_replaces(mut self, enabled: bool) -> Self {
        self.config.relationships.serialize_owner_replaces = enabled;
        self
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Set the log format.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Configure logging to a file.
    pub fn with_log_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.logging.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Create a configuration for development.
    ///
    /// Debug-level pretty logging, owner replaces serialized.
    pub fn development() -> Self {
        Self::new()
            .with_log_level(LogLevel::Debug)
            .with_log_format(LogFormat::Pretty)
            .with_serialized_owner_replaces(true)
    }

    /// Create a configuration for automated tests: warnings only, no
    /// expansion and a single operation in flight.
    pub fn testing() -> Self {
        Self::new()
            .with_log_level(LogLevel::Warn)
            .with_expand_references(false)
            .with_max_concurrent_operations(1)
    }

    /// Create a production configuration with JSON logging.
    pub fn production() -> Self {
        Self::new()
            .with_log_level(LogLevel::Info)
            .with_log_format(LogFormat::Json)
    }

    /// Build the configuration, validating it in the process.
    pub fn build(self) -> Result<LinksetConfig> {
        validation::validate_config(&self.config)?;

        Ok(self.config)
    }
}
