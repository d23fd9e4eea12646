//! Configuration validation utilities.

use super::ConfigError;
use super::models::*;

/// Validate the entire configuration.
pub fn validate_config(config: &LinksetConfig) -> Result<(), ConfigError> {
    validate_relationship_config(&config.relationships)?;

    Ok(())
}

/// Validate relationship engine configuration.
fn validate_relationship_config(config: &RelationshipConfig) -> Result<(), ConfigError> {
    if config.repository_path.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Relationship repository path cannot be empty".to_string(),
        ));
    }

    if config.repository_path.ends_with('/') {
        return Err(ConfigError::ValidationError(format!(
            "Relationship repository path '{}' must not end with '/'",
            config.repository_path
        )));
    }

    if config.max_concurrent_operations == 0 {
        return Err(ConfigError::ValidationError(
            "max_concurrent_operations must be at least 1".to_string(),
        ));
    }

    Ok(())
}
