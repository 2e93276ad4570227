use super::{types::Config, ConfigError};
use crate::reply::MESSAGE_PLACEHOLDER;

/// Validate configuration
/// Currently validates:
/// - Telegram token is not empty
/// - Storage path is not empty and at least one conversion may run
/// - Transcoder timeout is not 0
/// - Error template has a place for the message
/// - Metrics port is not 0 when the endpoint is enabled
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.telegram.token.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "telegram.token cannot be empty".to_string(),
        ));
    }

    // Convert validation
    if config.convert.storage_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "convert.storage_path cannot be empty".to_string(),
        ));
    }
    if config.convert.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "convert.max_concurrent must be at least 1".to_string(),
        ));
    }

    if config.transcoder.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "transcoder.timeout_secs cannot be 0".to_string(),
        ));
    }

    if !config.templates.error.contains(MESSAGE_PLACEHOLDER) {
        return Err(ConfigError::ValidationError(format!(
            "templates.error must contain {}",
            MESSAGE_PLACEHOLDER
        )));
    }

    if config.metrics.enabled && config.metrics.port == 0 {
        return Err(ConfigError::ValidationError(
            "metrics.port cannot be 0".to_string(),
        ));
    }

    Ok(())
}
