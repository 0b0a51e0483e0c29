use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Gateway credential is non-empty
/// - Read timeout is not 0
/// - Allow-list, when present, is non-empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.gateway.credential.is_empty() {
        return Err(ConfigError::ValidationError(
            "gateway.credential cannot be empty".to_string(),
        ));
    }

    if config.gateway.read_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "gateway.read_timeout_secs cannot be 0".to_string(),
        ));
    }

    if let Some(ids) = &config.allowed_user_ids {
        if ids.is_empty() {
            return Err(ConfigError::ValidationError(
                "allowed_user_ids must not be an empty list (omit it to allow everyone)"
                    .to_string(),
            ));
        }
    }

    Ok(())
}
