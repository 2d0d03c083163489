mod loader;
mod types;

pub use loader::{load_config, load_config_from_str};
pub use types::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Minimum accepted signing key length in bytes. Short keys make the HMAC
/// trivially brute-forceable.
const MIN_SIGNING_KEY_LEN: usize = 16;

/// Validate cross-field constraints that serde cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if matches!(config.auth.method, AuthMethod::ApiKey)
        && config.auth.api_key.as_deref().unwrap_or("").is_empty()
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method is api_key".to_string(),
        ));
    }

    if !config.engine.url.starts_with("http://") && !config.engine.url.starts_with("https://") {
        return Err(ConfigError::ValidationError(format!(
            "engine.url must be an http(s) URL, got {:?}",
            config.engine.url
        )));
    }

    if config.token.signing_key.len() < MIN_SIGNING_KEY_LEN {
        return Err(ConfigError::ValidationError(format!(
            "token.signing_key must be at least {} bytes",
            MIN_SIGNING_KEY_LEN
        )));
    }

    Ok(())
}
