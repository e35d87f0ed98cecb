use super::{
    types::{AuthMethod, Config, WorkerConfig},
    ConfigError,
};

/// Validate server configuration
/// Currently validates:
/// - Server port is not 0
/// - Callback secret is set
/// - API key present when api_key auth is selected
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.callback.secret.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "callback.secret cannot be empty".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_ref().is_none_or(|k| k.is_empty())
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method = \"api_key\"".to_string(),
        ));
    }

    Ok(())
}

/// Validate worker configuration
pub fn validate_worker_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    let base = config.console.base_url.as_str();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "console.base_url must be an http(s) URL, got {:?}",
            base
        )));
    }

    if config.callback.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "callback.url cannot be empty".to_string(),
        ));
    }

    if config.job.link_poll.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "job.link_poll.max_attempts must be at least 1".to_string(),
        ));
    }

    if config.job.link_poll.backoff_factor < 1.0 {
        return Err(ConfigError::ValidationError(
            "job.link_poll.backoff_factor cannot be below 1.0".to_string(),
        ));
    }

    Ok(())
}
