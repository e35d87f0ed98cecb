use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::de::DeserializeOwned;
use std::path::Path;

use super::{
    types::{Config, WorkerConfig},
    ConfigError,
};

/// Environment prefix for overrides, e.g. `GATELINK_CALLBACK__SECRET`.
pub const ENV_PREFIX: &str = "GATELINK_";

/// Load server configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_from_file(path)
}

/// Load worker configuration from file with environment variable overrides
pub fn load_worker_config(path: &Path) -> Result<WorkerConfig, ConfigError> {
    load_from_file(path)
}

fn load_from_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load worker configuration from TOML string
pub fn load_worker_config_from_str(toml_str: &str) -> Result<WorkerConfig, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
