use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::retry::RetryPolicy;

/// Root configuration of the callback/status server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub callback: CallbackConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication for front-end callers of the status poll.
///
/// There is no open mode: every poll must carry a session.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Required; checked by `validate_config`.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    ApiKey,
}

/// Database holding durable account records.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("gatelink.db")
}

/// Shared secret the worker presents on every callback.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackConfig {
    pub secret: String,
}

/// Where status records live between the worker's callback and the front end's poll.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeConfig {
    #[serde(default)]
    pub backend: ExchangeBackend,
    /// Directory for the filesystem backend.
    #[serde(default = "default_exchange_dir")]
    pub dir: PathBuf,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            backend: ExchangeBackend::default(),
            dir: default_exchange_dir(),
        }
    }
}

fn default_exchange_dir() -> PathBuf {
    PathBuf::from("status_files")
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeBackend {
    #[default]
    Memory,
    Filesystem,
    Sqlite,
}

impl ExchangeBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeBackend::Memory => "memory",
            ExchangeBackend::Filesystem => "filesystem",
            ExchangeBackend::Sqlite => "sqlite",
        }
    }
}

// ============================================================================
// Worker configuration
// ============================================================================

/// Root configuration of one automation worker run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    pub console: ConsoleConfig,
    #[serde(default)]
    pub job: JobConfig,
    pub callback: CallbackTargetConfig,
}

/// Third-party console endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsoleConfig {
    /// Console base URL (e.g., "https://app.example.com")
    pub base_url: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Where a successful login lands.
    #[serde(default = "default_landing_path")]
    pub landing_path: String,
    #[serde(default = "default_devices_path")]
    pub devices_path: String,
    #[serde(default = "default_api_path")]
    pub api_path: String,
    #[serde(default = "default_settings_path")]
    pub settings_path: String,
    /// Per-request timeout in seconds (default: 60)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_landing_path() -> String {
    "/".to_string()
}

fn default_devices_path() -> String {
    "/bots".to_string()
}

fn default_api_path() -> String {
    "/api/bots".to_string()
}

fn default_settings_path() -> String {
    "/api/bots/settings".to_string()
}

fn default_request_timeout() -> u32 {
    60
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string()
}

/// Timing policy of a job.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobConfig {
    /// Bound on waiting for the code artifact (seconds).
    #[serde(default = "default_code_timeout")]
    pub code_timeout_secs: u64,
    /// Pause after toggling a control before reporting success (milliseconds).
    #[serde(default = "default_settle_interval")]
    pub settle_interval_ms: u64,
    /// Keep polling for the link after the code was emitted.
    #[serde(default = "default_await_link")]
    pub await_link: bool,
    #[serde(default)]
    pub link_poll: RetryPolicy,
}

fn default_code_timeout() -> u64 {
    30
}

fn default_settle_interval() -> u64 {
    3000
}

fn default_await_link() -> bool {
    true
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            code_timeout_secs: default_code_timeout(),
            settle_interval_ms: default_settle_interval(),
            await_link: default_await_link(),
            link_poll: RetryPolicy::default(),
        }
    }
}

/// Where the worker reports.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackTargetConfig {
    pub url: String,
    /// Device sync endpoint; sync reports are skipped when unset.
    #[serde(default)]
    pub sync_url: Option<String>,
    #[serde(default = "default_callback_timeout")]
    pub timeout_secs: u32,
}

fn default_callback_timeout() -> u32 {
    15
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub callback: SanitizedCallbackConfig,
    pub exchange: SanitizedExchangeConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub api_key_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCallbackConfig {
    pub secret_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedExchangeConfig {
    pub backend: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
                api_key_configured: config
                    .auth
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            callback: SanitizedCallbackConfig {
                secret_configured: !config.callback.secret.is_empty(),
            },
            exchange: SanitizedExchangeConfig {
                backend: config.exchange.backend.as_str().to_string(),
            },
        }
    }
}
