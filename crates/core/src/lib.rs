pub mod accounts;
pub mod auth;
pub mod callback;
pub mod challenge;
pub mod config;
pub mod console;
pub mod correlation;
pub mod exchange;
pub mod gateway;
pub mod metrics;
pub mod poller;
pub mod retry;
pub mod testing;
pub mod worker;

pub use accounts::{AccountRecord, AccountStore, NewAccount, PersistenceError, SqliteAccountStore};
pub use auth::{
    create_authenticator, secrets_match, ApiKeyAuthenticator, AuthError, AuthRequest,
    Authenticator, Identity,
};
pub use callback::{
    CallbackError, CallbackMessage, CallbackSink, HttpCallbackSink, MessageBody, MessageStatus,
    SyncReport, SyncedDevice, SyncedStatus,
};
pub use challenge::{solve as solve_challenge, ChallengeError, ChallengeQuestion, Operator};
pub use config::{
    load_config, load_config_from_str, load_worker_config, load_worker_config_from_str,
    validate_config, validate_worker_config, AuthConfig, AuthMethod, CallbackConfig, Config,
    ConfigError, DatabaseConfig, ExchangeBackend, ExchangeConfig, SanitizedConfig, ServerConfig,
    WorkerConfig,
};
pub use console::{
    CodePayload, ConnectionMethod, ConnectionStatus, ConsoleConnector, ConsoleCredentials,
    ConsoleError, ConsoleSession, DeviceEntry, WebConsole,
};
pub use correlation::{CorrelationId, CorrelationIdError};
pub use exchange::{create_status_exchange, ExchangeError, StatusExchange};
pub use gateway::{CallbackGateway, GatewayError, StatusReply};
pub use poller::{ConnectionPoller, LinkTarget, LinkedAccount};
pub use retry::{poll_until, RetryError, RetryPolicy};
pub use worker::{
    AutomationJob, AutomationWorker, JobOutcome, JobRequest, WaitStage, WorkerError, WorkerState,
};
