//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the console, the callback
//! sink and the account store, so worker and gateway flows can be tested
//! without a real console or database.
//!
//! # Example
//!
//! ```rust,ignore
//! use gatelink_core::testing::{MockCallbackSink, MockConsole, MockConsoleConnector};
//!
//! let console = MockConsole::new();
//! let connector = MockConsoleConnector::new(console.clone());
//! let sink = MockCallbackSink::new();
//!
//! // Configure the console
//! console.set_code(CodePayload::Qr { image: "data:image/png;base64,AA".into() }).await;
//!
//! // Build an AutomationWorker with Arc::new(connector), Arc::new(sink)...
//! ```

mod mock_account_store;
mod mock_callback_sink;
mod mock_console;

pub use mock_account_store::MockAccountStore;
pub use mock_callback_sink::MockCallbackSink;
pub use mock_console::{MockConsole, MockConsoleConnector};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::config::{
        CallbackTargetConfig, ConsoleConfig, JobConfig, WorkerConfig,
    };
    use crate::console::{ConnectionStatus, DeviceEntry};
    use crate::retry::RetryPolicy;
    use crate::worker::JobRequest;
    use std::time::Duration;

    /// A device list entry.
    pub fn device(id: &str, phone: Option<&str>, status: ConnectionStatus) -> DeviceEntry {
        DeviceEntry {
            external_id: id.to_string(),
            phone_number: phone.map(String::from),
            status,
            sent_count: Some(0),
        }
    }

    /// Worker config with the production poll policy and a short settle pause.
    pub fn worker_config() -> WorkerConfig {
        WorkerConfig {
            console: ConsoleConfig {
                base_url: "https://console.test".to_string(),
                login_path: "/login".to_string(),
                landing_path: "/".to_string(),
                devices_path: "/bots".to_string(),
                api_path: "/api/bots".to_string(),
                settings_path: "/api/bots/settings".to_string(),
                request_timeout_secs: 5,
                user_agent: "gatelink-test".to_string(),
            },
            job: JobConfig {
                code_timeout_secs: 30,
                settle_interval_ms: 10,
                await_link: true,
                link_poll: RetryPolicy::fixed(45, Duration::from_secs(2)),
            },
            callback: CallbackTargetConfig {
                url: "https://front.test/api/v1/callback".to_string(),
                sync_url: Some("https://front.test/api/v1/sync".to_string()),
                timeout_secs: 5,
            },
        }
    }

    /// Job parameters with only action and correlation id set.
    pub fn job_request(action: &str, correlation_id: &str) -> JobRequest {
        JobRequest {
            action: action.to_string(),
            correlation_id: correlation_id.to_string(),
            owner_id: Some("user-1".to_string()),
            ..Default::default()
        }
    }
}
