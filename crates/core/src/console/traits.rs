//! Capability boundary to the third-party console.

use async_trait::async_trait;

use super::{
    CodePayload, ConnectionMethod, ConsoleCredentials, ConsoleError, ControlToggle, DeviceEntry,
    LoginOutcome,
};

/// Opens browser sessions against the console.
#[async_trait]
pub trait ConsoleConnector: Send + Sync {
    /// Backend name (for logging).
    fn name(&self) -> &str;

    /// Open a fresh, unauthenticated session owned by one job.
    async fn open(&self) -> Result<Box<dyn ConsoleSession>, ConsoleError>;
}

/// One exclusively-owned browser session.
///
/// All site-specific scraping stays behind this trait.
#[async_trait]
pub trait ConsoleSession: Send + Sync {
    /// Text of the login challenge ("12 + 7 = ?"), possibly surrounded by markup.
    async fn fetch_challenge(&self) -> Result<String, ConsoleError>;

    /// Submit credentials plus the challenge answer.
    async fn submit_login(
        &self,
        credentials: &ConsoleCredentials,
        answer: i64,
    ) -> Result<LoginOutcome, ConsoleError>;

    /// Navigate to the add-device flow and choose the connection method.
    async fn select_method(&self, method: &ConnectionMethod) -> Result<(), ConsoleError>;

    /// Wait for the code artifact of the selected method to render.
    async fn read_code(&self) -> Result<CodePayload, ConsoleError>;

    /// Refresh and read the device list.
    async fn list_devices(&self) -> Result<Vec<DeviceEntry>, ConsoleError>;

    /// Set a control on one device entry.
    async fn toggle_control(&self, toggle: &ControlToggle) -> Result<(), ConsoleError>;

    /// Release all resources. Later calls fail with `ConsoleError::Released`.
    async fn release(&self) -> Result<(), ConsoleError>;
}
