//! Mock console for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::console::{
    CodePayload, ConnectionMethod, ConsoleConnector, ConsoleCredentials, ConsoleError,
    ConsoleSession, ControlToggle, DeviceEntry, LoginOutcome,
};

/// Mock implementation of a console session.
///
/// Clones share state, so a test keeps one handle while the worker owns the
/// boxed session:
/// - Challenge text, login landing location and code artifact are configurable
/// - A device can be made to appear on the k-th list refresh after the code was read
/// - Answers, selected methods and toggles are recorded
/// - `set_next_error` fails the next operation
/// - `hang_on_read_code` makes `read_code` never return
///
/// # Example
///
/// ```rust,ignore
/// use gatelink_core::testing::MockConsole;
///
/// let console = MockConsole::new();
/// console.set_code(CodePayload::Qr { image: "data:...".into() }).await;
/// console.link_on_poll(3, linked_device).await;
/// ```
#[derive(Debug, Clone)]
pub struct MockConsole {
    challenge: Arc<RwLock<String>>,
    landing: Arc<RwLock<String>>,
    /// None makes `read_code` time out.
    code: Arc<RwLock<Option<CodePayload>>>,
    hang_on_code: Arc<AtomicBool>,
    devices: Arc<RwLock<Vec<DeviceEntry>>>,
    /// Device appended once this many refreshes happened since `read_code`.
    pending_link: Arc<RwLock<Option<(u32, DeviceEntry)>>>,
    lists_since_code: Arc<AtomicU32>,
    list_calls: Arc<AtomicU32>,
    answers: Arc<RwLock<Vec<i64>>>,
    methods: Arc<RwLock<Vec<ConnectionMethod>>>,
    toggles: Arc<RwLock<Vec<ControlToggle>>>,
    next_error: Arc<RwLock<Option<ConsoleError>>>,
    released: Arc<RwLock<bool>>,
    release_calls: Arc<AtomicU32>,
}

impl Default for MockConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConsole {
    /// Create a console that accepts any login and renders no code.
    pub fn new() -> Self {
        Self {
            challenge: Arc::new(RwLock::new("12 + 7 = ?".to_string())),
            landing: Arc::new(RwLock::new("/".to_string())),
            code: Arc::new(RwLock::new(None)),
            hang_on_code: Arc::new(AtomicBool::new(false)),
            devices: Arc::new(RwLock::new(Vec::new())),
            pending_link: Arc::new(RwLock::new(None)),
            lists_since_code: Arc::new(AtomicU32::new(0)),
            list_calls: Arc::new(AtomicU32::new(0)),
            answers: Arc::new(RwLock::new(Vec::new())),
            methods: Arc::new(RwLock::new(Vec::new())),
            toggles: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            released: Arc::new(RwLock::new(false)),
            release_calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub async fn set_challenge(&self, text: &str) {
        *self.challenge.write().await = text.to_string();
    }

    /// Location reported after login.
    pub async fn set_landing(&self, location: &str) {
        *self.landing.write().await = location.to_string();
    }

    pub async fn set_code(&self, code: CodePayload) {
        *self.code.write().await = Some(code);
    }

    /// Make `read_code` wait forever, like a page whose code never renders.
    pub fn hang_on_read_code(&self) {
        self.hang_on_code.store(true, Ordering::SeqCst);
    }

    pub async fn set_devices(&self, devices: Vec<DeviceEntry>) {
        *self.devices.write().await = devices;
    }

    /// Make `device` appear from the `attempt`-th refresh after the code was read.
    pub async fn link_on_poll(&self, attempt: u32, device: DeviceEntry) {
        *self.pending_link.write().await = Some((attempt, device));
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ConsoleError) {
        *self.next_error.write().await = Some(error);
    }

    /// Total device list refreshes.
    pub async fn list_count(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub async fn submitted_answers(&self) -> Vec<i64> {
        self.answers.read().await.clone()
    }

    pub async fn selected_methods(&self) -> Vec<ConnectionMethod> {
        self.methods.read().await.clone()
    }

    pub async fn recorded_toggles(&self) -> Vec<ControlToggle> {
        self.toggles.read().await.clone()
    }

    pub async fn is_released(&self) -> bool {
        *self.released.read().await
    }

    pub fn release_count(&self) -> u32 {
        self.release_calls.load(Ordering::SeqCst)
    }

    async fn check(&self) -> Result<(), ConsoleError> {
        if *self.released.read().await {
            return Err(ConsoleError::Released);
        }
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl ConsoleSession for MockConsole {
    async fn fetch_challenge(&self) -> Result<String, ConsoleError> {
        self.check().await?;
        Ok(format!("<label>{}</label>", self.challenge.read().await))
    }

    async fn submit_login(
        &self,
        _credentials: &ConsoleCredentials,
        answer: i64,
    ) -> Result<LoginOutcome, ConsoleError> {
        self.check().await?;
        self.answers.write().await.push(answer);
        Ok(LoginOutcome {
            location: self.landing.read().await.clone(),
        })
    }

    async fn select_method(&self, method: &ConnectionMethod) -> Result<(), ConsoleError> {
        self.check().await?;
        self.methods.write().await.push(method.clone());
        Ok(())
    }

    async fn read_code(&self) -> Result<CodePayload, ConsoleError> {
        self.check().await?;
        if self.hang_on_code.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.lists_since_code.store(0, Ordering::SeqCst);
        self.code.read().await.clone().ok_or(ConsoleError::Timeout)
    }

    async fn list_devices(&self) -> Result<Vec<DeviceEntry>, ConsoleError> {
        if *self.released.read().await {
            return Err(ConsoleError::Released);
        }
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let seen = self.lists_since_code.fetch_add(1, Ordering::SeqCst) + 1;
        self.check().await?;

        let mut devices = self.devices.read().await.clone();
        if let Some((attempt, device)) = self.pending_link.read().await.as_ref() {
            if seen >= *attempt {
                devices.push(device.clone());
            }
        }
        Ok(devices)
    }

    async fn toggle_control(&self, toggle: &ControlToggle) -> Result<(), ConsoleError> {
        self.check().await?;
        self.toggles.write().await.push(toggle.clone());
        Ok(())
    }

    async fn release(&self) -> Result<(), ConsoleError> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        let mut released = self.released.write().await;
        if *released {
            return Err(ConsoleError::Released);
        }
        *released = true;
        Ok(())
    }
}

/// Mock connector handing out sessions backed by one [`MockConsole`].
#[derive(Debug, Clone, Default)]
pub struct MockConsoleConnector {
    console: MockConsole,
    opened: Arc<AtomicU32>,
    fail_open: Arc<RwLock<Option<ConsoleError>>>,
}

impl MockConsoleConnector {
    pub fn new(console: MockConsole) -> Self {
        Self {
            console,
            opened: Arc::new(AtomicU32::new(0)),
            fail_open: Arc::new(RwLock::new(None)),
        }
    }

    pub fn console(&self) -> &MockConsole {
        &self.console
    }

    /// Number of sessions opened so far.
    pub fn sessions_opened(&self) -> u32 {
        self.opened.load(Ordering::SeqCst)
    }

    /// Fail the next `open` with the given error.
    pub async fn set_open_error(&self, error: ConsoleError) {
        *self.fail_open.write().await = Some(error);
    }
}

#[async_trait]
impl ConsoleConnector for MockConsoleConnector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open(&self) -> Result<Box<dyn ConsoleSession>, ConsoleError> {
        if let Some(error) = self.fail_open.write().await.take() {
            return Err(error);
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.console.clone()))
    }
}
