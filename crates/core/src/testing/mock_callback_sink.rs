//! Mock callback sink for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::callback::{CallbackError, CallbackMessage, CallbackSink, SyncReport};

/// Records every message instead of posting it.
///
/// # Example
///
/// ```rust,ignore
/// use gatelink_core::testing::MockCallbackSink;
///
/// let sink = MockCallbackSink::new();
/// // ... run a job ...
/// let kinds = sink.kinds().await;
/// assert_eq!(kinds, vec!["qr_ready", "connected"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockCallbackSink {
    messages: Arc<RwLock<Vec<CallbackMessage>>>,
    reports: Arc<RwLock<Vec<SyncReport>>>,
    /// When set, every delivery fails (the message is still recorded).
    failing: Arc<RwLock<bool>>,
}

impl MockCallbackSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all delivered messages, in order.
    pub async fn messages(&self) -> Vec<CallbackMessage> {
        self.messages.read().await.clone()
    }

    /// Wire type of each delivered message, in order.
    pub async fn kinds(&self) -> Vec<&'static str> {
        self.messages.read().await.iter().map(|m| m.kind()).collect()
    }

    pub async fn sync_reports(&self) -> Vec<SyncReport> {
        self.reports.read().await.clone()
    }

    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    async fn outcome(&self) -> Result<(), CallbackError> {
        if *self.failing.read().await {
            Err(CallbackError::Unreachable("mock sink failing".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CallbackSink for MockCallbackSink {
    async fn deliver(&self, message: &CallbackMessage) -> Result<(), CallbackError> {
        self.messages.write().await.push(message.clone());
        self.outcome().await
    }

    async fn deliver_sync(&self, report: &SyncReport) -> Result<(), CallbackError> {
        self.reports.write().await.push(report.clone());
        self.outcome().await
    }
}
