//! Worker-side delivery of callback messages.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::CallbackTargetConfig;

use super::{CallbackError, CallbackMessage, SignedPayload, SyncReport};

/// Destination for a job's messages.
#[async_trait]
pub trait CallbackSink: Send + Sync {
    async fn deliver(&self, message: &CallbackMessage) -> Result<(), CallbackError>;

    async fn deliver_sync(&self, report: &SyncReport) -> Result<(), CallbackError>;
}

/// Posts signed JSON to the callback gateway.
pub struct HttpCallbackSink {
    client: Client,
    config: CallbackTargetConfig,
    secret: String,
}

impl HttpCallbackSink {
    pub fn new(config: CallbackTargetConfig, secret: String) -> Result<Self, CallbackError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| CallbackError::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            config,
            secret,
        })
    }

    async fn post<T: Serialize + Sync>(&self, url: &str, payload: &T) -> Result<(), CallbackError> {
        let signed = SignedPayload {
            secret: &self.secret,
            payload,
        };
        let body =
            serde_json::to_vec(&signed).map_err(|e| CallbackError::Encoding(e.to_string()))?;

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallbackError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CallbackSink for HttpCallbackSink {
    async fn deliver(&self, message: &CallbackMessage) -> Result<(), CallbackError> {
        self.post(&self.config.url, message).await?;
        debug!(
            correlation_id = %message.correlation_id,
            kind = message.kind(),
            "Callback delivered"
        );
        Ok(())
    }

    async fn deliver_sync(&self, report: &SyncReport) -> Result<(), CallbackError> {
        let Some(url) = self.config.sync_url.as_deref() else {
            warn!("No sync_url configured, dropping sync report");
            return Ok(());
        };
        self.post(url, report).await?;
        debug!(devices = report.devices.len(), "Sync report delivered");
        Ok(())
    }
}
