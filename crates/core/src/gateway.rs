//! Callback Gateway: authenticated ingestion of worker messages and the
//! read-once status poll served to the front end.
//!
//! HTTP framing lives in the server crate; this module decides what is
//! accepted, what is stored, and which status code a failure maps to.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::accounts::{AccountStore, NewAccount, PersistenceError};
use crate::auth::secrets_match;
use crate::callback::{
    CallbackMessage, MessageBody, MessageStatus, SyncReport, PERSISTENCE_FAILURE_NOTICE,
};
use crate::correlation::CorrelationId;
use crate::exchange::{ExchangeError, StatusExchange};
use crate::metrics;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Validation(String),

    #[error("Status exchange failure: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Account store failure: {0}")]
    Persistence(#[from] PersistenceError),
}

impl GatewayError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Authentication(_) => 403,
            GatewayError::Validation(_) => 400,
            GatewayError::Exchange(_) | GatewayError::Persistence(_) => 500,
        }
    }

    /// Message safe to show to the caller.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::Authentication(m) | GatewayError::Validation(m) => m.clone(),
            GatewayError::Exchange(_) | GatewayError::Persistence(_) => {
                "Internal storage error".to_string()
            }
        }
    }
}

/// Reply to a status poll: the stored message, or "pending".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatusReply {
    Message(CallbackMessage),
    Pending { status: MessageStatus },
}

impl StatusReply {
    pub fn pending() -> Self {
        StatusReply::Pending {
            status: MessageStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, StatusReply::Pending { .. })
    }
}

/// Ingests worker callbacks into the status exchange.
pub struct CallbackGateway {
    secret: String,
    exchange: Arc<dyn StatusExchange>,
    accounts: Arc<dyn AccountStore>,
}

impl CallbackGateway {
    pub fn new(
        secret: impl Into<String>,
        exchange: Arc<dyn StatusExchange>,
        accounts: Arc<dyn AccountStore>,
    ) -> Self {
        Self {
            secret: secret.into(),
            exchange,
            accounts,
        }
    }

    /// Parse the body and check the shared secret.
    fn authenticate(&self, raw: &[u8]) -> Result<Value, GatewayError> {
        let mut value: Value = serde_json::from_slice(raw)
            .map_err(|_| GatewayError::Authentication("Malformed request body".to_string()))?;

        let Some(object) = value.as_object_mut() else {
            return Err(GatewayError::Authentication(
                "Malformed request body".to_string(),
            ));
        };

        let provided = object.remove("secret");
        let authorized = provided
            .as_ref()
            .and_then(Value::as_str)
            .is_some_and(|s| secrets_match(s, &self.secret));
        if !authorized {
            return Err(GatewayError::Authentication("Invalid secret".to_string()));
        }
        Ok(value)
    }

    /// Accept one callback message.
    ///
    /// Returns the message as stored. A `connected` message whose account
    /// could not be persisted is stored as a generic error instead; the
    /// caller still sees success.
    pub fn receive_callback(&self, raw: &[u8]) -> Result<CallbackMessage, GatewayError> {
        let result = self.ingest(raw);
        if let Err(e) = &result {
            metrics::CALLBACKS_RECEIVED
                .with_label_values(&["unknown", "rejected"])
                .inc();
            warn!(error = %e, "Callback rejected");
        }
        result
    }

    fn ingest(&self, raw: &[u8]) -> Result<CallbackMessage, GatewayError> {
        let value = self.authenticate(raw)?;

        let raw_id = value
            .get("correlationId")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GatewayError::Authentication("Missing correlationId".to_string()))?;
        let id = CorrelationId::parse(raw_id)
            .map_err(|e| GatewayError::Validation(format!("Invalid correlationId: {e}")))?;

        let message: CallbackMessage = serde_json::from_value(value)
            .map_err(|e| GatewayError::Validation(format!("Invalid message: {e}")))?;

        let kind = message.kind();
        let (stored, result) = match &message.body {
            MessageBody::Connected {
                phone_number,
                external_account_id,
            } => {
                let account = NewAccount {
                    owner_id: message.owner_id.clone(),
                    phone_number: phone_number.clone(),
                    external_account_id: external_account_id.clone(),
                };
                match self.accounts.create(&account) {
                    Ok(_) => {
                        metrics::ACCOUNT_WRITES
                            .with_label_values(&["create", "ok"])
                            .inc();
                        info!(
                            correlation_id = %id,
                            external_account_id = %external_account_id,
                            "Account record created"
                        );
                        (message, "accepted")
                    }
                    Err(e) => {
                        metrics::ACCOUNT_WRITES
                            .with_label_values(&["create", "failed"])
                            .inc();
                        error!(
                            correlation_id = %id,
                            external_account_id = %external_account_id,
                            error = %e,
                            "Failed to persist linked account"
                        );
                        let substitute = CallbackMessage::error(
                            id.clone(),
                            message.owner_id.clone(),
                            PERSISTENCE_FAILURE_NOTICE,
                        );
                        (substitute, "substituted")
                    }
                }
            }
            _ => (message, "accepted"),
        };

        self.exchange.put(&id, &stored)?;
        metrics::CALLBACKS_RECEIVED
            .with_label_values(&[kind, result])
            .inc();
        debug!(correlation_id = %id, kind, result, "Callback stored");
        Ok(stored)
    }

    /// Apply a device sync report. Returns the number of records updated.
    pub fn receive_sync(&self, raw: &[u8]) -> Result<usize, GatewayError> {
        let value = self.authenticate(raw)?;
        let report: SyncReport = serde_json::from_value(value)
            .map_err(|e| GatewayError::Validation(format!("Invalid sync report: {e}")))?;

        match self.accounts.apply_sync(&report.devices) {
            Ok(updated) => {
                metrics::ACCOUNT_WRITES
                    .with_label_values(&["sync", "ok"])
                    .inc();
                info!(
                    devices = report.devices.len(),
                    updated, "Device sync applied"
                );
                Ok(updated)
            }
            Err(e) => {
                metrics::ACCOUNT_WRITES
                    .with_label_values(&["sync", "failed"])
                    .inc();
                error!(error = %e, "Failed to apply device sync");
                Err(e.into())
            }
        }
    }

    /// Read-once status poll. Caller authentication happens before this.
    pub fn poll_status(&self, raw_id: &str) -> Result<StatusReply, GatewayError> {
        let id = CorrelationId::parse(raw_id).map_err(|e| {
            metrics::STATUS_POLLS.with_label_values(&["invalid"]).inc();
            GatewayError::Validation(format!("Invalid correlationId: {e}"))
        })?;

        match self.exchange.get_and_delete(&id) {
            Ok(Some(message)) => {
                metrics::STATUS_POLLS.with_label_values(&["delivered"]).inc();
                debug!(correlation_id = %id, kind = message.kind(), "Status delivered");
                Ok(StatusReply::Message(message))
            }
            Ok(None) => {
                metrics::STATUS_POLLS.with_label_values(&["pending"]).inc();
                Ok(StatusReply::pending())
            }
            Err(e) => {
                metrics::STATUS_POLLS.with_label_values(&["error"]).inc();
                error!(correlation_id = %id, error = %e, "Status exchange read failed");
                Err(e.into())
            }
        }
    }
}
