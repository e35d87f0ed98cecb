//! Callback wire types shared by the worker and the gateway.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::console::{CodePayload, ConnectionStatus, DeviceEntry};
use crate::correlation::CorrelationId;

/// User-facing text delivered when a link succeeded but could not be saved.
pub const PERSISTENCE_FAILURE_NOTICE: &str =
    "The number was linked, but saving the account failed. Please contact support.";

/// Errors raised while delivering callbacks.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("Callback endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("Callback rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Callback request timeout")]
    Timeout,

    #[error("Failed to encode callback: {0}")]
    Encoding(String),
}

impl From<reqwest::Error> for CallbackError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CallbackError::Timeout
        } else {
            CallbackError::Unreachable(e.to_string())
        }
    }
}

/// Coarse outcome carried by every message and by poll replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Success,
    Error,
    Pending,
}

/// Type-specific part of a callback message, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    QrReady {
        image: String,
    },
    PairingReady {
        code: String,
    },
    Connected {
        #[serde(rename = "phoneNumber")]
        phone_number: String,
        #[serde(rename = "externalAccountId")]
        external_account_id: String,
    },
    ManagementOk {
        message: String,
    },
    Error {
        message: String,
    },
}

/// One message from a job to the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackMessage {
    pub status: MessageStatus,
    #[serde(rename = "correlationId")]
    pub correlation_id: CorrelationId,
    /// Front-end user the job runs for.
    #[serde(rename = "ownerId", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl CallbackMessage {
    fn new(correlation_id: CorrelationId, owner_id: Option<String>, body: MessageBody) -> Self {
        let status = match body {
            MessageBody::Error { .. } => MessageStatus::Error,
            _ => MessageStatus::Success,
        };
        Self {
            status,
            correlation_id,
            owner_id,
            body,
        }
    }

    /// `qr_ready` or `pairing_ready`, depending on the payload.
    pub fn code_ready(
        correlation_id: CorrelationId,
        owner_id: Option<String>,
        payload: &CodePayload,
    ) -> Self {
        let body = match payload {
            CodePayload::Qr { image } => MessageBody::QrReady {
                image: image.clone(),
            },
            CodePayload::Pairing { code } => MessageBody::PairingReady { code: code.clone() },
        };
        Self::new(correlation_id, owner_id, body)
    }

    pub fn connected(
        correlation_id: CorrelationId,
        owner_id: Option<String>,
        phone_number: impl Into<String>,
        external_account_id: impl Into<String>,
    ) -> Self {
        Self::new(
            correlation_id,
            owner_id,
            MessageBody::Connected {
                phone_number: phone_number.into(),
                external_account_id: external_account_id.into(),
            },
        )
    }

    pub fn management_ok(
        correlation_id: CorrelationId,
        owner_id: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            correlation_id,
            owner_id,
            MessageBody::ManagementOk {
                message: message.into(),
            },
        )
    }

    pub fn error(
        correlation_id: CorrelationId,
        owner_id: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            correlation_id,
            owner_id,
            MessageBody::Error {
                message: message.into(),
            },
        )
    }

    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self.body {
            MessageBody::QrReady { .. } => "qr_ready",
            MessageBody::PairingReady { .. } => "pairing_ready",
            MessageBody::Connected { .. } => "connected",
            MessageBody::ManagementOk { .. } => "management_ok",
            MessageBody::Error { .. } => "error",
        }
    }
}

/// Standardized device status in a sync report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncedStatus {
    Active,
    Suspended,
    Inactive,
}

impl From<ConnectionStatus> for SyncedStatus {
    fn from(status: ConnectionStatus) -> Self {
        match status {
            ConnectionStatus::Connected => SyncedStatus::Active,
            ConnectionStatus::Suspended => SyncedStatus::Suspended,
            ConnectionStatus::Pending | ConnectionStatus::Disconnected => SyncedStatus::Inactive,
        }
    }
}

impl SyncedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncedStatus::Active => "active",
            SyncedStatus::Suspended => "suspended",
            SyncedStatus::Inactive => "inactive",
        }
    }
}

/// One console device in a sync report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedDevice {
    #[serde(rename = "externalAccountId")]
    pub external_account_id: String,
    #[serde(rename = "sentCount")]
    pub sent_count: u64,
    pub status: SyncedStatus,
}

/// Snapshot of every device the console lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub devices: Vec<SyncedDevice>,
}

impl SyncReport {
    /// Devices without a sent counter are reported with zero.
    pub fn from_devices(devices: &[DeviceEntry]) -> Self {
        Self {
            devices: devices
                .iter()
                .map(|d| SyncedDevice {
                    external_account_id: d.external_id.clone(),
                    sent_count: d.sent_count.unwrap_or(0),
                    status: d.status.into(),
                })
                .collect(),
        }
    }
}

/// Payload plus the shared secret, as posted by the worker.
#[derive(Debug, Serialize)]
pub struct SignedPayload<'a, T: Serialize> {
    pub secret: &'a str,
    #[serde(flatten)]
    pub payload: &'a T,
}
