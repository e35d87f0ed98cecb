//! Types for console operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while driving the console.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Login rejected: {0}")]
    LoginRejected(String),

    #[error("Unexpected page: {0}")]
    UnexpectedPage(String),

    #[error("Console refused the request: {0}")]
    Rejected(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Session already released")]
    Released,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ConsoleError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ConsoleError::Timeout
        } else if e.is_connect() {
            ConsoleError::ConnectionFailed(e.to_string())
        } else {
            ConsoleError::Internal(e.to_string())
        }
    }
}

/// Login credentials for the console operator account.
#[derive(Clone)]
pub struct ConsoleCredentials {
    pub username: String,
    pub password: String,
}

impl ConsoleCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for ConsoleCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where the console left us after a login submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// Final URL after redirects.
    pub location: String,
}

/// How the end user links their phone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ConnectionMethod {
    /// Scan a QR code (default).
    Qr,
    /// Type a pairing code on the phone registered under `phone_number`.
    Pairing { phone_number: String },
}

impl ConnectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionMethod::Qr => "qr",
            ConnectionMethod::Pairing { .. } => "pairing",
        }
    }
}

/// The code artifact shown to the human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CodePayload {
    /// QR image, usually a `data:image/png;base64,...` URL.
    Qr { image: String },
    /// Pairing code, formatted for display.
    Pairing { code: String },
}

impl CodePayload {
    /// Build a pairing payload; 8-character codes are shown as `ABCD-EFGH`.
    pub fn pairing(raw: &str) -> Self {
        let raw = raw.trim();
        let code = if raw.chars().count() == 8 && raw.is_ascii() {
            format!("{}-{}", &raw[..4], &raw[4..])
        } else {
            raw.to_string()
        };
        CodePayload::Pairing { code }
    }
}

/// Link status of a device entry as reported by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Pending,
    Connected,
    Suspended,
    Disconnected,
}

impl ConnectionStatus {
    /// Map a console status label.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "terhubung" | "connected" => ConnectionStatus::Connected,
            "suspend" | "suspended" => ConnectionStatus::Suspended,
            "terputus" | "disconnected" => ConnectionStatus::Disconnected,
            _ => ConnectionStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Suspended => "suspended",
            ConnectionStatus::Disconnected => "disconnected",
        }
    }
}

/// One entry of the console's device list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Console-assigned account id.
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub status: ConnectionStatus,
    /// Messages sent through this device, when the console shows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_count: Option<u64>,
}

/// A control on a device entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Mode,
    Blasting,
}

impl ControlKind {
    /// Field name the console expects.
    pub fn field(&self) -> &'static str {
        match self {
            ControlKind::Mode => "mode",
            ControlKind::Blasting => "blasting",
        }
    }
}

/// Request to set a control on one device entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlToggle {
    pub external_id: String,
    pub control: ControlKind,
    pub value: String,
}

/// Compare phone numbers by their digits only.
pub fn same_phone(a: &str, b: &str) -> bool {
    let digits = |s: &str| s.chars().filter(|c| c.is_ascii_digit()).collect::<String>();
    let (a, b) = (digits(a), digits(b));
    !a.is_empty() && a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(ConnectionStatus::from_label("Terhubung"), ConnectionStatus::Connected);
        assert_eq!(ConnectionStatus::from_label(" Connected "), ConnectionStatus::Connected);
        assert_eq!(ConnectionStatus::from_label("Suspend"), ConnectionStatus::Suspended);
        assert_eq!(ConnectionStatus::from_label("Terputus"), ConnectionStatus::Disconnected);
        assert_eq!(ConnectionStatus::from_label("Menunggu"), ConnectionStatus::Pending);
    }

    #[test]
    fn test_pairing_code_formatting() {
        assert_eq!(
            CodePayload::pairing("ABCD1234"),
            CodePayload::Pairing {
                code: "ABCD-1234".to_string()
            }
        );
        assert_eq!(
            CodePayload::pairing("XYZ"),
            CodePayload::Pairing {
                code: "XYZ".to_string()
            }
        );
    }

    #[test]
    fn test_same_phone() {
        assert!(same_phone("+62 812-3456-7890", "6281234567890"));
        assert!(!same_phone("6281234567890", "6281234567891"));
        assert!(!same_phone("", ""));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = ConsoleCredentials::new("operator", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("operator"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_connection_method_serde() {
        let method: ConnectionMethod =
            serde_json::from_str(r#"{"method":"pairing","phone_number":"628123"}"#).unwrap();
        assert_eq!(
            method,
            ConnectionMethod::Pairing {
                phone_number: "628123".to_string()
            }
        );
        assert_eq!(method.as_str(), "pairing");
    }
}
