//! Types for the automation worker.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::console::{ConnectionMethod, ConsoleError, ControlKind};
use crate::correlation::CorrelationId;
use crate::poller::LinkedAccount;

/// Errors that end a job.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Login failed or did not land where expected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Job parameters or console content did not pass validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A bounded wait ran out.
    #[error("timed out waiting for {stage}: {detail}")]
    Timeout { stage: WaitStage, detail: String },

    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// The browser session could not be opened.
    #[error("session could not be opened: {0}")]
    Session(String),

    #[error("console error: {0}")]
    Console(ConsoleError),

    /// A report could not be handed to the front end.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// The bounded wait behind a [`WorkerError::Timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStage {
    /// One console request.
    Request,
    /// The code artifact rendering after the method was selected.
    Code,
    /// The device linking after the code was reported.
    Link,
}

impl fmt::Display for WaitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WaitStage::Request => "console request",
            WaitStage::Code => "code",
            WaitStage::Link => "device link",
        })
    }
}

impl From<ConsoleError> for WorkerError {
    fn from(e: ConsoleError) -> Self {
        match e {
            ConsoleError::Timeout => {
                WorkerError::timeout(WaitStage::Request, "console request timed out")
            }
            ConsoleError::LoginRejected(reason) => WorkerError::Authentication(reason),
            other => WorkerError::Console(other),
        }
    }
}

impl WorkerError {
    pub fn timeout(stage: WaitStage, detail: impl Into<String>) -> Self {
        WorkerError::Timeout {
            stage,
            detail: detail.into(),
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkerError::Authentication(_) => 2,
            WorkerError::Validation(_) => 3,
            WorkerError::Timeout { .. } => 4,
            WorkerError::UnknownAction(_) => 5,
            WorkerError::Session(_) => 6,
            WorkerError::Console(_) => 7,
            WorkerError::Delivery(_) => 8,
        }
    }

    /// Text shown to the human in the error callback.
    pub fn user_message(&self) -> String {
        match self {
            WorkerError::Authentication(_) => {
                "Could not log in to the console. Please try again later.".to_string()
            }
            WorkerError::Validation(reason) => reason.clone(),
            WorkerError::Timeout { stage, .. } => match stage {
                WaitStage::Code => {
                    "The console did not show a code in time. Please try again.".to_string()
                }
                WaitStage::Link => {
                    "The device was not linked in time. Please request a new code.".to_string()
                }
                WaitStage::Request => {
                    "The console did not respond in time. Please try again later.".to_string()
                }
            },
            WorkerError::UnknownAction(action) => format!("Unknown action: {action}"),
            WorkerError::Session(_) | WorkerError::Console(_) | WorkerError::Delivery(_) => {
                "The console could not complete the request. Please try again later.".to_string()
            }
        }
    }
}

/// Raw job parameters as handed over by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub action: String,
    pub correlation_id: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub target_account_id: Option<String>,
    #[serde(default)]
    pub control_value: Option<String>,
}

/// Action names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    GetQr,
    GetPairingCode,
    SetMode,
    SetBlasting,
    SyncDevices,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::GetQr => "get_qr",
            ActionKind::GetPairingCode => "get_pairing_code",
            ActionKind::SetMode => "set_mode",
            ActionKind::SetBlasting => "set_blasting",
            ActionKind::SyncDevices => "sync_devices",
        }
    }
}

impl FromStr for ActionKind {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "get_qr" | "qr" => Ok(ActionKind::GetQr),
            "get_pairing_code" | "pairing" => Ok(ActionKind::GetPairingCode),
            "set_mode" => Ok(ActionKind::SetMode),
            "set_blasting" => Ok(ActionKind::SetBlasting),
            "sync_devices" | "sync" => Ok(ActionKind::SyncDevices),
            other => Err(WorkerError::UnknownAction(other.to_string())),
        }
    }
}

/// What a validated job does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobAction {
    /// Obtain a connection code and wait for the device to link.
    GetCode(ConnectionMethod),
    /// Set a control on one linked device.
    SetControl {
        control: ControlKind,
        target_account_id: String,
        value: String,
    },
    /// Report every device to the sync endpoint.
    SyncDevices,
}

/// A validated, immutable job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationJob {
    pub kind: ActionKind,
    pub action: JobAction,
    pub correlation_id: CorrelationId,
    pub owner_id: Option<String>,
    /// Phone number to match while polling (QR jobs may also carry one).
    pub phone_number: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

impl AutomationJob {
    /// Validate raw parameters. Runs before any session is opened.
    pub fn from_request(request: &JobRequest) -> Result<Self, WorkerError> {
        let correlation_id = CorrelationId::parse(&request.correlation_id)
            .map_err(|e| WorkerError::Validation(format!("invalid correlation id: {e}")))?;
        let kind: ActionKind = request.action.parse()?;
        let phone_number = non_empty(&request.phone_number);

        let action = match kind {
            ActionKind::GetQr => JobAction::GetCode(ConnectionMethod::Qr),
            ActionKind::GetPairingCode => {
                let phone_number = phone_number.clone().ok_or_else(|| {
                    WorkerError::Validation(
                        "A phone number is required for pairing code linking.".to_string(),
                    )
                })?;
                JobAction::GetCode(ConnectionMethod::Pairing { phone_number })
            }
            ActionKind::SetMode | ActionKind::SetBlasting => {
                let target_account_id = non_empty(&request.target_account_id).ok_or_else(|| {
                    WorkerError::Validation("A target account id is required.".to_string())
                })?;
                let value = non_empty(&request.control_value).ok_or_else(|| {
                    WorkerError::Validation("A control value is required.".to_string())
                })?;
                let control = if kind == ActionKind::SetMode {
                    ControlKind::Mode
                } else {
                    ControlKind::Blasting
                };
                JobAction::SetControl {
                    control,
                    target_account_id,
                    value,
                }
            }
            ActionKind::SyncDevices => JobAction::SyncDevices,
        };

        Ok(Self {
            kind,
            action,
            correlation_id,
            owner_id: non_empty(&request.owner_id),
            phone_number,
        })
    }
}

/// Where a job is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Init,
    Authenticating,
    NavigatingToConsole,
    SelectingMethod,
    AwaitingCode,
    CodeEmitted,
    PollingConnection,
    ApplyingControl,
    Syncing,
    Connected,
    Completed,
    TimedOut,
    Failed,
}

impl WorkerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkerState::Connected
                | WorkerState::Completed
                | WorkerState::TimedOut
                | WorkerState::Failed
        )
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Init => "init",
            WorkerState::Authenticating => "authenticating",
            WorkerState::NavigatingToConsole => "navigating_to_console",
            WorkerState::SelectingMethod => "selecting_method",
            WorkerState::AwaitingCode => "awaiting_code",
            WorkerState::CodeEmitted => "code_emitted",
            WorkerState::PollingConnection => "polling_connection",
            WorkerState::ApplyingControl => "applying_control",
            WorkerState::Syncing => "syncing",
            WorkerState::Connected => "connected",
            WorkerState::Completed => "completed",
            WorkerState::TimedOut => "timed_out",
            WorkerState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How a job ended.
#[derive(Debug)]
pub enum JobOutcome {
    /// Device linked and reported.
    Linked(LinkedAccount),
    /// Code reported; link polling was not requested.
    CodeEmitted,
    /// Control applied.
    Managed,
    /// Device list reported.
    Synced { devices: usize },
    Failed(WorkerError),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, JobOutcome::Failed(_))
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            JobOutcome::Failed(e) => e.exit_code(),
            _ => 0,
        }
    }

    /// Label used in metrics.
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Linked(_) => "linked",
            JobOutcome::CodeEmitted => "code_emitted",
            JobOutcome::Managed => "managed",
            JobOutcome::Synced { .. } => "synced",
            JobOutcome::Failed(_) => "failed",
        }
    }

    /// Terminal state this outcome corresponds to.
    pub fn state(&self) -> WorkerState {
        match self {
            JobOutcome::Linked(_) => WorkerState::Connected,
            JobOutcome::CodeEmitted | JobOutcome::Managed | JobOutcome::Synced { .. } => {
                WorkerState::Completed
            }
            JobOutcome::Failed(WorkerError::Timeout { .. }) => WorkerState::TimedOut,
            JobOutcome::Failed(_) => WorkerState::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(action: &str) -> JobRequest {
        JobRequest {
            action: action.to_string(),
            correlation_id: "sess_1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_qr_job() {
        let job = AutomationJob::from_request(&request("get_qr")).unwrap();
        assert_eq!(job.action, JobAction::GetCode(ConnectionMethod::Qr));
        assert_eq!(job.kind.as_str(), "get_qr");
    }

    #[test]
    fn test_pairing_requires_phone() {
        let err = AutomationJob::from_request(&request("get_pairing_code")).unwrap_err();
        assert!(matches!(err, WorkerError::Validation(_)));
        assert_eq!(err.exit_code(), 3);

        let mut req = request("get_pairing_code");
        req.phone_number = Some("   ".to_string());
        assert!(AutomationJob::from_request(&req).is_err());

        req.phone_number = Some("6281234567890".to_string());
        let job = AutomationJob::from_request(&req).unwrap();
        assert_eq!(
            job.action,
            JobAction::GetCode(ConnectionMethod::Pairing {
                phone_number: "6281234567890".to_string()
            })
        );
    }

    #[test]
    fn test_control_requires_target_and_value() {
        let mut req = request("set_blasting");
        req.target_account_id = Some("101".to_string());
        assert!(AutomationJob::from_request(&req).is_err());

        req.control_value = Some("on".to_string());
        let job = AutomationJob::from_request(&req).unwrap();
        assert_eq!(
            job.action,
            JobAction::SetControl {
                control: ControlKind::Blasting,
                target_account_id: "101".to_string(),
                value: "on".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_action() {
        let err = AutomationJob::from_request(&request("self_destruct")).unwrap_err();
        assert!(matches!(err, WorkerError::UnknownAction(ref a) if a == "self_destruct"));
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_bad_correlation_id() {
        let mut req = request("get_qr");
        req.correlation_id = "../x".to_string();
        assert!(matches!(
            AutomationJob::from_request(&req),
            Err(WorkerError::Validation(_))
        ));
    }

    #[test]
    fn test_console_error_mapping() {
        assert!(matches!(
            WorkerError::from(ConsoleError::Timeout),
            WorkerError::Timeout {
                stage: WaitStage::Request,
                ..
            }
        ));
        assert!(matches!(
            WorkerError::from(ConsoleError::LoginRejected("bad".into())),
            WorkerError::Authentication(_)
        ));
        assert!(matches!(
            WorkerError::from(ConsoleError::Released),
            WorkerError::Console(_)
        ));
    }

    #[test]
    fn test_outcome_states() {
        assert_eq!(JobOutcome::CodeEmitted.exit_code(), 0);
        assert_eq!(
            JobOutcome::Failed(WorkerError::timeout(WaitStage::Link, "x")).state(),
            WorkerState::TimedOut
        );
        assert!(WorkerState::TimedOut.is_terminal());
        assert!(!WorkerState::PollingConnection.is_terminal());
        assert_eq!(WorkerState::NavigatingToConsole.to_string(), "navigating_to_console");
    }

    #[test]
    fn test_timeout_messages_name_the_wait() {
        let code = WorkerError::timeout(WaitStage::Code, "code did not render within 30s");
        let link = WorkerError::timeout(WaitStage::Link, "device not linked after 45 checks");
        let request = WorkerError::from(ConsoleError::Timeout);

        assert_eq!(
            code.user_message(),
            "The console did not show a code in time. Please try again."
        );
        assert_eq!(
            link.user_message(),
            "The device was not linked in time. Please request a new code."
        );
        assert_ne!(request.user_message(), link.user_message());
        assert_ne!(request.user_message(), code.user_message());

        for e in [&code, &link, &request] {
            assert_eq!(e.exit_code(), 4);
        }
        assert_eq!(
            code.to_string(),
            "timed out waiting for code: code did not render within 30s"
        );
    }
}
