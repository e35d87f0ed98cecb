//! The automation worker: one job, one browser session, start to finish.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::{
    AutomationJob, JobAction, JobOutcome, JobRequest, WaitStage, WorkerError, WorkerState,
};
use crate::callback::{CallbackMessage, CallbackSink, SyncReport};
use crate::challenge;
use crate::config::WorkerConfig;
use crate::console::{
    ConnectionMethod, ConnectionStatus, ConsoleConnector, ConsoleCredentials, ConsoleSession,
    ControlKind, ControlToggle,
};
use crate::correlation::CorrelationId;
use crate::metrics;
use crate::poller::{ConnectionPoller, LinkTarget};
use crate::retry::RetryError;

/// Drives the console through one job and reports the result.
pub struct AutomationWorker {
    config: WorkerConfig,
    credentials: ConsoleCredentials,
    connector: Arc<dyn ConsoleConnector>,
    sink: Arc<dyn CallbackSink>,
    poller: ConnectionPoller,
}

impl AutomationWorker {
    pub fn new(
        config: WorkerConfig,
        credentials: ConsoleCredentials,
        connector: Arc<dyn ConsoleConnector>,
        sink: Arc<dyn CallbackSink>,
    ) -> Self {
        let poller = ConnectionPoller::new(config.job.link_poll.clone());
        Self {
            config,
            credentials,
            connector,
            sink,
            poller,
        }
    }

    /// Run one job to completion.
    ///
    /// Every failure produces exactly one `error` callback (when the
    /// correlation id is usable). The session, once opened, is released on
    /// every path.
    pub async fn run(&self, request: &JobRequest) -> JobOutcome {
        let started = Instant::now();
        // Only known action names become metric labels
        let mut action = "unknown";

        let outcome = match AutomationJob::from_request(request) {
            Ok(job) => {
                action = job.kind.as_str();
                self.run_job(&job).await
            }
            Err(e) => {
                warn!(
                    action = %request.action.trim(),
                    error = %e,
                    "Job rejected before opening a session"
                );
                self.report_failure(
                    CorrelationId::parse(&request.correlation_id).ok(),
                    request.owner_id.clone(),
                    &e,
                )
                .await;
                JobOutcome::Failed(e)
            }
        };

        metrics::JOBS_TOTAL
            .with_label_values(&[action, outcome.label()])
            .inc();
        metrics::JOB_DURATION
            .with_label_values(&[action])
            .observe(started.elapsed().as_secs_f64());
        info!(
            action,
            state = %outcome.state(),
            exit_code = outcome.exit_code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Job finished"
        );
        outcome
    }

    async fn run_job(&self, job: &AutomationJob) -> JobOutcome {
        info!(
            correlation_id = %job.correlation_id,
            action = job.kind.as_str(),
            connector = self.connector.name(),
            "Starting job"
        );
        self.enter(job, WorkerState::Init);

        let session = match self.connector.open().await {
            Ok(session) => SessionGuard::new(session, job.correlation_id.clone()),
            Err(e) => {
                let e = WorkerError::Session(e.to_string());
                self.report_failure(Some(job.correlation_id.clone()), job.owner_id.clone(), &e)
                    .await;
                return JobOutcome::Failed(e);
            }
        };

        let result = self.execute(job, session.session()).await;
        session.release().await;

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.report_failure(Some(job.correlation_id.clone()), job.owner_id.clone(), &e)
                    .await;
                JobOutcome::Failed(e)
            }
        }
    }

    async fn execute(
        &self,
        job: &AutomationJob,
        session: &dyn ConsoleSession,
    ) -> Result<JobOutcome, WorkerError> {
        self.authenticate(job, session).await?;

        match &job.action {
            JobAction::GetCode(method) => self.acquire_code(job, session, method).await,
            JobAction::SetControl {
                control,
                target_account_id,
                value,
            } => {
                self.apply_control(job, session, *control, target_account_id, value)
                    .await
            }
            JobAction::SyncDevices => self.sync_devices(job, session).await,
        }
    }

    fn enter(&self, job: &AutomationJob, state: WorkerState) {
        metrics::WORKER_STATES
            .with_label_values(&[&state.to_string()])
            .inc();
        info!(correlation_id = %job.correlation_id, state = %state, "Worker state");
    }

    async fn authenticate(
        &self,
        job: &AutomationJob,
        session: &dyn ConsoleSession,
    ) -> Result<(), WorkerError> {
        self.enter(job, WorkerState::Authenticating);

        let text = session.fetch_challenge().await?;
        let answer = challenge::solve(&text).map_err(|e| {
            metrics::CHALLENGE_FAILURES.inc();
            WorkerError::Validation(format!("login challenge: {e}"))
        })?;
        debug!(correlation_id = %job.correlation_id, "Login challenge solved");

        let outcome = session.submit_login(&self.credentials, answer).await?;
        if !self.is_landing(&outcome.location) {
            return Err(WorkerError::Authentication(format!(
                "login ended at {} instead of {}",
                outcome.location, self.config.console.landing_path
            )));
        }
        Ok(())
    }

    fn is_landing(&self, location: &str) -> bool {
        let console = &self.config.console;
        if location.contains(&console.login_path) {
            return false;
        }
        location.trim_end_matches('/') == console.landing_path.trim_end_matches('/')
    }

    async fn acquire_code(
        &self,
        job: &AutomationJob,
        session: &dyn ConsoleSession,
        method: &ConnectionMethod,
    ) -> Result<JobOutcome, WorkerError> {
        self.enter(job, WorkerState::NavigatingToConsole);
        let target = match (&job.phone_number, self.config.job.await_link) {
            (Some(phone), _) => LinkTarget::Phone(phone.clone()),
            (None, true) => LinkTarget::new_device(&session.list_devices().await?),
            (None, false) => LinkTarget::new_device(&[]),
        };

        self.enter(job, WorkerState::SelectingMethod);
        session.select_method(method).await?;

        self.enter(job, WorkerState::AwaitingCode);
        let wait = Duration::from_secs(self.config.job.code_timeout_secs);
        let code = tokio::time::timeout(wait, session.read_code())
            .await
            .map_err(|_| {
                WorkerError::timeout(
                    WaitStage::Code,
                    format!("code did not render within {}s", wait.as_secs()),
                )
            })??;

        self.enter(job, WorkerState::CodeEmitted);
        let message =
            CallbackMessage::code_ready(job.correlation_id.clone(), job.owner_id.clone(), &code);
        self.deliver(&message).await;

        if !self.config.job.await_link {
            return Ok(JobOutcome::CodeEmitted);
        }

        self.enter(job, WorkerState::PollingConnection);
        let linked = match self.poller.wait_for_link(session, &target).await {
            Ok(linked) => linked,
            Err(RetryError::Exhausted { attempts }) => {
                return Err(WorkerError::timeout(
                    WaitStage::Link,
                    format!("device not linked after {attempts} checks"),
                ))
            }
            Err(RetryError::Aborted { error, .. }) => return Err(error.into()),
        };

        self.deliver(&CallbackMessage::connected(
            job.correlation_id.clone(),
            job.owner_id.clone(),
            linked.phone_number.clone(),
            linked.external_account_id.clone(),
        ))
        .await;
        Ok(JobOutcome::Linked(linked))
    }

    async fn apply_control(
        &self,
        job: &AutomationJob,
        session: &dyn ConsoleSession,
        control: ControlKind,
        target_account_id: &str,
        value: &str,
    ) -> Result<JobOutcome, WorkerError> {
        self.enter(job, WorkerState::NavigatingToConsole);
        let devices = session.list_devices().await?;
        // Entries sharing the id but not connected are stale duplicates.
        let entry = devices
            .iter()
            .find(|d| d.external_id == target_account_id && d.status == ConnectionStatus::Connected)
            .ok_or_else(|| {
                WorkerError::Validation(format!(
                    "Account {target_account_id} is not currently connected."
                ))
            })?;

        self.enter(job, WorkerState::ApplyingControl);
        session
            .toggle_control(&ControlToggle {
                external_id: entry.external_id.clone(),
                control,
                value: value.to_string(),
            })
            .await?;
        tokio::time::sleep(Duration::from_millis(self.config.job.settle_interval_ms)).await;

        let message = format!(
            "{} for account {} set to {}.",
            control.field(),
            target_account_id,
            value
        );
        self.deliver(&CallbackMessage::management_ok(
            job.correlation_id.clone(),
            job.owner_id.clone(),
            message,
        ))
        .await;
        Ok(JobOutcome::Managed)
    }

    async fn sync_devices(
        &self,
        job: &AutomationJob,
        session: &dyn ConsoleSession,
    ) -> Result<JobOutcome, WorkerError> {
        self.enter(job, WorkerState::Syncing);
        let devices = session.list_devices().await?;
        if devices.is_empty() {
            info!(correlation_id = %job.correlation_id, "No devices to report");
            return Ok(JobOutcome::Synced { devices: 0 });
        }

        let report = SyncReport::from_devices(&devices);
        self.sink
            .deliver_sync(&report)
            .await
            .map_err(|e| WorkerError::Delivery(e.to_string()))?;
        info!(
            correlation_id = %job.correlation_id,
            devices = devices.len(),
            "Device sync reported"
        );
        Ok(JobOutcome::Synced {
            devices: devices.len(),
        })
    }

    /// Best-effort delivery; a failed callback does not change the job's course.
    async fn deliver(&self, message: &CallbackMessage) {
        let kind = message.kind();
        match self.sink.deliver(message).await {
            Ok(()) => {
                metrics::CALLBACKS_DELIVERED
                    .with_label_values(&[kind, "ok"])
                    .inc();
            }
            Err(e) => {
                metrics::CALLBACKS_DELIVERED
                    .with_label_values(&[kind, "failed"])
                    .inc();
                error!(
                    correlation_id = %message.correlation_id,
                    kind,
                    error = %e,
                    "Callback delivery failed"
                );
            }
        }
    }

    async fn report_failure(
        &self,
        correlation_id: Option<CorrelationId>,
        owner_id: Option<String>,
        error: &WorkerError,
    ) {
        let Some(correlation_id) = correlation_id else {
            warn!(error = %error, "No usable correlation id, failure not reported");
            return;
        };
        warn!(correlation_id = %correlation_id, error = %error, "Job failed");
        self.deliver(&CallbackMessage::error(
            correlation_id,
            owner_id,
            error.user_message(),
        ))
        .await;
    }
}

/// Owns an open session and releases it exactly once.
///
/// A guard dropped before [`SessionGuard::release`] ran (the job future was
/// cancelled or unwound) hands the release to a background task.
struct SessionGuard {
    session: Arc<dyn ConsoleSession>,
    correlation_id: CorrelationId,
    released: bool,
}

impl SessionGuard {
    fn new(session: Box<dyn ConsoleSession>, correlation_id: CorrelationId) -> Self {
        Self {
            session: Arc::from(session),
            correlation_id,
            released: false,
        }
    }

    fn session(&self) -> &dyn ConsoleSession {
        self.session.as_ref()
    }

    async fn release(mut self) {
        self.released = true;
        release_session(self.session.as_ref(), &self.correlation_id).await;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            error!(
                correlation_id = %self.correlation_id,
                "Session dropped outside a runtime, not released"
            );
            return;
        };
        warn!(
            correlation_id = %self.correlation_id,
            "Job interrupted, releasing session in background"
        );
        let session = Arc::clone(&self.session);
        let correlation_id = self.correlation_id.clone();
        handle.spawn(async move {
            release_session(session.as_ref(), &correlation_id).await;
        });
    }
}

async fn release_session(session: &dyn ConsoleSession, correlation_id: &CorrelationId) {
    match session.release().await {
        Ok(()) => debug!(correlation_id = %correlation_id, "Session released"),
        Err(e) => warn!(correlation_id = %correlation_id, error = %e, "Session release failed"),
    }
}
