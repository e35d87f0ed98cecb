//! Connection Poller: waits for a device entry to report linked.
//!
//! The console offers no push notification for link completion, so the device
//! list is re-read on a fixed schedule until a matching Connected entry shows
//! up or the attempt cap runs out.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::console::{same_phone, ConnectionStatus, ConsoleError, ConsoleSession, DeviceEntry};
use crate::metrics;
use crate::retry::{poll_until, RetryError, RetryPolicy};

/// Which device entry counts as "the one we are linking".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Entry whose phone number matches.
    Phone(String),
    /// Any entry that was not present before the code was shown.
    NewDevice { known: HashSet<String> },
}

impl LinkTarget {
    /// Snapshot the current device ids so a new entry can be told apart later.
    pub fn new_device(existing: &[DeviceEntry]) -> Self {
        LinkTarget::NewDevice {
            known: existing.iter().map(|d| d.external_id.clone()).collect(),
        }
    }

    fn matches(&self, entry: &DeviceEntry) -> bool {
        if entry.status != ConnectionStatus::Connected {
            return false;
        }
        match self {
            LinkTarget::Phone(phone) => entry
                .phone_number
                .as_deref()
                .is_some_and(|p| same_phone(p, phone)),
            LinkTarget::NewDevice { known } => !known.contains(&entry.external_id),
        }
    }
}

/// A confirmed link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub phone_number: String,
    pub external_account_id: String,
}

/// Bounded poll over the console's device list.
#[derive(Debug, Clone)]
pub struct ConnectionPoller {
    policy: RetryPolicy,
}

impl ConnectionPoller {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Poll until `target` reports Connected.
    ///
    /// A failed refresh counts as an empty attempt; only a released session
    /// aborts the loop early.
    pub async fn wait_for_link(
        &self,
        session: &dyn ConsoleSession,
        target: &LinkTarget,
    ) -> Result<LinkedAccount, RetryError<ConsoleError>> {
        let result = poll_until(&self.policy, |attempt| async move {
            let devices = match session.list_devices().await {
                Ok(devices) => devices,
                Err(ConsoleError::Released) => return Err(ConsoleError::Released),
                Err(e) => {
                    warn!(attempt, error = %e, "Device list refresh failed");
                    return Ok(None);
                }
            };

            let found = devices.iter().find(|d| target.matches(d)).map(|d| {
                let phone_number = match (&d.phone_number, target) {
                    (Some(p), _) => p.clone(),
                    (None, LinkTarget::Phone(p)) => p.clone(),
                    (None, LinkTarget::NewDevice { .. }) => String::new(),
                };
                LinkedAccount {
                    phone_number,
                    external_account_id: d.external_id.clone(),
                }
            });

            if found.is_some() {
                metrics::LINK_POLL_ATTEMPTS.observe(attempt as f64);
            } else {
                debug!(attempt, devices = devices.len(), "No linked device yet");
            }
            Ok(found)
        })
        .await;

        match &result {
            Ok(linked) => info!(
                external_account_id = %linked.external_account_id,
                "Device linked"
            ),
            Err(RetryError::Exhausted { attempts }) => {
                metrics::LINK_POLL_ATTEMPTS.observe(*attempts as f64);
                warn!(attempts, "Device did not link in time");
            }
            Err(RetryError::Aborted { attempt, error }) => {
                warn!(attempt, error = %error, "Link poll aborted")
            }
        }
        result
    }
}
