//! Mock account store for testing.

use chrono::Utc;
use std::sync::{Arc, Mutex};

use crate::accounts::{AccountRecord, AccountStore, NewAccount, PersistenceError};
use crate::callback::{SyncedDevice, SyncedStatus};

/// In-memory account store with an injectable failure.
#[derive(Debug, Clone, Default)]
pub struct MockAccountStore {
    created: Arc<Mutex<Vec<NewAccount>>>,
    synced: Arc<Mutex<Vec<SyncedDevice>>>,
    failing: Arc<Mutex<bool>>,
}

impl MockAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts successfully created, in order.
    pub fn created(&self) -> Vec<NewAccount> {
        self.created.lock().unwrap().clone()
    }

    /// Devices received through sync reports.
    pub fn synced(&self) -> Vec<SyncedDevice> {
        self.synced.lock().unwrap().clone()
    }

    /// Make every following call fail with a database error.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if *self.failing.lock().unwrap() {
            return Err(PersistenceError::Database("mock store failing".to_string()));
        }
        Ok(())
    }
}

impl AccountStore for MockAccountStore {
    fn create(&self, account: &NewAccount) -> Result<AccountRecord, PersistenceError> {
        self.check()?;
        let owner_id = account
            .owner_id
            .clone()
            .ok_or(PersistenceError::MissingOwner)?;
        self.created.lock().unwrap().push(account.clone());

        let now = Utc::now();
        Ok(AccountRecord {
            owner_id,
            phone_number: account.phone_number.clone(),
            external_account_id: account.external_account_id.clone(),
            status: SyncedStatus::Active,
            sent_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    fn apply_sync(&self, devices: &[SyncedDevice]) -> Result<usize, PersistenceError> {
        self.check()?;
        self.synced.lock().unwrap().extend_from_slice(devices);
        Ok(devices.len())
    }

    fn get(&self, external_account_id: &str) -> Result<Option<AccountRecord>, PersistenceError> {
        self.check()?;
        let now = Utc::now();
        Ok(self
            .created
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|a| a.external_account_id == external_account_id)
            .map(|a| AccountRecord {
                owner_id: a.owner_id.clone().unwrap_or_default(),
                phone_number: a.phone_number.clone(),
                external_account_id: a.external_account_id.clone(),
                status: SyncedStatus::Active,
                sent_count: 0,
                created_at: now,
                updated_at: now,
            }))
    }

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<AccountRecord>, PersistenceError> {
        self.check()?;
        let owned: Vec<String> = self
            .created
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.owner_id.as_deref() == Some(owner_id))
            .map(|a| a.external_account_id.clone())
            .collect();
        owned
            .iter()
            .filter_map(|id| self.get(id).transpose())
            .collect()
    }
}
