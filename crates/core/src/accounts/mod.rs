//! Durable account records created when a device link is confirmed.
//!
//! The Callback Gateway only issues requests through [`AccountStore`]; the
//! schema is owned by the store implementation.

mod sqlite;
mod types;

pub use sqlite::SqliteAccountStore;
pub use types::*;

use crate::callback::SyncedDevice;

/// Trait for account persistence.
pub trait AccountStore: Send + Sync {
    /// Create (or re-link) the record for a console account.
    ///
    /// Linking an external id that already exists replaces its owner and phone
    /// number and marks it active again.
    fn create(&self, account: &NewAccount) -> Result<AccountRecord, PersistenceError>;

    /// Apply a device sync report to matching records.
    ///
    /// Devices without a record are ignored. Returns the number of records updated.
    fn apply_sync(&self, devices: &[SyncedDevice]) -> Result<usize, PersistenceError>;

    /// Get a record by console account id.
    fn get(&self, external_account_id: &str) -> Result<Option<AccountRecord>, PersistenceError>;

    /// All records of one owner, newest first.
    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<AccountRecord>, PersistenceError>;
}
