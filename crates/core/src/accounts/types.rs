//! Types for account persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::callback::SyncedStatus;

/// A freshly linked account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    /// Front-end user the account belongs to.
    pub owner_id: Option<String>,
    pub phone_number: String,
    pub external_account_id: String,
}

/// A stored account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub owner_id: String,
    pub phone_number: String,
    pub external_account_id: String,
    pub status: SyncedStatus,
    /// Messages sent, as of the last sync.
    pub sent_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Account has no owner")]
    MissingOwner,

    #[error("Invalid account: {0}")]
    Invalid(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(e: rusqlite::Error) -> Self {
        PersistenceError::Database(e.to_string())
    }
}
