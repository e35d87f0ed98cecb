//! Status Exchange: a read-once mailbox keyed by correlation id.
//!
//! Each slot holds the most recently written message. A read returns the
//! message and removes it in the same step, so a record is observed by at
//! most one poller.

mod fs;
mod memory;
mod sqlite;

pub use fs::FsStatusExchange;
pub use memory::MemoryStatusExchange;
pub use sqlite::SqliteStatusExchange;

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::callback::CallbackMessage;
use crate::config::{ExchangeBackend, ExchangeConfig};
use crate::correlation::CorrelationId;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt status record for {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for ExchangeError {
    fn from(e: std::io::Error) -> Self {
        ExchangeError::Storage(e.to_string())
    }
}

impl From<rusqlite::Error> for ExchangeError {
    fn from(e: rusqlite::Error) -> Self {
        ExchangeError::Storage(e.to_string())
    }
}

/// Key-value mailbox with overwrite-on-put and delete-on-read.
pub trait StatusExchange: Send + Sync {
    /// Store `message` for `id`, replacing any unread one.
    fn put(&self, id: &CorrelationId, message: &CallbackMessage) -> Result<(), ExchangeError>;

    /// Remove and return the stored message, if any.
    fn get_and_delete(&self, id: &CorrelationId)
        -> Result<Option<CallbackMessage>, ExchangeError>;

    /// Backend name (for logging).
    fn name(&self) -> &str;
}

/// Build the configured backend. `db_path` is used by the SQLite backend.
pub fn create_status_exchange(
    config: &ExchangeConfig,
    db_path: &Path,
) -> Result<Arc<dyn StatusExchange>, ExchangeError> {
    Ok(match config.backend {
        ExchangeBackend::Memory => Arc::new(MemoryStatusExchange::new()),
        ExchangeBackend::Filesystem => Arc::new(FsStatusExchange::new(&config.dir)?),
        ExchangeBackend::Sqlite => Arc::new(SqliteStatusExchange::new(db_path)?),
    })
}


/// Behavior every backend must share.
#[cfg(test)]
pub(crate) mod contract {
    use super::*;

    fn id(raw: &str) -> CorrelationId {
        CorrelationId::parse(raw).unwrap()
    }

    pub fn empty_slot_reads_none(exchange: &dyn StatusExchange) {
        assert!(exchange.get_and_delete(&id("never_written")).unwrap().is_none());
    }

    pub fn read_once(exchange: &dyn StatusExchange) {
        let msg = CallbackMessage::error(id("job_1"), None, "nope");
        exchange.put(&id("job_1"), &msg).unwrap();

        assert_eq!(exchange.get_and_delete(&id("job_1")).unwrap(), Some(msg));
        assert!(exchange.get_and_delete(&id("job_1")).unwrap().is_none());
    }

    pub fn overwrite_keeps_latest(exchange: &dyn StatusExchange) {
        let first = CallbackMessage::management_ok(id("job_2"), None, "first");
        let second = CallbackMessage::connected(id("job_2"), None, "628111", "101");
        exchange.put(&id("job_2"), &first).unwrap();
        exchange.put(&id("job_2"), &second).unwrap();

        assert_eq!(exchange.get_and_delete(&id("job_2")).unwrap(), Some(second));
        assert!(exchange.get_and_delete(&id("job_2")).unwrap().is_none());
    }

    pub fn slots_are_independent(exchange: &dyn StatusExchange) {
        let a = CallbackMessage::management_ok(id("job.a"), None, "a");
        let b = CallbackMessage::management_ok(id("job.b"), None, "b");
        exchange.put(&id("job.a"), &a).unwrap();
        exchange.put(&id("job.b"), &b).unwrap();

        assert_eq!(exchange.get_and_delete(&id("job.b")).unwrap(), Some(b));
        assert_eq!(exchange.get_and_delete(&id("job.a")).unwrap(), Some(a));
    }

    pub fn run_all(exchange: &dyn StatusExchange) {
        empty_slot_reads_none(exchange);
        read_once(exchange);
        overwrite_keeps_latest(exchange);
        slots_are_independent(exchange);
    }
}
