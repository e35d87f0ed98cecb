//! SQLite-backed exchange, shareable between processes on one host.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{ExchangeError, StatusExchange};
use crate::callback::CallbackMessage;
use crate::correlation::CorrelationId;

pub struct SqliteStatusExchange {
    conn: Mutex<Connection>,
}

impl SqliteStatusExchange {
    pub fn new(path: &Path) -> Result<Self, ExchangeError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, ExchangeError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), ExchangeError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS status_records (
                correlation_id TEXT PRIMARY KEY,
                message TEXT NOT NULL,
                written_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl StatusExchange for SqliteStatusExchange {
    fn put(&self, id: &CorrelationId, message: &CallbackMessage) -> Result<(), ExchangeError> {
        let body = serde_json::to_string(message)
            .map_err(|e| ExchangeError::Storage(e.to_string()))?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO status_records (correlation_id, message, written_at)
             VALUES (?1, ?2, ?3)",
            params![id.as_str(), body, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn get_and_delete(
        &self,
        id: &CorrelationId,
    ) -> Result<Option<CallbackMessage>, ExchangeError> {
        let conn = self.conn.lock().unwrap();
        // Single statement, so two processes cannot both read the row.
        let body: Option<String> = conn
            .query_row(
                "DELETE FROM status_records WHERE correlation_id = ?1 RETURNING message",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|b| {
            serde_json::from_str(&b).map_err(|_| ExchangeError::Corrupt(id.to_string()))
        })
        .transpose()
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::contract;

    #[test]
    fn test_sqlite_contract() {
        let exchange = SqliteStatusExchange::in_memory().unwrap();
        contract::run_all(&exchange);
    }

    #[test]
    fn test_two_handles_share_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exchange.db");
        let writer = SqliteStatusExchange::new(&path).unwrap();
        let reader = SqliteStatusExchange::new(&path).unwrap();
        let id = CorrelationId::parse("shared_1").unwrap();

        let msg = CallbackMessage::management_ok(id.clone(), None, "ok");
        writer.put(&id, &msg).unwrap();

        assert_eq!(reader.get_and_delete(&id).unwrap(), Some(msg));
        assert!(writer.get_and_delete(&id).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_record_is_reported() {
        let exchange = SqliteStatusExchange::in_memory().unwrap();
        exchange
            .conn
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO status_records VALUES ('bad', 'not json', '')",
                [],
            )
            .unwrap();

        let id = CorrelationId::parse("bad").unwrap();
        assert!(matches!(
            exchange.get_and_delete(&id),
            Err(ExchangeError::Corrupt(_))
        ));
        // The broken row is consumed.
        assert!(exchange.get_and_delete(&id).unwrap().is_none());
    }
}
