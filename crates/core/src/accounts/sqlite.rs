//! SQLite-backed account store.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{AccountRecord, AccountStore, NewAccount, PersistenceError};
use crate::callback::{SyncedDevice, SyncedStatus};

/// SQLite-backed account store.
pub struct SqliteAccountStore {
    conn: Mutex<Connection>,
}

impl SqliteAccountStore {
    /// Open the database file, creating the table if needed.
    pub fn new(path: &Path) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), PersistenceError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                external_account_id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                phone_number TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                sent_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_accounts_owner ON accounts(owner_id);
            "#,
        )?;
        Ok(())
    }

    fn parse_time(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn parse_status(raw: &str) -> SyncedStatus {
        match raw {
            "active" => SyncedStatus::Active,
            "suspended" => SyncedStatus::Suspended,
            _ => SyncedStatus::Inactive,
        }
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<AccountRecord> {
        let status: String = row.get(3)?;
        let sent_count: i64 = row.get(4)?;
        let created_at: String = row.get(5)?;
        let updated_at: String = row.get(6)?;

        Ok(AccountRecord {
            external_account_id: row.get(0)?,
            owner_id: row.get(1)?,
            phone_number: row.get(2)?,
            status: Self::parse_status(&status),
            sent_count: sent_count.max(0) as u64,
            created_at: Self::parse_time(&created_at),
            updated_at: Self::parse_time(&updated_at),
        })
    }

    fn select(
        conn: &Connection,
        external_account_id: &str,
    ) -> Result<Option<AccountRecord>, PersistenceError> {
        Ok(conn
            .query_row(
                "SELECT external_account_id, owner_id, phone_number, status, sent_count, created_at, updated_at
                 FROM accounts WHERE external_account_id = ?",
                params![external_account_id],
                Self::row_to_record,
            )
            .optional()?)
    }
}

impl AccountStore for SqliteAccountStore {
    fn create(&self, account: &NewAccount) -> Result<AccountRecord, PersistenceError> {
        let owner_id = account
            .owner_id
            .as_deref()
            .filter(|o| !o.is_empty())
            .ok_or(PersistenceError::MissingOwner)?;
        if account.external_account_id.is_empty() {
            return Err(PersistenceError::Invalid(
                "external account id is empty".to_string(),
            ));
        }

        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO accounts (external_account_id, owner_id, phone_number, status, sent_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'active', 0, ?4, ?4)
             ON CONFLICT(external_account_id) DO UPDATE SET
                owner_id = excluded.owner_id,
                phone_number = excluded.phone_number,
                status = 'active',
                updated_at = excluded.updated_at",
            params![
                account.external_account_id,
                owner_id,
                account.phone_number,
                now
            ],
        )?;

        Self::select(&conn, &account.external_account_id)?.ok_or_else(|| {
            PersistenceError::Database("account vanished after insert".to_string())
        })
    }

    fn apply_sync(&self, devices: &[SyncedDevice]) -> Result<usize, PersistenceError> {
        let mut conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let tx = conn.transaction()?;
        let mut updated = 0;

        for device in devices {
            updated += tx.execute(
                "UPDATE accounts SET status = ?1, sent_count = ?2, updated_at = ?3
                 WHERE external_account_id = ?4",
                params![
                    device.status.as_str(),
                    device.sent_count as i64,
                    now,
                    device.external_account_id
                ],
            )?;
        }

        tx.commit()?;
        Ok(updated)
    }

    fn get(&self, external_account_id: &str) -> Result<Option<AccountRecord>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        Self::select(&conn, external_account_id)
    }

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<AccountRecord>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT external_account_id, owner_id, phone_number, status, sent_count, created_at, updated_at
             FROM accounts WHERE owner_id = ? ORDER BY created_at DESC",
        )?;
        let records = stmt
            .query_map(params![owner_id], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
