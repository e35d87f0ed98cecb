//! Filesystem exchange: one JSON file per correlation id.
//!
//! Writes land in a temporary file and are renamed into place. Reads first
//! rename the record to a unique claim name; only the reader whose rename
//! succeeds owns the record.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

use super::{ExchangeError, StatusExchange};
use crate::callback::CallbackMessage;
use crate::correlation::CorrelationId;

pub struct FsStatusExchange {
    dir: PathBuf,
}

impl FsStatusExchange {
    /// Use `dir`, creating it if missing.
    pub fn new(dir: &Path) -> Result<Self, ExchangeError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn record_path(&self, id: &CorrelationId) -> PathBuf {
        // CorrelationId admits only [A-Za-z0-9_.] and never contains "..".
        self.dir.join(format!("{}.json", id.as_str()))
    }

    fn scratch_path(&self, id: &CorrelationId, suffix: &str) -> PathBuf {
        self.dir
            .join(format!(".{}.{}.{}", id.as_str(), Uuid::new_v4(), suffix))
    }
}

impl StatusExchange for FsStatusExchange {
    fn put(&self, id: &CorrelationId, message: &CallbackMessage) -> Result<(), ExchangeError> {
        let body =
            serde_json::to_vec(message).map_err(|e| ExchangeError::Storage(e.to_string()))?;
        let tmp = self.scratch_path(id, "tmp");
        fs::write(&tmp, body)?;
        if let Err(e) = fs::rename(&tmp, self.record_path(id)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn get_and_delete(
        &self,
        id: &CorrelationId,
    ) -> Result<Option<CallbackMessage>, ExchangeError> {
        let claim = self.scratch_path(id, "claim");
        match fs::rename(self.record_path(id), &claim) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let body = fs::read(&claim);
        if let Err(e) = fs::remove_file(&claim) {
            warn!(path = %claim.display(), error = %e, "Failed to remove claimed status record");
        }

        serde_json::from_slice(&body?)
            .map(Some)
            .map_err(|_| ExchangeError::Corrupt(id.to_string()))
    }

    fn name(&self) -> &str {
        "filesystem"
    }
}
