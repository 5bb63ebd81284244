//! Ledger persistence — save and load a [`LedgerSnapshot`] as JSON.
//!
//! Writes go to a sibling temporary file first and are renamed into
//! place, so a crash mid-write leaves the previous snapshot intact.
//! Callers that load, mutate and save must hold [`LedgerFile::lock`] for
//! the whole cycle; otherwise a concurrent writer's commits are lost.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, StampbookError};
use crate::ledger::LedgerSnapshot;

use super::lock::LedgerLock;

/// A ledger snapshot file on disk.
pub struct LedgerFile {
    path: PathBuf,
}

impl LedgerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// `ledger.json` is guarded by `ledger.lock`.
    pub fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Wait up to `timeout` for exclusive access.
    pub fn lock(&self, timeout: Duration) -> Result<LedgerLock> {
        LedgerLock::acquire(self.lock_path(), timeout)
    }

    /// Exclusive access, or `StorageError` if another holder has it.
    pub fn try_lock(&self) -> Result<LedgerLock> {
        LedgerLock::try_acquire(self.lock_path())
    }

    /// Persist a snapshot, creating parent directories as needed.
    pub fn save(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| StampbookError::SerializationError(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json.as_bytes())?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Load the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StampbookError::StorageError` if the file does not exist and
    /// `StampbookError::InvalidFileFormat` if it cannot be parsed.
    pub fn load(&self) -> Result<LedgerSnapshot> {
        if !self.path.exists() {
            return Err(StampbookError::StorageError(format!(
                "ledger file not found: {}",
                self.path.display()
            )));
        }
        let bytes = std::fs::read(&self.path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            StampbookError::InvalidFileFormat(format!(
                "failed to parse ledger file {}: {e}",
                self.path.display()
            ))
        })
    }
}
