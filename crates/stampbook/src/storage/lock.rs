//! Exclusive lock over a ledger file.
//!
//! The lock is a sibling file created with `create_new`, so at most one
//! holder exists at a time across processes. It records the holder's pid
//! and is removed when the [`LedgerLock`] is dropped. A crashed holder
//! leaves the file behind; remove it by hand once no `stamp` process is
//! running.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{Result, StampbookError};

const RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Held for the whole load, mutate, save cycle of a ledger file.
#[derive(Debug)]
pub struct LedgerLock {
    path: PathBuf,
}

impl LedgerLock {
    /// Take the lock or fail immediately if someone else holds it.
    pub fn try_acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let lock = Self { path };
                writeln!(file, "{}", std::process::id())?;
                debug!("acquired ledger lock {}", lock.path.display());
                Ok(lock)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StampbookError::StorageError(format!(
                    "ledger is locked by another process ({})",
                    path.display()
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Take the lock, retrying until `timeout` elapses.
    pub fn acquire(path: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let path = path.into();
        let deadline = Instant::now() + timeout;
        loop {
            match Self::try_acquire(path.clone()) {
                Err(StampbookError::StorageError(_)) if Instant::now() < deadline => {
                    thread::sleep(RETRY_INTERVAL);
                }
                other => return other,
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!("failed to release ledger lock {}: {e}", self.path.display());
        }
    }
}
