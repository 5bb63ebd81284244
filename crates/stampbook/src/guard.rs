//! Re-entrancy guard for mutating ledger operations.
//!
//! Each mutating operation enters the guard before touching the ledger and
//! holds it until its notifications have been delivered. A thread that is
//! already inside the guard cannot enter again, so a signer-recovery
//! implementation or a hook that calls back into a mutating operation gets
//! [`StampbookError::Reentrant`] instead of a deadlock or a nested commit.
//! Other threads are unaffected; they serialize on the ledger lock.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, ThreadId};

use crate::error::{Result, StampbookError};

/// Tracks which threads are inside a mutating operation.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    active: Mutex<HashSet<ThreadId>>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the critical section for the current thread.
    pub fn enter(&self) -> Result<GuardToken<'_>> {
        let thread = thread::current().id();
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(thread) {
            return Err(StampbookError::Reentrant);
        }
        Ok(GuardToken {
            guard: self,
            thread,
        })
    }

    /// Whether the current thread is inside the critical section.
    pub fn is_entered(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&thread::current().id())
    }
}

/// Proof of entry; leaving happens on drop.
#[derive(Debug)]
pub struct GuardToken<'a> {
    guard: &'a ReentrancyGuard,
    thread: ThreadId,
}

impl Drop for GuardToken<'_> {
    fn drop(&mut self) {
        self.guard
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.thread);
    }
}
