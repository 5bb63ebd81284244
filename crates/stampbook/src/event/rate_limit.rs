//! Per-principal creation cooldown.

use std::collections::HashMap;

use crate::error::{Result, StampbookError};
use crate::principal::Principal;

/// Tracks when each principal last created an event.
///
/// Queries never mutate; only [`RateLimiter::record`] does.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    cooldown_secs: u64,
    last_creation: HashMap<Principal, u64>,
}

impl RateLimiter {
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            cooldown_secs,
            last_creation: HashMap::new(),
        }
    }

    /// Seconds until `principal` may create again; zero when allowed.
    pub fn remaining(&self, principal: Principal, now: u64) -> u64 {
        match self.last_creation.get(&principal) {
            None => 0,
            Some(&last) => {
                let elapsed = now.saturating_sub(last);
                self.cooldown_secs.saturating_sub(elapsed)
            }
        }
    }

    pub fn is_allowed(&self, principal: Principal, now: u64) -> bool {
        self.remaining(principal, now) == 0
    }

    /// Fail with `RateLimited` if the cooldown is still running.
    pub fn check(&self, principal: Principal, now: u64) -> Result<()> {
        match self.remaining(principal, now) {
            0 => Ok(()),
            retry_after_secs => Err(StampbookError::RateLimited { retry_after_secs }),
        }
    }

    pub(crate) fn record(&mut self, principal: Principal, now: u64) {
        self.last_creation.insert(principal, now);
    }

    pub fn last_creation(&self, principal: Principal) -> Option<u64> {
        self.last_creation.get(&principal).copied()
    }

    /// All tracked (principal, last creation) pairs, sorted by principal.
    pub fn entries(&self) -> Vec<(Principal, u64)> {
        let mut entries: Vec<_> = self.last_creation.iter().map(|(p, t)| (*p, *t)).collect();
        entries.sort();
        entries
    }
}
