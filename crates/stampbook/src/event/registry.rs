//! Event registry storage.

use std::collections::BTreeMap;

use crate::error::{Result, StampbookError};
use crate::principal::Principal;

use super::rate_limit::RateLimiter;
use super::record::{EventDraft, EventId, EventRecord};

/// Append-only store of events plus the creator cooldown.
#[derive(Debug, Clone)]
pub struct EventRegistry {
    events: BTreeMap<EventId, EventRecord>,
    limiter: RateLimiter,
    max_name_len: usize,
    max_description_len: usize,
}

impl EventRegistry {
    pub fn new(cooldown_secs: u64, max_name_len: usize, max_description_len: usize) -> Self {
        Self {
            events: BTreeMap::new(),
            limiter: RateLimiter::new(cooldown_secs),
            max_name_len,
            max_description_len,
        }
    }

    /// Rebuild from stored events and creator timestamps.
    ///
    /// Stored events are not re-validated against the current length
    /// limits; they were valid when created.
    pub(crate) fn from_parts(
        mut registry: Self,
        events: Vec<EventRecord>,
        last_creation: Vec<(Principal, u64)>,
    ) -> Result<Self> {
        for event in events {
            let expected = registry.next_id();
            if event.id != expected {
                return Err(StampbookError::InvalidFileFormat(format!(
                    "event table out of sequence: expected {expected}, found {}",
                    event.id
                )));
            }
            if event.signer.is_zero() {
                return Err(StampbookError::InvalidFileFormat(format!(
                    "event {} has a null signer",
                    event.id
                )));
            }
            registry.events.insert(event.id, event);
        }
        for (principal, at) in last_creation {
            registry.limiter.record(principal, at);
        }
        Ok(registry)
    }

    /// Validate a draft and check the creator's cooldown without storing.
    pub(crate) fn check_create(
        &self,
        creator: Principal,
        draft: &EventDraft,
        now: u64,
    ) -> Result<EventId> {
        draft.validate(self.max_name_len, self.max_description_len)?;
        self.limiter.check(creator, now)?;
        Ok(self.next_id())
    }

    /// Register a new event.
    pub(crate) fn create(
        &mut self,
        creator: Principal,
        draft: EventDraft,
        now: u64,
    ) -> Result<EventRecord> {
        let id = self.check_create(creator, &draft, now)?;
        let record = EventRecord {
            id,
            name: draft.name,
            description: draft.description,
            icon_url: draft.icon_url,
            signer: draft.signer,
            creator,
            created_at: now,
        };
        self.events.insert(id, record.clone());
        self.limiter.record(creator, now);
        Ok(record)
    }

    pub fn get(&self, id: EventId) -> Option<&EventRecord> {
        self.events.get(&id)
    }

    /// Number of events ever registered.
    pub fn total(&self) -> u64 {
        self.events.len() as u64
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn records(&self) -> impl Iterator<Item = &EventRecord> {
        self.events.values()
    }

    fn next_id(&self) -> EventId {
        EventId(self.total() + 1)
    }
}
