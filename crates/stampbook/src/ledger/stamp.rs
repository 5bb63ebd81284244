//! Stamp ledger — at most one attendance stamp per (owner, event).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StampbookError};
use crate::event::EventId;
use crate::identity::IdentityId;
use crate::principal::Principal;

use super::nonce::Nonce;

/// Sequential stamp identifier, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StampId(pub u64);

impl std::fmt::Display for StampId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Proof that a passport redeemed a claim for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    pub id: StampId,
    pub event_id: EventId,
    pub identity_id: IdentityId,
    pub owner: Principal,
    /// The nonce consumed by the claim that produced this stamp.
    pub nonce: Nonce,
    /// Claim timestamp (seconds since epoch).
    pub claimed_at: u64,
}

/// All stamps, indexed for duplicate detection and per-owner listing.
#[derive(Debug, Clone, Default)]
pub struct StampLedger {
    stamps: BTreeMap<StampId, Stamp>,
    by_owner_event: HashMap<(Principal, EventId), StampId>,
    by_owner: HashMap<Principal, Vec<StampId>>,
}

impl StampLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored stamps, rejecting duplicates and gaps.
    pub(crate) fn from_stamps(stamps: Vec<Stamp>) -> Result<Self> {
        let mut ledger = Self::new();
        for stamp in stamps {
            let expected = ledger.next_id();
            if stamp.id != expected {
                return Err(StampbookError::InvalidFileFormat(format!(
                    "stamp table out of sequence: expected {expected}, found {}",
                    stamp.id
                )));
            }
            ledger
                .check_unclaimed(stamp.owner, stamp.event_id)
                .map_err(|e| StampbookError::InvalidFileFormat(e.to_string()))?;
            ledger.insert(stamp);
        }
        Ok(ledger)
    }

    pub fn has_stamp(&self, owner: Principal, event_id: EventId) -> bool {
        self.by_owner_event.contains_key(&(owner, event_id))
    }

    /// Fail with `AlreadyClaimed` if `owner` holds a stamp for `event_id`.
    pub fn check_unclaimed(&self, owner: Principal, event_id: EventId) -> Result<()> {
        if self.has_stamp(owner, event_id) {
            return Err(StampbookError::AlreadyClaimed {
                owner,
                event: event_id,
            });
        }
        Ok(())
    }

    /// Append a stamp. Only the claim commit step calls this.
    pub(crate) fn record_stamp(
        &mut self,
        owner: Principal,
        event_id: EventId,
        identity_id: IdentityId,
        nonce: Nonce,
        now: u64,
    ) -> Result<StampId> {
        self.check_unclaimed(owner, event_id)?;
        let id = self.next_id();
        self.insert(Stamp {
            id,
            event_id,
            identity_id,
            owner,
            nonce,
            claimed_at: now,
        });
        Ok(id)
    }

    /// Attempt to move a stamp. Always refused.
    pub fn transfer(&self, id: StampId, to: Principal) -> Result<()> {
        let from = self
            .stamps
            .get(&id)
            .map(|s| s.owner.to_string())
            .unwrap_or_else(|| "nobody".to_string());
        Err(StampbookError::NonTransferable(format!(
            "stamp {id} cannot move from {from} to {to}"
        )))
    }

    pub fn get(&self, id: StampId) -> Option<&Stamp> {
        self.stamps.get(&id)
    }

    /// Ids of every stamp held by `owner`, in claim order.
    pub fn stamps_of(&self, owner: Principal) -> Vec<StampId> {
        self.by_owner.get(&owner).cloned().unwrap_or_default()
    }

    pub fn total(&self) -> u64 {
        self.stamps.len() as u64
    }

    pub fn records(&self) -> impl Iterator<Item = &Stamp> {
        self.stamps.values()
    }

    fn next_id(&self) -> StampId {
        StampId(self.total() + 1)
    }

    fn insert(&mut self, stamp: Stamp) {
        self.by_owner_event
            .insert((stamp.owner, stamp.event_id), stamp.id);
        self.by_owner.entry(stamp.owner).or_default().push(stamp.id);
        self.stamps.insert(stamp.id, stamp);
    }
}
