//! The shared ledger: identities, events, nonces, and stamps.
//!
//! `LedgerState` owns the four logical tables. It is only ever touched
//! through the [`Stampbook`](crate::Stampbook) facade, which serializes
//! access behind a single lock. Nonces and stamps have no public mutators;
//! the claim commit step is their only writer.

pub mod nonce;
pub mod stamp;

use serde::{Deserialize, Serialize};

use crate::config::StampbookConfig;
use crate::error::{Result, StampbookError};
use crate::event::{EventRecord, EventRegistry};
use crate::identity::{IdentityRecord, IdentityRegistry};
use crate::principal::Principal;

pub use nonce::{Nonce, NonceLedger};
pub use stamp::{Stamp, StampId, StampLedger};

const SNAPSHOT_VERSION: u32 = 1;

/// All durable ledger state.
#[derive(Debug, Clone)]
pub struct LedgerState {
    pub(crate) identities: IdentityRegistry,
    pub(crate) events: EventRegistry,
    pub(crate) nonces: NonceLedger,
    pub(crate) stamps: StampLedger,
}

impl LedgerState {
    /// Empty tables configured by `config`.
    pub fn new(config: &StampbookConfig) -> Self {
        Self {
            identities: IdentityRegistry::new(config.identity_mode),
            events: EventRegistry::new(
                config.event_cooldown_secs,
                config.max_name_len,
                config.max_description_len,
            ),
            nonces: NonceLedger::new(),
            stamps: StampLedger::new(),
        }
    }

    pub fn identities(&self) -> &IdentityRegistry {
        &self.identities
    }

    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    pub fn nonces(&self) -> &NonceLedger {
        &self.nonces
    }

    pub fn stamps(&self) -> &StampLedger {
        &self.stamps
    }

    /// Export every table.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            version: SNAPSHOT_VERSION,
            identities: self.identities.records().cloned().collect(),
            events: self.events.records().cloned().collect(),
            event_cooldowns: self
                .events
                .limiter()
                .entries()
                .into_iter()
                .map(|(principal, last_created_at)| CreatorCooldown {
                    principal,
                    last_created_at,
                })
                .collect(),
            nonces: self.nonces.iter().copied().collect(),
            stamps: self.stamps.records().cloned().collect(),
        }
    }

    /// Rebuild state from a snapshot, checking cross-table consistency.
    pub fn restore(config: &StampbookConfig, snapshot: LedgerSnapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StampbookError::InvalidFileFormat(format!(
                "unsupported ledger snapshot version {}",
                snapshot.version
            )));
        }
        let empty = Self::new(config);

        let identities = IdentityRegistry::from_records(config.identity_mode, snapshot.identities)?;
        let events = EventRegistry::from_parts(
            empty.events,
            snapshot.events,
            snapshot
                .event_cooldowns
                .into_iter()
                .map(|c| (c.principal, c.last_created_at))
                .collect(),
        )?;

        let mut nonces = NonceLedger::new();
        for nonce in snapshot.nonces {
            nonces
                .consume(nonce)
                .map_err(|e| StampbookError::InvalidFileFormat(e.to_string()))?;
        }

        let mut stamp_nonces = std::collections::HashSet::new();
        for stamp in &snapshot.stamps {
            if !stamp_nonces.insert(stamp.nonce) {
                return Err(StampbookError::InvalidFileFormat(format!(
                    "stamp {} reuses nonce {}",
                    stamp.id, stamp.nonce
                )));
            }
            if identities.owner_of(stamp.identity_id) != Some(stamp.owner) {
                return Err(StampbookError::InvalidFileFormat(format!(
                    "stamp {} references identity {} not owned by {}",
                    stamp.id, stamp.identity_id, stamp.owner
                )));
            }
            if events.get(stamp.event_id).is_none() {
                return Err(StampbookError::InvalidFileFormat(format!(
                    "stamp {} references unknown event {}",
                    stamp.id, stamp.event_id
                )));
            }
            if !nonces.is_used(&stamp.nonce) {
                return Err(StampbookError::InvalidFileFormat(format!(
                    "stamp {} consumed nonce {} missing from the nonce table",
                    stamp.id, stamp.nonce
                )));
            }
        }
        let stamps = StampLedger::from_stamps(snapshot.stamps)?;

        Ok(Self {
            identities,
            events,
            nonces,
            stamps,
        })
    }
}

/// Last event creation time for one creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorCooldown {
    pub principal: Principal,
    pub last_created_at: u64,
}

/// Serializable copy of every ledger table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub identities: Vec<IdentityRecord>,
    pub events: Vec<EventRecord>,
    pub event_cooldowns: Vec<CreatorCooldown>,
    pub nonces: Vec<Nonce>,
    pub stamps: Vec<Stamp>,
}
