//! Identity registry — sequential, non-transferable passports.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::IdentityMode;
use crate::error::{Result, StampbookError};
use crate::principal::Principal;

/// Sequential passport identifier, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub u64);

impl std::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A minted passport. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: IdentityId,
    pub owner: Principal,
    /// Mint timestamp (seconds since epoch).
    pub minted_at: u64,
}

/// Registry of all minted passports.
#[derive(Debug, Clone)]
pub struct IdentityRegistry {
    mode: IdentityMode,
    records: BTreeMap<IdentityId, IdentityRecord>,
    by_owner: HashMap<Principal, Vec<IdentityId>>,
}

impl IdentityRegistry {
    /// Create an empty registry enforcing `mode`.
    pub fn new(mode: IdentityMode) -> Self {
        Self {
            mode,
            records: BTreeMap::new(),
            by_owner: HashMap::new(),
        }
    }

    /// Rebuild a registry from stored records.
    ///
    /// Ids must form the contiguous range `1..=n`, and in unique mode no
    /// principal may appear twice.
    pub(crate) fn from_records(mode: IdentityMode, records: Vec<IdentityRecord>) -> Result<Self> {
        let mut registry = Self::new(mode);
        for record in records {
            let expected = registry.next_id();
            if record.id != expected {
                return Err(StampbookError::InvalidFileFormat(format!(
                    "identity table out of sequence: expected {expected}, found {}",
                    record.id
                )));
            }
            registry
                .check_mint(record.owner)
                .map_err(|e| StampbookError::InvalidFileFormat(e.to_string()))?;
            registry.insert(record);
        }
        Ok(registry)
    }

    /// Write-path capability check for passports.
    ///
    /// The only permitted ownership change is creation from the null
    /// predecessor. Every other move is refused, whoever asks.
    pub fn authorize_transfer(
        &self,
        from: Option<Principal>,
        to: Principal,
        id: IdentityId,
    ) -> Result<()> {
        match from {
            None if !to.is_zero() => Ok(()),
            None => Err(StampbookError::invalid_input(
                "owner",
                "cannot mint to the null principal",
            )),
            Some(from) => Err(StampbookError::NonTransferable(format!(
                "identity {id} cannot move from {from} to {to}"
            ))),
        }
    }

    /// Check whether `owner` may mint a new passport right now.
    pub(crate) fn check_mint(&self, owner: Principal) -> Result<IdentityId> {
        let id = self.next_id();
        if self.mode == IdentityMode::Unique {
            if let Some(existing) = self.identities_of(owner).first() {
                return Err(StampbookError::AlreadyHasIdentity {
                    owner,
                    identity: *existing,
                });
            }
        }
        self.authorize_transfer(None, owner, id)?;
        Ok(id)
    }

    /// Mint a new passport to `owner`.
    pub(crate) fn mint(&mut self, owner: Principal, now: u64) -> Result<IdentityId> {
        let id = self.check_mint(owner)?;
        self.insert(IdentityRecord {
            id,
            owner,
            minted_at: now,
        });
        Ok(id)
    }

    /// Attempt to reassign a passport. Always refused.
    pub fn transfer(&self, id: IdentityId, to: Principal) -> Result<()> {
        let from = self.owner_of(id).unwrap_or(Principal::ZERO);
        self.authorize_transfer(Some(from), to, id)
    }

    /// Current (and permanent) owner of a passport.
    pub fn owner_of(&self, id: IdentityId) -> Option<Principal> {
        self.records.get(&id).map(|r| r.owner)
    }

    pub fn get(&self, id: IdentityId) -> Option<&IdentityRecord> {
        self.records.get(&id)
    }

    /// All passports held by `owner`, in mint order.
    pub fn identities_of(&self, owner: Principal) -> &[IdentityId] {
        self.by_owner.get(&owner).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of passports ever minted.
    pub fn total(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn records(&self) -> impl Iterator<Item = &IdentityRecord> {
        self.records.values()
    }

    fn next_id(&self) -> IdentityId {
        IdentityId(self.total() + 1)
    }

    fn insert(&mut self, record: IdentityRecord) {
        self.by_owner.entry(record.owner).or_default().push(record.id);
        self.records.insert(record.id, record);
    }
}
