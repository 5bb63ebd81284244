//! Stampbook engine — the serialized entry point to the ledger.
//!
//! Every mutating operation follows the same shape:
//! enter the re-entrancy guard, read the clock once, lock the ledger, run
//! all checks, commit, unlock, then notify hooks. A rejected operation
//! returns before the commit and leaves the ledger exactly as it was.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use log::{info, warn};

use crate::claim::{commit, recover_signer, ClaimAuthorizer, ClaimRequest, ClaimVerification};
use crate::config::StampbookConfig;
use crate::crypto::{Ed25519Recovery, SignerRecovery};
use crate::error::{Result, StampbookError};
use crate::event::{EventDraft, EventId, EventRecord};
use crate::guard::ReentrancyGuard;
use crate::hooks::{LedgerEvent, LedgerHook};
use crate::identity::{IdentityId, IdentityRecord};
use crate::ledger::{LedgerSnapshot, LedgerState, Nonce, Stamp, StampId};
use crate::payload::ClaimPayload;
use crate::principal::Principal;
use crate::time::{Clock, SystemClock};

/// The attendance ledger.
///
/// `Stampbook` is `Send + Sync`; share it behind an `Arc` and call it from
/// any number of threads. Competing submissions are resolved in lock
/// order: the first to commit wins.
pub struct Stampbook {
    config: StampbookConfig,
    clock: Arc<dyn Clock>,
    recovery: Box<dyn SignerRecovery>,
    state: Mutex<LedgerState>,
    guard: ReentrancyGuard,
    hooks: RwLock<Vec<Arc<dyn LedgerHook>>>,
}

impl Stampbook {
    /// An empty ledger on the system clock.
    pub fn new(config: StampbookConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// An empty ledger on a caller-supplied clock.
    pub fn with_clock(config: StampbookConfig, clock: Arc<dyn Clock>) -> Self {
        let state = LedgerState::new(&config);
        Self::from_state(config, clock, state)
    }

    /// Restore a ledger from a snapshot.
    pub fn from_snapshot(
        config: StampbookConfig,
        clock: Arc<dyn Clock>,
        snapshot: LedgerSnapshot,
    ) -> Result<Self> {
        let state = LedgerState::restore(&config, snapshot)?;
        Ok(Self::from_state(config, clock, state))
    }

    fn from_state(config: StampbookConfig, clock: Arc<dyn Clock>, state: LedgerState) -> Self {
        Self {
            config,
            clock,
            recovery: Box::new(Ed25519Recovery),
            state: Mutex::new(state),
            guard: ReentrancyGuard::new(),
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// Replace the signer recovery scheme.
    pub fn with_recovery(mut self, recovery: impl SignerRecovery + 'static) -> Self {
        self.recovery = Box::new(recovery);
        self
    }

    pub fn config(&self) -> &StampbookConfig {
        &self.config
    }

    /// Register an observer for committed transitions.
    pub fn subscribe(&self, hook: Arc<dyn LedgerHook>) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }

    // ── Identities ──────────────────────────────────────────────────────────

    /// Mint a passport for `caller`.
    pub fn mint_passport(&self, caller: Principal) -> Result<IdentityId> {
        let _token = self.guard.enter()?;
        let now = self.clock.now_secs();
        let id = self.lock().identities.mint(caller, now)?;
        info!("identity {id} minted to {caller}");
        self.notify(LedgerEvent::IdentityMinted {
            identity_id: id,
            owner: caller,
        });
        Ok(id)
    }

    /// Attempt to move a passport. Always fails with `NonTransferable`.
    pub fn transfer_identity(&self, caller: Principal, id: IdentityId, to: Principal) -> Result<()> {
        let result = self.lock().identities.transfer(id, to);
        if let Err(e) = &result {
            warn!("transfer of identity {id} by {caller} rejected: {e}");
        }
        result
    }

    pub fn owner_of(&self, id: IdentityId) -> Option<Principal> {
        self.lock().identities.owner_of(id)
    }

    pub fn get_identity(&self, id: IdentityId) -> Option<IdentityRecord> {
        self.lock().identities.get(id).cloned()
    }

    /// Passports held by `owner`, in mint order.
    pub fn identities_of(&self, owner: Principal) -> Vec<IdentityId> {
        self.lock().identities.identities_of(owner).to_vec()
    }

    pub fn total_identities(&self) -> u64 {
        self.lock().identities.total()
    }

    // ── Events ──────────────────────────────────────────────────────────────

    /// Register an event whose claims `draft.signer` may authorize.
    pub fn create_event(&self, caller: Principal, draft: EventDraft) -> Result<EventId> {
        let _token = self.guard.enter()?;
        let now = self.clock.now_secs();
        let record = match self.lock().events.create(caller, draft, now) {
            Ok(record) => record,
            Err(e) => {
                warn!("event creation by {caller} rejected: {e}");
                return Err(e);
            }
        };
        info!(
            "event {} '{}' created by {caller} with signer {}",
            record.id, record.name, record.signer
        );
        self.notify(LedgerEvent::EventCreated {
            event_id: record.id,
            name: record.name,
            signer: record.signer,
        });
        Ok(record.id)
    }

    pub fn get_event(&self, id: EventId) -> Result<EventRecord> {
        self.lock()
            .events
            .get(id)
            .cloned()
            .ok_or(StampbookError::EventNotFound(id))
    }

    pub fn total_events(&self) -> u64 {
        self.lock().events.total()
    }

    /// Seconds until `principal` may create another event. Never mutates.
    pub fn event_cooldown_remaining(&self, principal: Principal) -> u64 {
        let now = self.clock.now_secs();
        self.lock().events.limiter().remaining(principal, now)
    }

    pub fn can_create_event(&self, principal: Principal) -> bool {
        self.event_cooldown_remaining(principal) == 0
    }

    // ── Claims ──────────────────────────────────────────────────────────────

    /// Redeem a signed claim for one of `caller`'s passports.
    pub fn claim_stamp(&self, caller: Principal, request: &ClaimRequest) -> Result<StampId> {
        let _token = self.guard.enter()?;
        let now = self.clock.now_secs();
        let recovered = recover_signer(self.recovery.as_ref(), request, self.config.context_id);

        let (stamp_id, owner) = {
            let mut state = self.lock();
            let authorizer =
                ClaimAuthorizer::new(&state, self.recovery.as_ref(), self.config.context_id)
                    .with_recovered(recovered);
            let authorized = match authorizer.authorize(caller, request, now) {
                Ok(claim) => claim,
                Err(e) => {
                    warn!(
                        "claim by {caller} for event {} with nonce {} rejected: {e}",
                        request.event_id, request.nonce
                    );
                    return Err(e);
                }
            };
            let owner = authorized.owner();
            (commit(&mut state, authorized, now)?, owner)
        };

        info!(
            "stamp {stamp_id} claimed for event {} by identity {}",
            request.event_id, request.identity_id
        );
        self.notify(LedgerEvent::StampClaimed {
            stamp_id,
            event_id: request.event_id,
            identity_id: request.identity_id,
            owner,
            nonce: request.nonce,
        });
        Ok(stamp_id)
    }

    /// Redeem a decoded payload against `identity_id`.
    ///
    /// The payload's own context id is informational; verification always
    /// uses this ledger's context, so a foreign payload fails signature
    /// verification.
    pub fn claim_payload(
        &self,
        caller: Principal,
        identity_id: IdentityId,
        payload: &ClaimPayload,
    ) -> Result<StampId> {
        self.claim_stamp(caller, &payload.to_request(identity_id))
    }

    /// Run every claim check without committing anything.
    pub fn preflight_claim(&self, caller: Principal, request: &ClaimRequest) -> ClaimVerification {
        let now = self.clock.now_secs();
        let recovered = recover_signer(self.recovery.as_ref(), request, self.config.context_id);
        let state = self.lock();
        ClaimAuthorizer::new(&state, self.recovery.as_ref(), self.config.context_id)
            .with_recovered(recovered)
            .preflight(caller, request, now)
    }

    /// Whether the owner of `identity_id` holds a stamp for `event_id`.
    pub fn has_stamp(&self, identity_id: IdentityId, event_id: EventId) -> bool {
        let state = self.lock();
        match state.identities.owner_of(identity_id) {
            Some(owner) => state.stamps.has_stamp(owner, event_id),
            None => false,
        }
    }

    /// Stamps held by `owner`, in claim order.
    pub fn list_stamps(&self, owner: Principal) -> Vec<StampId> {
        self.lock().stamps.stamps_of(owner)
    }

    pub fn get_stamp(&self, id: StampId) -> Option<Stamp> {
        self.lock().stamps.get(id).cloned()
    }

    /// Attempt to move a stamp. Always fails with `NonTransferable`.
    pub fn transfer_stamp(&self, caller: Principal, id: StampId, to: Principal) -> Result<()> {
        let result = self.lock().stamps.transfer(id, to);
        if let Err(e) = &result {
            warn!("transfer of stamp {id} by {caller} rejected: {e}");
        }
        result
    }

    pub fn total_stamps(&self) -> u64 {
        self.lock().stamps.total()
    }

    pub fn is_nonce_used(&self, nonce: &Nonce) -> bool {
        self.lock().nonces.is_used(nonce)
    }

    // ── Persistence ─────────────────────────────────────────────────────────

    /// A consistent copy of every table.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.lock().snapshot()
    }

    // ── Internal helpers ────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        // Writers validate before mutating; a poisoned lock still holds
        // whole transitions only.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: LedgerEvent) {
        let hooks = self
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for hook in hooks {
            hook.on_event(&event);
        }
    }
}
