//! Claim authorizer — fail-fast checks followed by a single commit.

use log::debug;

use crate::crypto::{claim_digest, SignerRecovery};
use crate::error::{Result, StampbookError};
use crate::event::{EventId, EventRecord};
use crate::identity::IdentityId;
use crate::ledger::{LedgerState, Nonce, StampId};
use crate::principal::Principal;

use super::request::{ClaimRequest, ClaimStage};

/// A claim that passed every check against a specific ledger state.
///
/// Only [`ClaimAuthorizer::authorize`] can build one, and only [`commit`]
/// consumes it.
#[derive(Debug)]
pub struct AuthorizedClaim {
    owner: Principal,
    identity_id: IdentityId,
    event_id: EventId,
    nonce: Nonce,
}

impl AuthorizedClaim {
    pub fn owner(&self) -> Principal {
        self.owner
    }
}

/// Recover the signer of `request`'s canonical digest under `context_id`.
///
/// Touches no ledger state, so it can run before the ledger is locked.
pub fn recover_signer(
    recovery: &dyn SignerRecovery,
    request: &ClaimRequest,
    context_id: u64,
) -> Option<Principal> {
    let digest = claim_digest(request.event_id, &request.nonce, request.expiration, context_id);
    recovery.recover(&digest, &request.signature)
}

/// Read-only view of the ledger that runs the claim checks.
pub struct ClaimAuthorizer<'a> {
    state: &'a LedgerState,
    recovery: &'a dyn SignerRecovery,
    context_id: u64,
    recovered: Option<Option<Principal>>,
}

impl<'a> ClaimAuthorizer<'a> {
    pub fn new(state: &'a LedgerState, recovery: &'a dyn SignerRecovery, context_id: u64) -> Self {
        Self {
            state,
            recovery,
            context_id,
            recovered: None,
        }
    }

    /// Use a signer already obtained from [`recover_signer`] for this
    /// request instead of recovering again.
    pub fn with_recovered(mut self, recovered: Option<Principal>) -> Self {
        self.recovered = Some(recovered);
        self
    }

    pub(crate) fn state(&self) -> &'a LedgerState {
        self.state
    }

    /// Run every check in order, stopping at the first failure.
    pub fn authorize(
        &self,
        caller: Principal,
        request: &ClaimRequest,
        now: u64,
    ) -> Result<AuthorizedClaim> {
        self.stage(request, ClaimStage::Received);

        let owner = self.check_ownership(caller, request.identity_id)?;
        self.stage(request, ClaimStage::OwnershipChecked);

        let event = self.resolve_event(request.event_id)?;
        self.stage(request, ClaimStage::EventResolved);

        self.state.stamps.check_unclaimed(owner, event.id)?;
        self.stage(request, ClaimStage::NotAlreadyClaimed);

        self.state.nonces.check_unused(&request.nonce)?;
        self.stage(request, ClaimStage::NonceUnused);

        check_expiration(request.expiration, now)?;
        self.stage(request, ClaimStage::NotExpired);

        self.check_signature(event, request)?;
        self.stage(request, ClaimStage::SignatureValid);

        Ok(AuthorizedClaim {
            owner,
            identity_id: request.identity_id,
            event_id: event.id,
            nonce: request.nonce,
        })
    }

    /// The caller must be the (permanent) owner of the passport.
    pub fn check_ownership(&self, caller: Principal, identity_id: IdentityId) -> Result<Principal> {
        match self.state.identities.owner_of(identity_id) {
            Some(owner) if owner == caller => Ok(owner),
            _ => Err(StampbookError::NotOwner {
                identity: identity_id,
                caller,
            }),
        }
    }

    pub fn resolve_event(&self, event_id: EventId) -> Result<&'a EventRecord> {
        self.state
            .events
            .get(event_id)
            .ok_or(StampbookError::EventNotFound(event_id))
    }

    /// Recover the signer of the canonical claim digest and compare it
    /// with the event's registered signer.
    pub fn check_signature(&self, event: &EventRecord, request: &ClaimRequest) -> Result<()> {
        let recovered = match self.recovered {
            Some(recovered) => recovered,
            None => recover_signer(self.recovery, request, self.context_id),
        };
        if recovered != Some(event.signer) {
            return Err(StampbookError::InvalidSignature {
                expected: event.signer,
                recovered,
            });
        }
        Ok(())
    }

    fn stage(&self, request: &ClaimRequest, stage: ClaimStage) {
        debug!(
            "claim identity={} event={} nonce={}: {stage}",
            request.identity_id, request.event_id, request.nonce
        );
    }
}

/// `now` may equal `expiration`; one second later the claim is dead.
pub fn check_expiration(expiration: u64, now: u64) -> Result<()> {
    if now > expiration {
        return Err(StampbookError::Expired {
            expiration,
            now,
            expired_for_secs: now - expiration,
        });
    }
    Ok(())
}

/// Consume the nonce and record the stamp.
///
/// Both writes are pre-checked against the same state the claim was
/// authorized on, so either both land or neither does.
pub fn commit(state: &mut LedgerState, claim: AuthorizedClaim, now: u64) -> Result<StampId> {
    state.nonces.check_unused(&claim.nonce)?;
    state.stamps.check_unclaimed(claim.owner, claim.event_id)?;

    let stamp_id = state.stamps.record_stamp(
        claim.owner,
        claim.event_id,
        claim.identity_id,
        claim.nonce,
        now,
    )?;
    state.nonces.consume(claim.nonce)?;
    debug!(
        "claim identity={} event={} nonce={}: {} as stamp {stamp_id}",
        claim.identity_id,
        claim.event_id,
        claim.nonce,
        ClaimStage::Committed
    );
    Ok(stamp_id)
}
