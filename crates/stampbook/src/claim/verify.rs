//! Claim preflight — run every check without committing.
//!
//! Verification checks:
//! 1. Ownership (caller owns the passport)
//! 2. Event existence
//! 3. No stamp yet for (owner, event)
//! 4. Nonce unused
//! 5. Not expired
//! 6. Signature recovers to the event signer
//!
//! Unlike authorization, preflight does not stop at the first failure, so
//! a UI can show everything wrong with a scanned payload at once.

use serde::{Deserialize, Serialize};

use crate::error::StampbookError;
use crate::principal::Principal;

use super::authorizer::{check_expiration, ClaimAuthorizer};
use super::request::{ClaimRequest, ClaimStage};

/// Result of preflighting a claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimVerification {
    /// Does the caller own the passport?
    pub owner_valid: bool,
    /// Does the event exist?
    pub event_exists: bool,
    /// Is the (owner, event) pair still unclaimed?
    pub not_claimed: bool,
    /// Is the nonce unused?
    pub nonce_unused: bool,
    /// Is the claim within its expiration?
    pub not_expired: bool,
    /// Does the signature recover to the event signer?
    pub signature_valid: bool,
    /// Overall validity.
    pub is_valid: bool,
    /// Furthest stage reached before the first failing check.
    pub reached: ClaimStage,
    /// Message of the first failing check, in authorization order.
    pub first_failure: Option<String>,
    /// Verification timestamp (seconds since epoch).
    pub verified_at: u64,
}

impl ClaimAuthorizer<'_> {
    /// Evaluate every check for `request` as of `now`.
    ///
    /// Checks that depend on an unresolved passport or event are reported
    /// as failed.
    pub fn preflight(
        &self,
        caller: Principal,
        request: &ClaimRequest,
        now: u64,
    ) -> ClaimVerification {
        let mut failures = Vec::new();
        let state = self.state();

        let owner = note(&mut failures, self.check_ownership(caller, request.identity_id));
        let event = note(&mut failures, self.resolve_event(request.event_id));

        // Duplicate detection is keyed on the real owner when it is known,
        // otherwise on the caller.
        let holder = owner.unwrap_or(caller);
        let not_claimed = note(
            &mut failures,
            state.stamps().check_unclaimed(holder, request.event_id),
        )
        .is_some();
        let nonce_unused = note(&mut failures, state.nonces().check_unused(&request.nonce)).is_some();
        let not_expired = note(&mut failures, check_expiration(request.expiration, now)).is_some();
        let signature_valid = match event {
            Some(event) => note(&mut failures, self.check_signature(event, request)).is_some(),
            None => false,
        };

        let owner_valid = owner.is_some();
        let event_exists = event.is_some();
        let checks = [
            (owner_valid, ClaimStage::OwnershipChecked),
            (event_exists, ClaimStage::EventResolved),
            (not_claimed, ClaimStage::NotAlreadyClaimed),
            (nonce_unused, ClaimStage::NonceUnused),
            (not_expired, ClaimStage::NotExpired),
            (signature_valid, ClaimStage::SignatureValid),
        ];
        let reached = checks
            .iter()
            .take_while(|(ok, _)| *ok)
            .last()
            .map(|(_, stage)| *stage)
            .unwrap_or(ClaimStage::Received);

        ClaimVerification {
            owner_valid,
            event_exists,
            not_claimed,
            nonce_unused,
            not_expired,
            signature_valid,
            is_valid: checks.iter().all(|(ok, _)| *ok),
            reached,
            first_failure: failures.first().map(|e| e.to_string()),
            verified_at: now,
        }
    }
}

/// Keep the value, or remember the failure.
fn note<T>(failures: &mut Vec<StampbookError>, result: Result<T, StampbookError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            failures.push(e);
            None
        }
    }
}
