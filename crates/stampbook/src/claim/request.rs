//! Claim requests and authorization stages.

use serde::{Deserialize, Serialize};

use crate::crypto::ClaimSignature;
use crate::event::EventId;
use crate::identity::IdentityId;
use crate::ledger::Nonce;

/// A caller's request to redeem a signed claim against one of their passports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub identity_id: IdentityId,
    pub event_id: EventId,
    pub nonce: Nonce,
    /// Last second (inclusive, unix time) at which the claim is valid.
    pub expiration: u64,
    pub signature: ClaimSignature,
}

/// Progress of a claim through authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimStage {
    Received,
    OwnershipChecked,
    EventResolved,
    NotAlreadyClaimed,
    NonceUnused,
    NotExpired,
    SignatureValid,
    Committed,
}

impl ClaimStage {
    /// Return a stable string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::OwnershipChecked => "ownership_checked",
            Self::EventResolved => "event_resolved",
            Self::NotAlreadyClaimed => "not_already_claimed",
            Self::NonceUnused => "nonce_unused",
            Self::NotExpired => "not_expired",
            Self::SignatureValid => "signature_valid",
            Self::Committed => "committed",
        }
    }
}

impl std::fmt::Display for ClaimStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
