//! Error types for Stampbook.
//!
//! Every rejected operation maps to exactly one variant so callers can
//! present precise messages and tests can assert on the failure kind.
//! Private key material is never included in error messages.

use crate::event::EventId;
use crate::identity::IdentityId;
use crate::ledger::Nonce;
use crate::principal::Principal;

/// Stampbook error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum StampbookError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Rate limited: retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    #[error("Caller {caller} does not own identity {identity}")]
    NotOwner {
        identity: IdentityId,
        caller: Principal,
    },

    #[error("Stamp for event {event} already claimed by {owner}")]
    AlreadyClaimed { owner: Principal, event: EventId },

    #[error("Nonce already used: {0}")]
    NonceReused(Nonce),

    #[error("Claim expired at {expiration} ({expired_for_secs}s ago, now {now})")]
    Expired {
        expiration: u64,
        now: u64,
        expired_for_secs: u64,
    },

    #[error("Invalid signature: expected signer {expected}, recovered {}", display_recovered(.recovered))]
    InvalidSignature {
        expected: Principal,
        recovered: Option<Principal>,
    },

    #[error("Non-transferable: {0}")]
    NonTransferable(String),

    #[error("Principal {owner} already holds identity {identity}")]
    AlreadyHasIdentity {
        owner: Principal,
        identity: IdentityId,
    },

    #[error("Re-entrant call rejected: a mutating operation is already in progress on this thread")]
    Reentrant,

    #[error("Invalid claim payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StampbookError {
    /// Shorthand for an [`StampbookError::InvalidInput`] rejection.
    pub fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

fn display_recovered(recovered: &Option<Principal>) -> String {
    match recovered {
        Some(principal) => principal.to_string(),
        None => "nothing".to_string(),
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, StampbookError>;
