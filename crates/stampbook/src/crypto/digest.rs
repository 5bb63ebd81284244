//! Canonical claim message and its domain-separated digest.
//!
//! The claim message is the packed tuple
//! `(event_id, nonce, expiration, context_id)`, each field widened to a
//! 32-byte big-endian word. Signers never sign the raw message hash; they
//! sign the prefixed digest so a claim signature can never be mistaken for
//! a signature over some other 32-byte value.

use sha2::{Digest, Sha256};

use crate::event::EventId;
use crate::ledger::Nonce;

/// Prefix mixed into every signed claim digest.
pub const SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Stampbook Signed Message:\n32";

fn word(value: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&value.to_be_bytes());
    out
}

/// SHA-256 of the packed claim tuple.
pub fn claim_message_hash(
    event_id: EventId,
    nonce: &Nonce,
    expiration: u64,
    context_id: u64,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(word(event_id.0));
    hasher.update(nonce.as_bytes());
    hasher.update(word(expiration));
    hasher.update(word(context_id));
    hasher.finalize().into()
}

/// The digest a signer signs to authorize a claim.
pub fn claim_digest(event_id: EventId, nonce: &Nonce, expiration: u64, context_id: u64) -> [u8; 32] {
    let message_hash = claim_message_hash(event_id, nonce, expiration, context_id);
    let mut hasher = Sha256::new();
    hasher.update(SIGNED_MESSAGE_PREFIX);
    hasher.update(message_hash);
    hasher.finalize().into()
}
