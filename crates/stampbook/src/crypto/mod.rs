//! Cryptographic primitives for Stampbook.
//!
//! This module provides:
//! - Ed25519 signer key pairs
//! - The canonical, domain-separated claim digest
//! - Claim signatures that carry their signer and can be "recovered"
//! - Cryptographically secure nonce generation

pub mod digest;
pub mod keys;
pub mod random;
pub mod signing;

pub use digest::{claim_digest, claim_message_hash};
pub use keys::SignerKeyPair;
pub use signing::{ClaimSignature, Ed25519Recovery, SignerRecovery};
