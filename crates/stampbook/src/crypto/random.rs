//! Secure random number generation.

use rand::RngCore;

use crate::ledger::Nonce;

/// Generate a fresh random claim nonce.
pub fn random_nonce() -> Nonce {
    let mut buf = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut buf);
    Nonce::from_bytes(buf)
}
