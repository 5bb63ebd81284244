//! Ed25519 key pairs for principals and event signers.

use ed25519_dalek::{SigningKey, VerifyingKey};

use crate::principal::Principal;

/// An Ed25519 signing key and the principal it controls.
///
/// Secret material lives only inside [`SigningKey`], which wipes itself on
/// drop (`ed25519-dalek`'s `zeroize` feature). Bytes handed out by
/// [`SignerKeyPair::signing_key_bytes`] are the caller's to wipe.
pub struct SignerKeyPair {
    signing_key: SigningKey,
}

impl SignerKeyPair {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::thread_rng()),
        }
    }

    pub fn from_signing_key_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(bytes),
        }
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// The principal this key pair controls.
    pub fn principal(&self) -> Principal {
        Principal::from_verifying_key(&self.signing_key.verifying_key())
    }

    pub fn signing_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}
