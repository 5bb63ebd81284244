//! Claim signatures and signer recovery.
//!
//! A claim signature is 96 bytes: the signer's verifying key (32) followed
//! by the Ed25519 signature over the claim digest (64). Recovery parses the
//! embedded key and verifies strictly against it; only a signature that
//! verifies yields a principal. The caller then compares the recovered
//! principal with the event's registered signer.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature, Signer};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::keys::SignerKeyPair;
use crate::error::{Result, StampbookError};
use crate::principal::Principal;

/// Length of an encoded claim signature.
pub const CLAIM_SIGNATURE_LEN: usize = 32 + 64;

/// Opaque signature bytes as transported in a claim payload.
#[derive(Clone, PartialEq, Eq)]
pub struct ClaimSignature(Vec<u8>);

impl ClaimSignature {
    /// Wrap raw bytes. Length is checked during recovery, not here.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Sign a claim digest.
    pub fn sign(key_pair: &SignerKeyPair, digest: &[u8; 32]) -> Self {
        let sig = key_pair.signing_key().sign(digest);
        let mut bytes = Vec::with_capacity(CLAIM_SIGNATURE_LEN);
        bytes.extend_from_slice(key_pair.principal().as_bytes());
        bytes.extend_from_slice(&sig.to_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Split into (claimed signer, signature) if the length is right.
    fn parts(&self) -> Option<(Principal, Signature)> {
        if self.0.len() != CLAIM_SIGNATURE_LEN {
            return None;
        }
        let key: [u8; 32] = self.0[..32].try_into().ok()?;
        let sig: [u8; 64] = self.0[32..].try_into().ok()?;
        Some((Principal::from_bytes(key), Signature::from_bytes(&sig)))
    }
}

impl fmt::Display for ClaimSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for ClaimSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClaimSignature({} bytes)", self.0.len())
    }
}

impl FromStr for ClaimSignature {
    type Err = StampbookError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(digits)
            .map_err(|e| StampbookError::InvalidPayload(format!("bad signature hex: {e}")))?;
        Ok(Self(bytes))
    }
}

impl Serialize for ClaimSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ClaimSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Recovers the principal that produced a signature over a digest.
///
/// Recovery runs inside the claim's reentrancy scope but before the ledger
/// lock is taken. Read calls back into the ledger are allowed; mutating
/// calls from the same thread fail with `Reentrant`.
pub trait SignerRecovery: Send + Sync {
    /// Return the signer, or `None` if the signature is malformed or does
    /// not verify.
    fn recover(&self, digest: &[u8; 32], signature: &ClaimSignature) -> Option<Principal>;
}

/// Default recovery for 96-byte Ed25519 claim signatures.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Recovery;

impl SignerRecovery for Ed25519Recovery {
    fn recover(&self, digest: &[u8; 32], signature: &ClaimSignature) -> Option<Principal> {
        let (signer, sig) = signature.parts()?;
        let key = signer.verifying_key().ok()?;
        key.verify_strict(digest, &sig).ok()?;
        Some(signer)
    }
}
