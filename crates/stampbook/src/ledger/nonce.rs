//! Nonce ledger — the global set of consumed claim nonces.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, StampbookError};
use crate::principal::decode_hex_32;

/// A 32-byte single-use claim token.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Nonce([u8; 32]);

impl Nonce {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// A nonce whose value is `n` as a big-endian 256-bit integer.
    pub fn from_u64(n: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({self})")
    }
}

impl FromStr for Nonce {
    type Err = StampbookError;

    fn from_str(s: &str) -> Result<Self> {
        decode_hex_32(s)
            .map(Self)
            .map_err(|e| StampbookError::InvalidPayload(format!("invalid nonce: {e}")))
    }
}

impl Serialize for Nonce {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Nonce {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Every nonce ever consumed, across all events.
#[derive(Debug, Clone, Default)]
pub struct NonceLedger {
    used: BTreeSet<Nonce>,
}

impl NonceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_used(&self, nonce: &Nonce) -> bool {
        self.used.contains(nonce)
    }

    /// Fail with `NonceReused` if `nonce` was already consumed.
    pub fn check_unused(&self, nonce: &Nonce) -> Result<()> {
        if self.is_used(nonce) {
            return Err(StampbookError::NonceReused(*nonce));
        }
        Ok(())
    }

    /// Mark a nonce consumed. Only the claim commit step calls this.
    pub(crate) fn consume(&mut self, nonce: Nonce) -> Result<()> {
        if !self.used.insert(nonce) {
            return Err(StampbookError::NonceReused(nonce));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Nonce> {
        self.used.iter()
    }
}
