//! Claim payload transport codec.
//!
//! A signer hands a claimer a payload out of band (typically a QR code
//! pointing at a claim link). On the wire it is base64 of a JSON object in
//! one of two shapes:
//!
//! ```text
//! full:    {"eventId":1,"nonce":"0x…","expiration":1700000000,"signature":"0x…","contextId":1}
//! compact: {"e":1,"n":"0x…","x":1700000000,"s":"0x…","c":1}
//! ```
//!
//! `chainId` is accepted in place of `contextId`, and numbers may arrive
//! as decimal strings. Both shapes decode into one [`ClaimPayload`] before
//! any validation happens.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::claim::ClaimRequest;
use crate::crypto::{claim_digest, ClaimSignature, SignerKeyPair};
use crate::error::{Result, StampbookError};
use crate::event::EventId;
use crate::identity::IdentityId;
use crate::ledger::Nonce;

/// Path segment that precedes the encoded payload in a claim link.
pub const CLAIM_PATH: &str = "claim";

/// Canonical, decoded claim payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimPayload {
    pub event_id: EventId,
    pub nonce: Nonce,
    pub expiration: u64,
    pub signature: ClaimSignature,
    pub context_id: u64,
}

impl ClaimPayload {
    /// Sign a claim for `event_id` as an event signer.
    pub fn sign(
        key_pair: &SignerKeyPair,
        event_id: EventId,
        nonce: Nonce,
        expiration: u64,
        context_id: u64,
    ) -> Self {
        let digest = claim_digest(event_id, &nonce, expiration, context_id);
        Self {
            event_id,
            nonce,
            expiration,
            signature: ClaimSignature::sign(key_pair, &digest),
            context_id,
        }
    }

    /// The request a passport holder submits for this payload.
    pub fn to_request(&self, identity_id: IdentityId) -> ClaimRequest {
        ClaimRequest {
            identity_id,
            event_id: self.event_id,
            nonce: self.nonce,
            expiration: self.expiration,
            signature: self.signature.clone(),
        }
    }

    /// Encode with full field names.
    pub fn encode(&self) -> Result<String> {
        let wire = FullPayload {
            event_id: WireNumber::Int(self.event_id.0),
            nonce: self.nonce,
            expiration: WireNumber::Int(self.expiration),
            signature: self.signature.clone(),
            context_id: WireNumber::Int(self.context_id),
        };
        encode_json(&wire)
    }

    /// Encode with single-letter field names, for denser QR codes.
    pub fn encode_compact(&self) -> Result<String> {
        let wire = CompactPayload {
            e: WireNumber::Int(self.event_id.0),
            n: self.nonce,
            x: WireNumber::Int(self.expiration),
            s: self.signature.clone(),
            c: WireNumber::Int(self.context_id),
        };
        encode_json(&wire)
    }

    /// Decode either wire shape.
    pub fn decode(encoded: &str) -> Result<Self> {
        let json = decode_base64(encoded.trim())?;
        let wire: WirePayload = serde_json::from_slice(&json).map_err(|e| {
            StampbookError::InvalidPayload(format!("unrecognized payload shape: {e}"))
        })?;
        wire.normalize()
    }

    /// Build `{base}/claim/{encoded}`.
    pub fn to_link(&self, base: &str) -> Result<String> {
        Ok(format!(
            "{}/{CLAIM_PATH}/{}",
            base.trim_end_matches('/'),
            self.encode()?
        ))
    }

    /// Decode from a claim link, or from a bare encoded segment.
    pub fn from_link(link: &str) -> Result<Self> {
        let link = link.trim();
        let without_query = link.split(['?', '#']).next().unwrap_or(link);
        let segment = match without_query.rsplit_once(&format!("/{CLAIM_PATH}/")) {
            Some((_, rest)) => rest.trim_end_matches('/'),
            None => without_query,
        };
        if segment.is_empty() {
            return Err(StampbookError::InvalidPayload("empty claim link".into()));
        }
        Self::decode(segment)
    }
}

// ── Wire shapes ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WireNumber {
    Int(u64),
    Text(String),
}

impl WireNumber {
    fn value(&self, field: &str) -> Result<u64> {
        match self {
            Self::Int(n) => Ok(*n),
            Self::Text(s) => s.trim().parse().map_err(|_| {
                StampbookError::InvalidPayload(format!("{field} is not an unsigned integer: {s:?}"))
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FullPayload {
    event_id: WireNumber,
    nonce: Nonce,
    expiration: WireNumber,
    signature: ClaimSignature,
    #[serde(alias = "chainId")]
    context_id: WireNumber,
}

#[derive(Debug, Serialize, Deserialize)]
struct CompactPayload {
    e: WireNumber,
    n: Nonce,
    x: WireNumber,
    s: ClaimSignature,
    c: WireNumber,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WirePayload {
    Full(FullPayload),
    Compact(CompactPayload),
}

impl WirePayload {
    fn normalize(self) -> Result<ClaimPayload> {
        let (event_id, nonce, expiration, signature, context_id) = match self {
            Self::Full(p) => (p.event_id, p.nonce, p.expiration, p.signature, p.context_id),
            Self::Compact(p) => (p.e, p.n, p.x, p.s, p.c),
        };
        Ok(ClaimPayload {
            event_id: EventId(event_id.value("eventId")?),
            nonce,
            expiration: expiration.value("expiration")?,
            signature,
            context_id: context_id.value("contextId")?,
        })
    }
}

fn encode_json<T: Serialize>(wire: &T) -> Result<String> {
    let json =
        serde_json::to_vec(wire).map_err(|e| StampbookError::SerializationError(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Accept URL-safe and standard alphabets, padded or not.
fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(encoded)
        .or_else(|_| URL_SAFE.decode(encoded))
        .or_else(|_| STANDARD.decode(encoded))
        .or_else(|_| STANDARD_NO_PAD.decode(encoded))
        .map_err(|e| StampbookError::InvalidPayload(format!("invalid base64: {e}")))
}
