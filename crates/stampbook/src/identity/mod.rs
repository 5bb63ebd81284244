//! Identity issuance — one soulbound passport per principal.
//!
//! The identity module provides the `IdentityRegistry`, which hands out
//! sequential passport ids and refuses every attempt to move a passport
//! away from the principal it was minted to.

pub mod registry;

pub use registry::{IdentityId, IdentityRecord, IdentityRegistry};
