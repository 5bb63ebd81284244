//! Stampbook — soulbound attendance credentials.
//!
//! Principals mint a non-transferable passport, organizers register
//! events with a designated signer, and passport holders claim one stamp
//! per event by presenting a signer-issued claim (event, nonce,
//! expiration, signature). Every nonce is single-use across the whole
//! ledger, and neither passports nor stamps can ever change hands.

pub mod claim;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod event;
pub mod guard;
pub mod hooks;
pub mod identity;
pub mod ledger;
pub mod payload;
pub mod principal;
pub mod storage;
pub mod time;

// Re-export primary types
pub use engine::Stampbook;
pub use error::{Result, StampbookError};
pub use principal::Principal;

pub use config::{IdentityMode, StampbookConfig};
pub use crypto::{ClaimSignature, SignerKeyPair};
pub use identity::{IdentityId, IdentityRecord};
pub use event::{EventDraft, EventId, EventRecord};
pub use ledger::{LedgerSnapshot, Nonce, Stamp, StampId};
pub use claim::{ClaimRequest, ClaimStage, ClaimVerification};
pub use payload::ClaimPayload;

pub use hooks::{LedgerEvent, LedgerHook};
pub use storage::{KeyFile, LedgerFile, LedgerLock};
pub use time::{Clock, ManualClock, SystemClock};
