//! Claim authorization — the stamp redemption state machine.
//!
//! A claim moves through
//! `Received → OwnershipChecked → EventResolved → NotAlreadyClaimed →
//! NonceUnused → NotExpired → SignatureValid → Committed`.
//! Any failed check is terminal and leaves every ledger untouched. The
//! cheap checks run before signature recovery; only the commit step
//! mutates, and it runs under the same lock as the checks.

pub mod authorizer;
pub mod request;
pub mod verify;

pub use authorizer::{commit, recover_signer, AuthorizedClaim, ClaimAuthorizer};
pub use request::{ClaimRequest, ClaimStage};
pub use verify::ClaimVerification;
