//! Event registry — append-only event descriptors bound to a signer.
//!
//! Each event names the off-chain signer whose signatures authorize stamp
//! claims for it. Creation is rate-limited per creator by an embedded
//! [`RateLimiter`]; there is no update or delete path.

pub mod rate_limit;
pub mod record;
pub mod registry;

pub use rate_limit::RateLimiter;
pub use record::{EventDraft, EventId, EventRecord};
pub use registry::EventRegistry;
