//! Storage layer for ledger snapshots and principal key files.
//!
//! # Directory layout
//!
//! By convention the default root is `~/.stampbook/`:
//!
//! ```text
//! ~/.stampbook/
//! ├── config.json        (optional)
//! ├── ledger.json
//! ├── ledger.lock        (while a session is open)
//! └── keys/
//!     └── {name}.key
//! ```
//!
//! # Modules
//!
//! - [`ledger_file`] — versioned JSON snapshot of every ledger table.
//! - [`lock`] — cross-process exclusive lock held around a ledger session.
//! - [`key_file`] — named Ed25519 key pairs for principals and signers.

pub mod key_file;
pub mod ledger_file;
pub mod lock;

pub use key_file::KeyFile;
pub use ledger_file::LedgerFile;
pub use lock::LedgerLock;
