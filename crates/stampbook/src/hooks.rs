//! Ledger notifications.
//!
//! Hooks observe committed transitions. They are called after the ledger
//! lock is released but while the caller still holds the re-entrancy
//! guard: reads from inside a hook are fine, mutations are rejected.

use serde::{Deserialize, Serialize};

use crate::event::EventId;
use crate::identity::IdentityId;
use crate::ledger::{Nonce, StampId};
use crate::principal::Principal;

/// A committed ledger transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    IdentityMinted {
        identity_id: IdentityId,
        owner: Principal,
    },
    EventCreated {
        event_id: EventId,
        name: String,
        signer: Principal,
    },
    StampClaimed {
        stamp_id: StampId,
        event_id: EventId,
        identity_id: IdentityId,
        owner: Principal,
        nonce: Nonce,
    },
}

/// Observer of committed ledger transitions.
pub trait LedgerHook: Send + Sync {
    fn on_event(&self, event: &LedgerEvent);
}

impl<F> LedgerHook for F
where
    F: Fn(&LedgerEvent) + Send + Sync,
{
    fn on_event(&self, event: &LedgerEvent) {
        self(event)
    }
}
