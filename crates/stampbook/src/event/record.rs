//! Event records and creation drafts.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StampbookError};
use crate::principal::Principal;

/// Sequential event identifier, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered event. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    pub name: String,
    pub description: String,
    pub icon_url: String,
    /// The only principal whose signatures authorize claims for this event.
    pub signer: Principal,
    pub creator: Principal,
    /// Creation timestamp (seconds since epoch).
    pub created_at: u64,
}

/// Caller-supplied fields for a new event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub name: String,
    pub description: String,
    pub icon_url: String,
    pub signer: Principal,
}

impl EventDraft {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        icon_url: impl Into<String>,
        signer: Principal,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            icon_url: icon_url.into(),
            signer,
        }
    }

    /// Check the draft against length limits and the null signer.
    ///
    /// Lengths are counted in characters, not bytes.
    pub fn validate(&self, max_name_len: usize, max_description_len: usize) -> Result<()> {
        if self.signer.is_zero() {
            return Err(StampbookError::invalid_input(
                "signer",
                "must not be the null principal",
            ));
        }
        let name_len = self.name.chars().count();
        if name_len == 0 {
            return Err(StampbookError::invalid_input("name", "must not be empty"));
        }
        if name_len > max_name_len {
            return Err(StampbookError::invalid_input(
                "name",
                format!("{name_len} characters exceeds maximum of {max_name_len}"),
            ));
        }
        let description_len = self.description.chars().count();
        if description_len > max_description_len {
            return Err(StampbookError::invalid_input(
                "description",
                format!("{description_len} characters exceeds maximum of {max_description_len}"),
            ));
        }
        Ok(())
    }
}
