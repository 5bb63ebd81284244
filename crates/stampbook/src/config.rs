//! Ledger policy configuration.
//!
//! Cooldown length and identity uniqueness are policy, not protocol, so
//! they live here rather than as constants. Configuration files are JSON;
//! any field left out takes its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StampbookError};

/// Default per-creator event cooldown (one hour).
pub const DEFAULT_EVENT_COOLDOWN_SECS: u64 = 3600;

/// Default execution-context identifier mixed into every signed claim.
pub const DEFAULT_CONTEXT_ID: u64 = 1;

/// Default maximum event name length, in characters.
pub const DEFAULT_MAX_NAME_LEN: usize = 100;

/// Default maximum event description length, in characters.
pub const DEFAULT_MAX_DESCRIPTION_LEN: usize = 500;

/// How many passports a single principal may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityMode {
    /// At most one passport per principal.
    #[default]
    Unique,
    /// Any number of passports per principal.
    Unrestricted,
}

/// Policy knobs for a ledger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StampbookConfig {
    pub identity_mode: IdentityMode,
    /// Seconds a principal must wait between event creations. Zero disables.
    pub event_cooldown_secs: u64,
    /// Execution context bound into claim signatures.
    pub context_id: u64,
    pub max_name_len: usize,
    pub max_description_len: usize,
}

impl Default for StampbookConfig {
    fn default() -> Self {
        Self {
            identity_mode: IdentityMode::Unique,
            event_cooldown_secs: DEFAULT_EVENT_COOLDOWN_SECS,
            context_id: DEFAULT_CONTEXT_ID,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            max_description_len: DEFAULT_MAX_DESCRIPTION_LEN,
        }
    }
}

impl StampbookConfig {
    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&bytes).map_err(|e| {
            StampbookError::InvalidFileFormat(format!(
                "failed to parse config {}: {e}",
                path.display()
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no event could ever satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.max_name_len == 0 {
            return Err(StampbookError::invalid_input(
                "max_name_len",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Builder-style override of the identity mode.
    pub fn with_identity_mode(mut self, mode: IdentityMode) -> Self {
        self.identity_mode = mode;
        self
    }

    /// Builder-style override of the event cooldown.
    pub fn with_event_cooldown(mut self, secs: u64) -> Self {
        self.event_cooldown_secs = secs;
        self
    }

    /// Builder-style override of the context id.
    pub fn with_context_id(mut self, context_id: u64) -> Self {
        self.context_id = context_id;
        self
    }
}
