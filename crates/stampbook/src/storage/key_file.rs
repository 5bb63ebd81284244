//! Key files — a named Ed25519 key pair stored as JSON.
//!
//! File format:
//! ```json
//! {
//!     "version": 1,
//!     "name": "alice",
//!     "principal": "0x…",
//!     "secret_key": "…hex…"
//! }
//! ```
//!
//! The secret is stored unencrypted; key custody is the operator's
//! responsibility. On unix the file is created owner-only (0600).

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::SignerKeyPair;
use crate::error::{Result, StampbookError};
use crate::principal::Principal;

const KEY_FILE_VERSION: u32 = 1;

/// On-disk representation of a key pair. The hex secret is wiped on drop.
#[derive(Serialize, Deserialize, ZeroizeOnDrop)]
pub struct KeyFile {
    #[zeroize(skip)]
    pub version: u32,
    #[zeroize(skip)]
    pub name: String,
    #[zeroize(skip)]
    pub principal: Principal,
    secret_key: String,
}

impl KeyFile {
    /// Capture a key pair under `name`.
    pub fn from_key_pair(name: &str, key_pair: &SignerKeyPair) -> Self {
        let mut secret = key_pair.signing_key_bytes();
        let secret_key = hex::encode(secret);
        secret.zeroize();
        Self {
            version: KEY_FILE_VERSION,
            name: name.to_string(),
            principal: key_pair.principal(),
            secret_key,
        }
    }

    /// Rebuild the key pair, checking it matches the recorded principal.
    pub fn key_pair(&self) -> Result<SignerKeyPair> {
        let mut bytes = hex::decode(&self.secret_key)
            .map_err(|e| StampbookError::InvalidKey(format!("invalid secret key hex: {e}")))?;
        let secret: std::result::Result<[u8; 32], _> = bytes.as_slice().try_into();
        bytes.zeroize();
        let mut secret = secret
            .map_err(|_| StampbookError::InvalidKey("secret key must be 32 bytes".into()))?;
        let key_pair = SignerKeyPair::from_signing_key_bytes(&secret);
        secret.zeroize();
        if key_pair.principal() != self.principal {
            return Err(StampbookError::InvalidKey(format!(
                "key file {} does not match principal {}",
                self.name, self.principal
            )));
        }
        Ok(key_pair)
    }

    /// Write the key file, refusing to overwrite an existing one.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|e| StampbookError::SerializationError(e.to_string()))?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let written = match options.open(path) {
            Ok(mut file) => file.write_all(json.as_bytes()).map_err(StampbookError::from),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StampbookError::StorageError(format!(
                    "key file already exists: {}",
                    path.display()
                )))
            }
            Err(e) => Err(e.into()),
        };
        json.zeroize();
        written
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let file: Self = serde_json::from_slice(&bytes).map_err(|e| {
            StampbookError::InvalidFileFormat(format!(
                "failed to parse key file {}: {e}",
                path.display()
            ))
        })?;
        if file.version != KEY_FILE_VERSION {
            return Err(StampbookError::InvalidFileFormat(format!(
                "unsupported key file version {}",
                file.version
            )));
        }
        Ok(file)
    }
}
