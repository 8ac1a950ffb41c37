//! Client configuration.
//!
//! A `ClientConfig` is an explicit value owned by the client. It is read from
//! the same camelCase JSON the command-line client keeps on disk:
//!
//! ```json
//! {
//!   "apiUrl": "https://notes.example.com/api",
//!   "username": "alice@example.com",
//!   "userId": 7,
//!   "publicKey": "x25519:...",
//!   "privateKeyPath": "/home/alice/.secretary/private.key"
//! }
//! ```
//!
//! Passphrases are never part of the configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use secretary_core::UserId;
use secretary_crypt::X25519PublicKey;

use crate::error::{Result, SecretaryError};

/// Identity and key locations of the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the storage backend.
    pub api_url: String,
    pub username: String,
    pub user_id: UserId,
    /// The acting user's public key, textual form.
    pub public_key: String,
    /// Armored, passphrase-protected private key file.
    pub private_key_path: PathBuf,
}

impl ClientConfig {
    /// Read and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            SecretaryError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SecretaryError::Config(format!("malformed configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every field is present and the public key parses.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("apiUrl", &self.api_url), ("username", &self.username)] {
            if value.trim().is_empty() {
                return Err(SecretaryError::Config(format!("{field} is empty")));
            }
        }
        if self.private_key_path.as_os_str().is_empty() {
            return Err(SecretaryError::Config("privateKeyPath is empty".into()));
        }
        X25519PublicKey::parse(&self.public_key)
            .map_err(|e| SecretaryError::Config(format!("publicKey: {e}")))?;
        Ok(())
    }

    /// Read the private key file as opaque bytes.
    pub fn read_private_key(&self) -> Result<Zeroizing<Vec<u8>>> {
        std::fs::read(&self.private_key_path)
            .map(Zeroizing::new)
            .map_err(|e| {
                SecretaryError::Config(format!(
                    "cannot read private key {}: {e}",
                    self.private_key_path.display()
                ))
            })
    }
}
