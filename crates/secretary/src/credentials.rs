//! The caller's secret key material.

use std::fmt;

use zeroize::Zeroizing;

use crate::config::ClientConfig;
use crate::error::Result;

/// The acting user's armored private key and its passphrase.
///
/// Both are wiped when dropped and never leave the process.
pub struct KeyMaterial {
    private_key: Zeroizing<Vec<u8>>,
    passphrase: Zeroizing<String>,
}

impl KeyMaterial {
    pub fn new(private_key: impl Into<Vec<u8>>, passphrase: impl Into<String>) -> Self {
        Self {
            private_key: Zeroizing::new(private_key.into()),
            passphrase: Zeroizing::new(passphrase.into()),
        }
    }

    /// Read the private key named by `config` and pair it with `passphrase`.
    pub fn from_config(config: &ClientConfig, passphrase: impl Into<String>) -> Result<Self> {
        Ok(Self {
            private_key: config.read_private_key()?,
            passphrase: Zeroizing::new(passphrase.into()),
        })
    }

    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("private_key", &"[REDACTED]")
            .field("passphrase", &"[REDACTED]")
            .finish()
    }
}
