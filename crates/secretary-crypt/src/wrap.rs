//! Per-recipient content key wrapping.
//!
//! Each recipient gets the content key sealed to their X25519 public key via
//! a fresh ephemeral key agreement. The wrapped form is CBOR-encoded and is
//! what an access record stores as its opaque key blob.

use serde::{Deserialize, Serialize};

use crate::crypto::{
    EncryptionNonce, EphemeralKeyPair, SymmetricKey, X25519PublicKey, X25519StaticSecret,
};
use crate::error::{CryptError, Result};

/// A content key sealed for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    /// Sender's side of the key agreement.
    pub ephemeral_public: X25519PublicKey,

    /// Nonce used to seal the content key.
    pub nonce: EncryptionNonce,

    /// The content key, sealed with the derived wrapping key.
    pub ciphertext: Vec<u8>,
}

impl WrappedKey {
    /// Seal `content_key` so only the holder of `recipient`'s secret can open it.
    pub fn wrap(content_key: &SymmetricKey, recipient: &X25519PublicKey) -> Result<Self> {
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();

        let shared = ephemeral.diffie_hellman(recipient).ok_or_else(|| {
            CryptError::InvalidKey(format!("non-contributory key {}", recipient.fingerprint()))
        })?;
        let wrapping_key = shared.derive_wrapping_key(&ephemeral_public, recipient);

        let nonce = EncryptionNonce::generate();
        let ciphertext = wrapping_key.encrypt(content_key.as_bytes(), &nonce)?;

        Ok(Self {
            ephemeral_public,
            nonce,
            ciphertext,
        })
    }

    /// Recover the content key with the recipient's secret.
    pub fn unwrap(&self, recipient_secret: &X25519StaticSecret) -> Result<SymmetricKey> {
        let recipient_public = recipient_secret.public_key();
        let shared = recipient_secret
            .diffie_hellman(&self.ephemeral_public)
            .ok_or_else(|| CryptError::UnsealFailure("non-contributory ephemeral key".into()))?;
        let wrapping_key = shared.derive_wrapping_key(&self.ephemeral_public, &recipient_public);

        let key_bytes = zeroize::Zeroizing::new(wrapping_key.decrypt(&self.ciphertext, &self.nonce)?);

        let arr: [u8; 32] = key_bytes.as_slice().try_into().map_err(|_| {
            CryptError::UnsealFailure(format!(
                "invalid content key length: expected 32, got {}",
                key_bytes.len()
            ))
        })?;
        Ok(SymmetricKey::from_bytes(arr))
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CryptError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CryptError::Serialization(e.to_string()))
    }
}
