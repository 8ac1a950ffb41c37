//! Envelope encryption of note content.
//!
//! Content is sealed once under a fresh random content key; that key is then
//! wrapped separately for each recipient. The ciphertext does not depend on
//! who the recipients are, so adding a reader only adds a wrapped key.
//!
//! Ciphertext layout is `nonce (12 bytes) || ChaCha20-Poly1305 output`, so a
//! modified ciphertext fails authentication on unseal instead of producing
//! garbage plaintext.

use zeroize::Zeroizing;

use secretary_core::wire::{encode_b64, MultiRecipientPayload, SingleRecipientPayload};
use secretary_core::{require_bytes, ValidationError};

use crate::crypto::{
    EncryptionNonce, SymmetricKey, X25519PublicKey, X25519StaticSecret, NONCE_SIZE, TAG_SIZE,
};
use crate::error::{CryptError, Result};
use crate::keyfile::unlock_private_key;
use crate::wrap::WrappedKey;

/// Output of [`EnvelopeCipher::seal`].
///
/// `wrapped_keys[i]` belongs to the i-th recipient key passed to `seal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload {
    pub ciphertext: Vec<u8>,
    pub wrapped_keys: Vec<Vec<u8>>,
}

impl SealedPayload {
    pub fn recipient_count(&self) -> usize {
        self.wrapped_keys.len()
    }

    /// Wire form for a note sealed to exactly one recipient.
    pub fn to_single_wire(&self) -> Result<SingleRecipientPayload> {
        match self.wrapped_keys.as_slice() {
            [only] => Ok(SingleRecipientPayload {
                content: encode_b64(&self.ciphertext),
                e_key: encode_b64(only),
            }),
            keys => Err(ValidationError::Invalid {
                field: "wrapped_keys",
                reason: format!("expected exactly one wrapped key, got {}", keys.len()),
            }
            .into()),
        }
    }

    /// Wire form for a note sealed to any number of recipients.
    pub fn to_multi_wire(&self) -> MultiRecipientPayload {
        MultiRecipientPayload {
            content: encode_b64(&self.ciphertext),
            ekeys: self.wrapped_keys.iter().map(|k| encode_b64(k)).collect(),
        }
    }
}

/// Seals and unseals note content.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeCipher;

impl EnvelopeCipher {
    pub fn new() -> Self {
        Self
    }

    /// Seal `plaintext` for the given textual public keys.
    ///
    /// All keys are parsed before anything is encrypted, so an invalid key
    /// produces no output at all.
    pub fn seal<K: AsRef<str>>(
        &self,
        plaintext: &[u8],
        recipient_public_keys: &[K],
    ) -> Result<SealedPayload> {
        if recipient_public_keys.is_empty() {
            return Err(ValidationError::NoRecipients.into());
        }

        let recipients = recipient_public_keys
            .iter()
            .map(|k| X25519PublicKey::parse(k.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        self.seal_for(plaintext, &recipients)
    }

    /// Seal `plaintext` for already-parsed public keys.
    pub fn seal_for(
        &self,
        plaintext: &[u8],
        recipients: &[X25519PublicKey],
    ) -> Result<SealedPayload> {
        if recipients.is_empty() {
            return Err(ValidationError::NoRecipients.into());
        }

        let content_key = SymmetricKey::generate();
        let ciphertext = encrypt_content(&content_key, plaintext)?;

        let wrapped_keys = recipients
            .iter()
            .map(|recipient| WrappedKey::wrap(&content_key, recipient)?.to_bytes())
            .collect::<Result<Vec<_>>>()?;

        Ok(SealedPayload {
            ciphertext,
            wrapped_keys,
        })
    }

    /// Recover plaintext from a ciphertext, the caller's wrapped key, their
    /// armored private key file and its passphrase.
    pub fn unseal(
        &self,
        ciphertext: &[u8],
        wrapped_key: &[u8],
        private_key: &[u8],
        passphrase: &str,
    ) -> Result<Zeroizing<Vec<u8>>> {
        require_bytes("ciphertext", ciphertext)?;
        require_bytes("wrapped_key", wrapped_key)?;
        require_bytes("private_key", private_key)?;
        require_bytes("passphrase", passphrase.as_bytes())?;

        let secret = unlock_private_key(private_key, passphrase)?;
        self.unseal_with(ciphertext, wrapped_key, &secret)
    }

    /// Recover plaintext with an already-unlocked secret.
    pub fn unseal_with(
        &self,
        ciphertext: &[u8],
        wrapped_key: &[u8],
        secret: &X25519StaticSecret,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let wrapped = WrappedKey::from_bytes(wrapped_key)
            .map_err(|e| CryptError::UnsealFailure(format!("malformed wrapped key: {e}")))?;
        let content_key = wrapped.unwrap(secret)?;

        decrypt_content(&content_key, ciphertext)
    }
}

fn encrypt_content(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let nonce = EncryptionNonce::generate();
    let sealed = key.encrypt(plaintext, &nonce)?;

    let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
    out.extend_from_slice(nonce.as_bytes());
    out.extend_from_slice(&sealed);
    Ok(out)
}

fn decrypt_content(key: &SymmetricKey, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptError::UnsealFailure(format!(
            "ciphertext too short: {} bytes",
            ciphertext.len()
        )));
    }

    let (nonce, sealed) = ciphertext.split_at(NONCE_SIZE);
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    nonce_bytes.copy_from_slice(nonce);

    key.decrypt(sealed, &EncryptionNonce::from_bytes(nonce_bytes))
        .map(Zeroizing::new)
}
