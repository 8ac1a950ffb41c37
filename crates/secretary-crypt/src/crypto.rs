//! Cryptographic primitives for envelope encryption.
//!
//! X25519 key agreement, BLAKE3 key derivation and ChaCha20-Poly1305
//! authenticated encryption, wrapped in types that wipe themselves on drop.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CryptError, Result};

/// Prefix of the textual public key form held by the Key Directory.
pub const PUBLIC_KEY_PREFIX: &str = "x25519:";

/// An X25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; 32]);

impl X25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to x25519-dalek PublicKey.
    pub fn to_dalek(&self) -> PublicKey {
        PublicKey::from(self.0)
    }

    /// Parse the textual form `x25519:<base64>`.
    pub fn parse(text: &str) -> Result<Self> {
        let encoded = text
            .trim()
            .strip_prefix(PUBLIC_KEY_PREFIX)
            .ok_or_else(|| CryptError::InvalidKey(format!("missing `{PUBLIC_KEY_PREFIX}` prefix")))?;

        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| CryptError::InvalidKey(format!("invalid base64: {e}")))?;

        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            CryptError::InvalidKey(format!("expected 32 key bytes, got {}", bytes.len()))
        })?;

        Ok(Self(arr))
    }

    /// Render the textual form `x25519:<base64>`.
    pub fn to_text(&self) -> String {
        format!("{PUBLIC_KEY_PREFIX}{}", STANDARD.encode(self.0))
    }

    /// Short BLAKE3 fingerprint, safe to log.
    pub fn fingerprint(&self) -> String {
        hex::encode(&blake3::hash(&self.0).as_bytes()[..8])
    }
}

impl fmt::Debug for X25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X25519Pub({})", self.fingerprint())
    }
}

impl fmt::Display for X25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<PublicKey> for X25519PublicKey {
    fn from(pk: PublicKey) -> Self {
        Self(*pk.as_bytes())
    }
}

/// An X25519 static secret key. Wiped on drop.
pub struct X25519StaticSecret(StaticSecret);

impl X25519StaticSecret {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(bytes.as_mut());
        Self(StaticSecret::from(*bytes))
    }

    /// Create from raw secret bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Raw secret bytes, in a buffer that is wiped on drop.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.0.to_bytes())
    }

    /// Derive the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey::from(PublicKey::from(&self.0))
    }

    /// Key agreement with a peer's public key.
    ///
    /// Returns `None` when the peer key is a low-order point and the
    /// agreement contributes nothing secret.
    pub fn diffie_hellman(&self, peer_public: &X25519PublicKey) -> Option<SharedKey> {
        let shared = self.0.diffie_hellman(&peer_public.to_dalek());
        shared
            .was_contributory()
            .then(|| SharedKey(*shared.as_bytes()))
    }
}

impl fmt::Debug for X25519StaticSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("X25519StaticSecret")
            .field(&"[REDACTED]")
            .finish()
    }
}

/// A shared secret derived from X25519 key agreement.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; 32]);

impl SharedKey {
    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive a key-wrapping key bound to both ends of the agreement.
    pub fn derive_wrapping_key(
        &self,
        ephemeral_public: &X25519PublicKey,
        recipient_public: &X25519PublicKey,
    ) -> SymmetricKey {
        let mut hasher = blake3::Hasher::new_derive_key("secretary v1 content-key wrap");
        hasher.update(&self.0);
        hasher.update(ephemeral_public.as_bytes());
        hasher.update(recipient_public.as_bytes());
        SymmetricKey(*hasher.finalize().as_bytes())
    }
}

/// A 256-bit symmetric key for ChaCha20-Poly1305. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; 32]);

impl SymmetricKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encrypt data with this key.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CryptError::SealFailure(e.to_string()))?;

        cipher
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| CryptError::SealFailure(e.to_string()))
    }

    /// Decrypt data with this key.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CryptError::UnsealFailure(e.to_string()))?;

        cipher
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|e| CryptError::UnsealFailure(e.to_string()))
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SymmetricKey").field(&"[REDACTED]").finish()
    }
}

/// Size of a ChaCha20-Poly1305 nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of the Poly1305 authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; NONCE_SIZE]);

impl EncryptionNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// Ephemeral key pair for one-time key agreement.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: X25519PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a new ephemeral key pair.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = X25519PublicKey::from(PublicKey::from(&secret));
        Self { secret, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    /// Key agreement with a peer's public key. Consumes the secret.
    ///
    /// Returns `None` for a non-contributory (low-order) peer key.
    pub fn diffie_hellman(self, peer_public: &X25519PublicKey) -> Option<SharedKey> {
        let shared = self.secret.diffie_hellman(&peer_public.to_dalek());
        shared
            .was_contributory()
            .then(|| SharedKey(*shared.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x25519_key_agreement() {
        let alice_secret = X25519StaticSecret::generate();
        let bob_secret = X25519StaticSecret::generate();

        let alice_shared = alice_secret.diffie_hellman(&bob_secret.public_key()).unwrap();
        let bob_shared = bob_secret.diffie_hellman(&alice_secret.public_key()).unwrap();

        assert_eq!(alice_shared.as_bytes(), bob_shared.as_bytes());
    }

    #[test]
    fn test_ephemeral_key_agreement() {
        let bob_secret = X25519StaticSecret::generate();
        let bob_public = bob_secret.public_key();

        let alice_ephemeral = EphemeralKeyPair::generate();
        let alice_ephemeral_public = alice_ephemeral.public_key();

        let alice_shared = alice_ephemeral.diffie_hellman(&bob_public).unwrap();
        let bob_shared = bob_secret.diffie_hellman(&alice_ephemeral_public).unwrap();

        assert_eq!(alice_shared.as_bytes(), bob_shared.as_bytes());
    }

    #[test]
    fn test_low_order_point_rejected() {
        let secret = X25519StaticSecret::generate();
        let identity = X25519PublicKey::from_bytes([0u8; 32]);

        assert!(secret.diffie_hellman(&identity).is_none());
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = SymmetricKey::generate();
        let nonce = EncryptionNonce::generate();

        let ciphertext = key.encrypt(b"hello, world!", &nonce).unwrap();
        assert_ne!(ciphertext, b"hello, world!");
        assert_eq!(ciphertext.len(), b"hello, world!".len() + TAG_SIZE);

        let decrypted = key.decrypt(&ciphertext, &nonce).unwrap();
        assert_eq!(decrypted, b"hello, world!");
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let key1 = SymmetricKey::generate();
        let key2 = SymmetricKey::generate();
        let nonce = EncryptionNonce::generate();

        let ciphertext = key1.encrypt(b"secret", &nonce).unwrap();

        assert!(matches!(
            key2.decrypt(&ciphertext, &nonce),
            Err(CryptError::UnsealFailure(_))
        ));
    }

    #[test]
    fn test_wrapping_key_binds_both_publics() {
        let shared = SharedKey([0x42; 32]);
        let a = X25519PublicKey::from_bytes([1; 32]);
        let b = X25519PublicKey::from_bytes([2; 32]);

        let k1 = shared.derive_wrapping_key(&a, &b);
        let k2 = shared.derive_wrapping_key(&a, &b);
        let swapped = shared.derive_wrapping_key(&b, &a);

        assert_eq!(k1.as_bytes(), k2.as_bytes());
        assert_ne!(k1.as_bytes(), swapped.as_bytes());
    }

    #[test]
    fn test_public_key_text_form() {
        let public = X25519StaticSecret::generate().public_key();
        let text = public.to_text();

        assert!(text.starts_with(PUBLIC_KEY_PREFIX));
        assert_eq!(X25519PublicKey::parse(&text).unwrap(), public);
    }

    #[test]
    fn test_public_key_parse_errors() {
        assert!(matches!(
            X25519PublicKey::parse("AAAA"),
            Err(CryptError::InvalidKey(_))
        ));
        assert!(matches!(
            X25519PublicKey::parse("x25519:%%%"),
            Err(CryptError::InvalidKey(_))
        ));
        assert!(matches!(
            X25519PublicKey::parse("x25519:AAAA"),
            Err(CryptError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = X25519StaticSecret::generate();
        assert!(format!("{secret:?}").contains("REDACTED"));
    }
}
