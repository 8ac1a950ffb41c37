//! # Secretary Crypt
//!
//! Envelope encryption for shared notes.
//!
//! ## Encryption Model
//!
//! Note content uses a two-layer key model:
//!
//! 1. **Content Key**: A fresh symmetric key (ChaCha20-Poly1305) seals the note body
//! 2. **Wrapped Keys**: The content key is sealed to each recipient via X25519 ECDH
//!
//! The ciphertext is recipient-independent. Each recipient stores only their
//! own wrapped key.
//!
//! ## Private Keys
//!
//! Users hold their X25519 secret in an armored file sealed under a
//! passphrase (Argon2id + ChaCha20-Poly1305). See [`keyfile`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use secretary_crypt::{EnvelopeCipher, KdfParams, ProtectedPrivateKey, X25519StaticSecret};
//!
//! let secret = X25519StaticSecret::generate();
//! let armored = ProtectedPrivateKey::protect(&secret, "passphrase", KdfParams::default())
//!     .unwrap()
//!     .to_armored()
//!     .unwrap();
//!
//! let cipher = EnvelopeCipher::new();
//! let sealed = cipher.seal(b"note body", &[secret.public_key().to_text()]).unwrap();
//! let plain = cipher
//!     .unseal(&sealed.ciphertext, &sealed.wrapped_keys[0], armored.as_bytes(), "passphrase")
//!     .unwrap();
//! assert_eq!(plain.as_slice(), b"note body");
//! ```

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod keyfile;
pub mod wrap;

pub use crypto::{
    EncryptionNonce, EphemeralKeyPair, SharedKey, SymmetricKey, X25519PublicKey,
    X25519StaticSecret, PUBLIC_KEY_PREFIX,
};
pub use envelope::{EnvelopeCipher, SealedPayload};
pub use error::{CryptError, Result};
pub use keyfile::{unlock_private_key, KdfParams, ProtectedPrivateKey};
pub use wrap::WrappedKey;
