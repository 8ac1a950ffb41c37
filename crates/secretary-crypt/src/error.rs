//! Error types for the envelope cipher.

use secretary_core::ValidationError;
use thiserror::Error;

/// Errors that can occur while sealing or unsealing.
///
/// `KeyUnreadable` (the private key could not be opened) is kept apart from
/// `UnsealFailure` (the key opened but the wrapped key or ciphertext did not).
#[derive(Debug, Error)]
pub enum CryptError {
    /// A required argument was empty.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A recipient public key could not be parsed or used.
    #[error("invalid public key: {0}")]
    InvalidKey(String),

    /// The private key is malformed or the passphrase is wrong.
    #[error("private key unreadable: {0}")]
    KeyUnreadable(String),

    /// The encryption primitive failed while sealing.
    #[error("seal failed: {0}")]
    SealFailure(String),

    /// Unwrapping or decryption failed.
    #[error("unseal failed: {0}")]
    UnsealFailure(String),

    /// Passphrase key derivation failed.
    #[error("key derivation error: {0}")]
    KeyDerivation(String),

    /// Encoding of a binary structure failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for cipher operations.
pub type Result<T> = std::result::Result<T, CryptError>;
