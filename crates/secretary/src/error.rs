//! Error types for client operations.

use std::fmt;

use secretary_core::{NoteId, UserId, ValidationError};
use secretary_crypt::CryptError;
use secretary_store::StoreError;
use thiserror::Error;

/// Which collaborator a backend failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    NoteStore,
    AccessRecordStore,
    KeyDirectory,
    GroupDirectory,
    UserDirectory,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoteStore => "note store",
            Self::AccessRecordStore => "access record store",
            Self::KeyDirectory => "key directory",
            Self::GroupDirectory => "group directory",
            Self::UserDirectory => "user directory",
        })
    }
}

/// Errors that can occur during client operations.
///
/// Cryptographic and permission failures abort before anything is written.
/// Backend failures are surfaced as reported, never retried.
#[derive(Debug, Error)]
pub enum SecretaryError {
    /// An argument was empty or out of range.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A recipient public key could not be parsed.
    #[error("invalid public key: {0}")]
    InvalidKey(String),

    /// The caller's private key could not be opened.
    #[error("private key unreadable: {0}")]
    KeyUnreadable(String),

    #[error("seal failed: {0}")]
    SealFailure(String),

    #[error("unseal failed: {0}")]
    UnsealFailure(String),

    /// The Key Directory could not produce a recipient's public key.
    #[error("public key of user {user} unavailable: {source}")]
    RecipientKeyUnavailable {
        user: UserId,
        #[source]
        source: StoreError,
    },

    /// The caller's access record does not grant write.
    #[error("user {user} may not modify note {note}")]
    PermissionDenied { user: UserId, note: NoteId },

    #[error("not found: {0}")]
    NotFound(String),

    /// The backend refused the caller read access.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// A collaborator call failed.
    #[error("{collaborator} failed: {source}")]
    Backend {
        collaborator: Collaborator,
        #[source]
        source: StoreError,
    },

    /// The note was written but not every recipient's access record was.
    ///
    /// Recipients in `pending` hold a wrapped key that does not open the
    /// stored ciphertext until the operation is repeated to completion.
    #[error(
        "note {note} partially committed: {} recipient(s) updated, {} pending; {collaborator} failed: {source}",
        .committed.len(),
        .pending.len()
    )]
    PartialCommit {
        note: NoteId,
        committed: Vec<UserId>,
        pending: Vec<UserId>,
        collaborator: Collaborator,
        #[source]
        source: StoreError,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl SecretaryError {
    /// Map a store error raised by `collaborator`.
    ///
    /// Missing entities and refused reads keep their meaning; anything else
    /// is tagged with the collaborator that failed.
    pub fn from_store(collaborator: Collaborator, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Forbidden(what) => Self::NotAuthorized(what),
            source => Self::Backend {
                collaborator,
                source,
            },
        }
    }

    pub(crate) fn store(collaborator: Collaborator) -> impl FnOnce(StoreError) -> Self {
        move |err| Self::from_store(collaborator, err)
    }
}

impl From<CryptError> for SecretaryError {
    fn from(err: CryptError) -> Self {
        match err {
            CryptError::Validation(e) => Self::Validation(e),
            CryptError::InvalidKey(msg) => Self::InvalidKey(msg),
            CryptError::KeyUnreadable(msg) | CryptError::KeyDerivation(msg) => {
                Self::KeyUnreadable(msg)
            }
            CryptError::SealFailure(msg) | CryptError::Serialization(msg) => Self::SealFailure(msg),
            CryptError::UnsealFailure(msg) => Self::UnsealFailure(msg),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, SecretaryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_keep_meaning() {
        let err = SecretaryError::from_store(
            Collaborator::NoteStore,
            StoreError::Forbidden("note 1".into()),
        );
        assert!(matches!(err, SecretaryError::NotAuthorized(_)));

        let err = SecretaryError::from_store(
            Collaborator::NoteStore,
            StoreError::NotFound("note 1".into()),
        );
        assert!(matches!(err, SecretaryError::NotFound(_)));
    }

    #[test]
    fn test_backend_errors_are_tagged() {
        let err = SecretaryError::from_store(
            Collaborator::AccessRecordStore,
            StoreError::Unavailable("down".into()),
        );
        assert!(matches!(
            err,
            SecretaryError::Backend {
                collaborator: Collaborator::AccessRecordStore,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "access record store failed: backend unavailable: down"
        );
    }

    #[test]
    fn test_partial_commit_message() {
        let err = SecretaryError::PartialCommit {
            note: NoteId::new(4),
            committed: vec![UserId::new(1)],
            pending: vec![UserId::new(2), UserId::new(3)],
            collaborator: Collaborator::AccessRecordStore,
            source: StoreError::Unavailable("down".into()),
        };
        assert!(err
            .to_string()
            .starts_with("note 4 partially committed: 1 recipient(s) updated, 2 pending"));
    }

    #[test]
    fn test_crypt_errors_map_one_to_one() {
        let err: SecretaryError = CryptError::KeyUnreadable("bad".into()).into();
        assert!(matches!(err, SecretaryError::KeyUnreadable(_)));

        let err: SecretaryError = CryptError::UnsealFailure("bad".into()).into();
        assert!(matches!(err, SecretaryError::UnsealFailure(_)));
    }
}
