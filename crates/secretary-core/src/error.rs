//! Error types for Secretary Core.

use thiserror::Error;

/// Errors raised while converting between wire shapes and domain types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid base64 in field `{field}`: {reason}")]
    InvalidBase64 { field: &'static str, reason: String },

    #[error("invalid flag in field `{field}`: expected 0 or 1, got {value}")]
    InvalidFlag { field: &'static str, value: i64 },

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// A required input was missing or empty.
///
/// Raised before any cryptographic or backend work is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("required field `{0}` is empty")]
    Empty(&'static str),

    #[error("recipient list is empty")]
    NoRecipients,

    #[error("user {user} is not a member of group {group}")]
    NotAGroupMember { user: u64, group: u64 },

    #[error("invalid field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
