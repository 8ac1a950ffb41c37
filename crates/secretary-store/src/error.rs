//! Error types for the store module.

use thiserror::Error;

/// Errors reported by a collaborator backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller holds no access to the requested entity.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The entity already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored data could not be mapped back to the domain model.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The backend could not serve the call at all.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
