//! # Secretary Core
//!
//! Plain data for Secretary: identifiers, notes, access records, and the JSON
//! wire shapes exchanged with the storage backend.
//!
//! This crate contains no I/O and no cryptography. Ciphertext and wrapped keys
//! are opaque byte strings here; `secretary-crypt` gives them meaning.
//!
//! ## Key Types
//!
//! - [`Note`] - Sealed note body plus metadata
//! - [`AccessRecord`] - One recipient's wrapped key and permission flags
//! - [`Permissions`] - The owner/read/write triple
//! - [`User`], [`Group`] - Directory entries
//!
//! ## Wire Format
//!
//! See [`wire`] for the camelCase JSON shapes, base64 payloads and `0|1` flags.

pub mod error;
pub mod ids;
pub mod model;
pub mod validation;
pub mod wire;

pub use error::{CoreError, ValidationError};
pub use ids::{GroupId, NoteId, UserId};
pub use model::{now_millis, AccessRecord, Group, NewNote, Note, Permissions, User};
pub use validation::{require_bytes, require_text};
