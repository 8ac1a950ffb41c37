//! # Secretary Store
//!
//! The collaborators the Secretary client talks to, expressed as traits, plus
//! two reference backends.
//!
//! ## Key Types
//!
//! - [`NoteStore`] - Note ciphertext and metadata
//! - [`AccessRecordStore`] - The per-(note, user) wrapped key and flags
//! - [`KeyDirectory`] - Current public key of a user
//! - [`GroupDirectory`], [`UserDirectory`] - Membership and profile lookups
//! - [`Backend`] - All of the above in one bound
//! - [`MemoryBackend`] - In-memory backend for tests
//! - [`SqliteBackend`] - SQLite-based persistent backend
//!
//! ## Usage
//!
//! ```rust,no_run
//! use secretary_store::{KeyDirectory, SqliteBackend};
//!
//! async fn example() {
//!     let backend = SqliteBackend::open("secretary.db").unwrap();
//!     let alice = backend.register_user("alice@example.com", "x25519:...").await.unwrap();
//!     let key = backend.public_key(alice).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Read enforcement**: `get_note` refuses readers without an access record
//! - **Cascade**: deleting a note deletes its access records
//! - **No cross-store transactions**: the client sequences note and access
//!   writes itself and does not expect them to commit together

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
pub use traits::{AccessRecordStore, Backend, GroupDirectory, KeyDirectory, NoteStore, UserDirectory};
