//! # Secretary
//!
//! Shared notes whose content the storage backend never sees in the clear.
//!
//! ## Overview
//!
//! Each note body is sealed once under a fresh content key. That key is then
//! wrapped separately for every recipient with their X25519 public key, and
//! the backend stores one access record per recipient holding the wrapped key
//! and the recipient's permission flags:
//!
//! - **Private notes**: sealed for the acting user alone, as owner
//! - **Group notes**: sealed for group members picked by a [`RecipientChooser`],
//!   plus the acting user as owner
//! - **Edits**: decrypted, changed by a [`NoteEditor`], then resealed under a
//!   new content key for the note's existing recipients
//!
//! Content is sealed with ChaCha20-Poly1305, so a corrupted or truncated
//! ciphertext is reported as [`SecretaryError::UnsealFailure`] rather than
//! decrypting to garbage.
//!
//! ## Commit Semantics
//!
//! Creating or editing a note writes the note first and the access records
//! after it, one call at a time. These writes are not transactional. If one
//! of the later writes fails the client returns
//! [`SecretaryError::PartialCommit`] naming the recipients that were and were
//! not updated, and does not try to undo anything.
//!
//! Concurrent edits of the same note are last-write-wins: there is no version
//! check between reading the note and writing it back.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use secretary::{ClientConfig, KeyMaterial, NoteEdit, Secretary};
//! use secretary::store::SqliteBackend;
//!
//! async fn example() -> secretary::Result<()> {
//!     let config = ClientConfig::load("secretary.json")?;
//!     let keys = KeyMaterial::from_config(&config, "passphrase")?;
//!     let backend = SqliteBackend::open("notes.db").unwrap();
//!
//!     let client = Secretary::new(config, backend);
//!     let note = client.create_private_note("Groceries", b"milk").await?;
//!
//!     let opened = client.read_note(note.id, &keys).await?;
//!     assert_eq!(opened.content.as_slice(), b"milk");
//!
//!     client
//!         .edit_note(note.id, &keys, &mut |_: &str, _: &[u8]| {
//!             NoteEdit::unchanged().with_content(b"milk, eggs".to_vec())
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `secretary::core` - Identifiers, notes, access records, wire shapes
//! - `secretary::crypt` - Envelope encryption and private key files
//! - `secretary::store` - Collaborator traits, in-memory and SQLite backends

pub mod client;
pub mod config;
pub mod credentials;
pub mod edit;
pub mod error;
mod guard;
pub mod logging;
pub mod recipients;

pub use secretary_core as core;
pub use secretary_crypt as crypt;
pub use secretary_store as store;

pub use client::{OpenedNote, RecipientInfo, Secretary};
pub use config::ClientConfig;
pub use credentials::KeyMaterial;
pub use edit::{EditOutcome, EditState, NoteEdit, NoteEditor};
pub use error::{Collaborator, Result, SecretaryError};
pub use recipients::{AllMembers, Choice, FixedSelection, Recipient, RecipientChooser};

pub use secretary_core::{GroupId, NoteId, Permissions, UserId};
