//! Collaborator interfaces consumed by the Secretary client.
//!
//! One trait per collaborator kind. A backend that implements all of them is
//! a [`Backend`]; the client is generic over that bound, so the choice of
//! implementation is made at compile time.

use std::sync::Arc;

use async_trait::async_trait;
use secretary_core::{AccessRecord, Group, GroupId, NewNote, Note, NoteId, User, UserId};

use crate::error::Result;

/// Persists note ciphertext and metadata.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Store a new note; the backend assigns its id and timestamps.
    async fn create_note(&self, note: &NewNote) -> Result<Note>;

    /// Fetch a note on behalf of `reader`.
    ///
    /// - `NotFound` if no such note exists.
    /// - `Forbidden` if `reader` holds no readable access record for it.
    async fn get_note(&self, note_id: NoteId, reader: UserId) -> Result<Note>;

    /// Replace title and ciphertext, bumping `updated_at`.
    async fn update_note(&self, note_id: NoteId, title: &str, ciphertext: &[u8]) -> Result<Note>;

    /// Delete a note together with all of its access records.
    async fn delete_note(&self, note_id: NoteId) -> Result<()>;
}

/// Persists the per-(note, user) access ledger.
#[async_trait]
pub trait AccessRecordStore: Send + Sync {
    /// Insert a record. `Conflict` if one already exists for the pair.
    async fn create_access(&self, record: &AccessRecord) -> Result<()>;

    /// Replace the wrapped key of an existing record. Flags are left untouched.
    async fn update_wrapped_key(
        &self,
        user_id: UserId,
        note_id: NoteId,
        wrapped_key: &[u8],
    ) -> Result<()>;

    /// The record for `(note_id, user_id)`, if any.
    async fn get_access(&self, note_id: NoteId, user_id: UserId) -> Result<Option<AccessRecord>>;

    /// Every record of a note, in creation order.
    async fn list_by_note(&self, note_id: NoteId) -> Result<Vec<AccessRecord>>;
}

/// Resolves a user to their current public key.
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// The textual public key currently registered for `user_id`.
    async fn public_key(&self, user_id: UserId) -> Result<String>;
}

/// Group membership lookups.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    async fn group(&self, group_id: GroupId) -> Result<Group>;

    /// Every group `user_id` belongs to, ordered by id.
    async fn groups_for_user(&self, user_id: UserId) -> Result<Vec<Group>>;
}

/// User profile lookups.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Users for `ids`, in the order requested. `NotFound` if any is unknown.
    async fn users(&self, ids: &[UserId]) -> Result<Vec<User>>;
}

/// Every collaborator the client needs, in one bound.
pub trait Backend: NoteStore + AccessRecordStore + KeyDirectory + GroupDirectory + UserDirectory {}

impl<T> Backend for T where
    T: NoteStore + AccessRecordStore + KeyDirectory + GroupDirectory + UserDirectory + ?Sized
{
}

// Shared backends: an `Arc` forwards to what it points at.

#[async_trait]
impl<T: NoteStore + ?Sized> NoteStore for Arc<T> {
    async fn create_note(&self, note: &NewNote) -> Result<Note> {
        (**self).create_note(note).await
    }

    async fn get_note(&self, note_id: NoteId, reader: UserId) -> Result<Note> {
        (**self).get_note(note_id, reader).await
    }

    async fn update_note(&self, note_id: NoteId, title: &str, ciphertext: &[u8]) -> Result<Note> {
        (**self).update_note(note_id, title, ciphertext).await
    }

    async fn delete_note(&self, note_id: NoteId) -> Result<()> {
        (**self).delete_note(note_id).await
    }
}

#[async_trait]
impl<T: AccessRecordStore + ?Sized> AccessRecordStore for Arc<T> {
    async fn create_access(&self, record: &AccessRecord) -> Result<()> {
        (**self).create_access(record).await
    }

    async fn update_wrapped_key(
        &self,
        user_id: UserId,
        note_id: NoteId,
        wrapped_key: &[u8],
    ) -> Result<()> {
        (**self).update_wrapped_key(user_id, note_id, wrapped_key).await
    }

    async fn get_access(&self, note_id: NoteId, user_id: UserId) -> Result<Option<AccessRecord>> {
        (**self).get_access(note_id, user_id).await
    }

    async fn list_by_note(&self, note_id: NoteId) -> Result<Vec<AccessRecord>> {
        (**self).list_by_note(note_id).await
    }
}

#[async_trait]
impl<T: KeyDirectory + ?Sized> KeyDirectory for Arc<T> {
    async fn public_key(&self, user_id: UserId) -> Result<String> {
        (**self).public_key(user_id).await
    }
}

#[async_trait]
impl<T: GroupDirectory + ?Sized> GroupDirectory for Arc<T> {
    async fn group(&self, group_id: GroupId) -> Result<Group> {
        (**self).group(group_id).await
    }

    async fn groups_for_user(&self, user_id: UserId) -> Result<Vec<Group>> {
        (**self).groups_for_user(user_id).await
    }
}

#[async_trait]
impl<T: UserDirectory + ?Sized> UserDirectory for Arc<T> {
    async fn users(&self, ids: &[UserId]) -> Result<Vec<User>> {
        (**self).users(ids).await
    }
}
