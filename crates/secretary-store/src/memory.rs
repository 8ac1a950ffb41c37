//! In-memory implementation of the collaborator traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use secretary_core::{
    now_millis, AccessRecord, Group, GroupId, NewNote, Note, NoteId, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::traits::{AccessRecordStore, GroupDirectory, KeyDirectory, NoteStore, UserDirectory};

/// In-memory backend.
///
/// All data is lost when the backend is dropped. Thread-safe via RwLock.
pub struct MemoryBackend {
    inner: RwLock<MemoryBackendInner>,
}

#[derive(Default)]
struct MemoryBackendInner {
    last_user_id: u64,
    last_group_id: u64,
    last_note_id: u64,

    users: BTreeMap<UserId, User>,
    groups: BTreeMap<GroupId, Group>,
    notes: BTreeMap<NoteId, Note>,

    /// Access records per note, in creation order.
    access: BTreeMap<NoteId, Vec<AccessRecord>>,
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryBackendInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryBackendInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryBackendInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    /// Register a user with their textual public key.
    pub fn register_user(&self, email: &str, public_key: &str) -> Result<UserId> {
        let mut inner = self.write()?;

        if inner.users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict(format!("email {email} already registered")));
        }

        inner.last_user_id += 1;
        let id = UserId::new(inner.last_user_id);
        inner.users.insert(
            id,
            User {
                id,
                email: email.to_string(),
                public_key: public_key.to_string(),
            },
        );
        Ok(id)
    }

    /// Replace a user's registered public key.
    pub fn set_public_key(&self, user_id: UserId, public_key: &str) -> Result<()> {
        let mut inner = self.write()?;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))?;
        user.public_key = public_key.to_string();
        Ok(())
    }

    /// Create a group with the given members.
    pub fn create_group(
        &self,
        name: &str,
        members: impl IntoIterator<Item = UserId>,
    ) -> Result<GroupId> {
        let mut inner = self.write()?;

        let members: BTreeSet<UserId> = members.into_iter().collect();
        if let Some(unknown) = members.iter().find(|m| !inner.users.contains_key(*m)) {
            return Err(StoreError::NotFound(format!("user {unknown}")));
        }

        inner.last_group_id += 1;
        let id = GroupId::new(inner.last_group_id);
        inner.groups.insert(
            id,
            Group {
                id,
                name: name.to_string(),
                members,
            },
        );
        Ok(id)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteStore for MemoryBackend {
    async fn create_note(&self, note: &NewNote) -> Result<Note> {
        let mut inner = self.write()?;

        if let Some(group_id) = note.group_id {
            if !inner.groups.contains_key(&group_id) {
                return Err(StoreError::NotFound(format!("group {group_id}")));
            }
        }

        inner.last_note_id += 1;
        let now = now_millis();
        let stored = Note {
            id: NoteId::new(inner.last_note_id),
            title: note.title.clone(),
            ciphertext: note.ciphertext.clone(),
            is_private: note.is_private,
            group_id: note.group_id,
            created_at: now,
            updated_at: now,
        };
        inner.notes.insert(stored.id, stored.clone());
        inner.access.insert(stored.id, Vec::new());

        Ok(stored)
    }

    async fn get_note(&self, note_id: NoteId, reader: UserId) -> Result<Note> {
        let inner = self.read()?;

        let note = inner
            .notes
            .get(&note_id)
            .ok_or_else(|| StoreError::NotFound(format!("note {note_id}")))?;

        let readable = inner
            .access
            .get(&note_id)
            .and_then(|records| records.iter().find(|r| r.user_id == reader))
            .is_some_and(|r| r.permissions.read);
        if !readable {
            return Err(StoreError::Forbidden(format!(
                "user {reader} cannot read note {note_id}"
            )));
        }

        Ok(note.clone())
    }

    async fn update_note(&self, note_id: NoteId, title: &str, ciphertext: &[u8]) -> Result<Note> {
        let mut inner = self.write()?;

        let note = inner
            .notes
            .get_mut(&note_id)
            .ok_or_else(|| StoreError::NotFound(format!("note {note_id}")))?;
        note.title = title.to_string();
        note.ciphertext = ciphertext.to_vec();
        note.updated_at = now_millis().max(note.updated_at);

        Ok(note.clone())
    }

    async fn delete_note(&self, note_id: NoteId) -> Result<()> {
        let mut inner = self.write()?;

        if inner.notes.remove(&note_id).is_none() {
            return Err(StoreError::NotFound(format!("note {note_id}")));
        }
        inner.access.remove(&note_id);
        Ok(())
    }
}

#[async_trait]
impl AccessRecordStore for MemoryBackend {
    async fn create_access(&self, record: &AccessRecord) -> Result<()> {
        let mut inner = self.write()?;

        if !inner.users.contains_key(&record.user_id) {
            return Err(StoreError::NotFound(format!("user {}", record.user_id)));
        }
        let records = inner
            .access
            .get_mut(&record.note_id)
            .ok_or_else(|| StoreError::NotFound(format!("note {}", record.note_id)))?;

        if records.iter().any(|r| r.user_id == record.user_id) {
            return Err(StoreError::Conflict(format!(
                "user {} already has access to note {}",
                record.user_id, record.note_id
            )));
        }

        records.push(record.clone());
        Ok(())
    }

    async fn update_wrapped_key(
        &self,
        user_id: UserId,
        note_id: NoteId,
        wrapped_key: &[u8],
    ) -> Result<()> {
        let mut inner = self.write()?;

        let record = inner
            .access
            .get_mut(&note_id)
            .and_then(|records| records.iter_mut().find(|r| r.user_id == user_id))
            .ok_or_else(|| {
                StoreError::NotFound(format!("access of user {user_id} to note {note_id}"))
            })?;
        record.wrapped_key = wrapped_key.to_vec();
        Ok(())
    }

    async fn get_access(&self, note_id: NoteId, user_id: UserId) -> Result<Option<AccessRecord>> {
        let inner = self.read()?;
        Ok(inner
            .access
            .get(&note_id)
            .and_then(|records| records.iter().find(|r| r.user_id == user_id))
            .cloned())
    }

    async fn list_by_note(&self, note_id: NoteId) -> Result<Vec<AccessRecord>> {
        let inner = self.read()?;
        inner
            .access
            .get(&note_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("note {note_id}")))
    }
}

#[async_trait]
impl KeyDirectory for MemoryBackend {
    async fn public_key(&self, user_id: UserId) -> Result<String> {
        let inner = self.read()?;
        inner
            .users
            .get(&user_id)
            .map(|u| u.public_key.clone())
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))
    }
}

#[async_trait]
impl GroupDirectory for MemoryBackend {
    async fn group(&self, group_id: GroupId) -> Result<Group> {
        let inner = self.read()?;
        inner
            .groups
            .get(&group_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("group {group_id}")))
    }

    async fn groups_for_user(&self, user_id: UserId) -> Result<Vec<Group>> {
        let inner = self.read()?;
        Ok(inner
            .groups
            .values()
            .filter(|g| g.has_member(user_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserDirectory for MemoryBackend {
    async fn users(&self, ids: &[UserId]) -> Result<Vec<User>> {
        let inner = self.read()?;
        ids.iter()
            .map(|id| {
                inner
                    .users
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
            })
            .collect()
    }
}
