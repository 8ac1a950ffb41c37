//! Access checks that run before any read or mutation.

use secretary_core::{AccessRecord, Note, NoteId, UserId};
use secretary_store::Backend;

use crate::error::{Collaborator, Result, SecretaryError};

/// A note together with the caller's access record.
#[derive(Debug, Clone)]
pub(crate) struct NoteAccess {
    pub note: Note,
    pub record: AccessRecord,
}

/// Checks the acting user's access to notes.
pub(crate) struct PermissionGuard<'a, B: ?Sized> {
    backend: &'a B,
    user: UserId,
}

impl<'a, B: Backend + ?Sized> PermissionGuard<'a, B> {
    pub(crate) fn new(backend: &'a B, user: UserId) -> Self {
        Self { backend, user }
    }

    /// Fetch a note and the caller's record.
    ///
    /// The Note Store decides read access; its refusals surface as
    /// `NotFound` / `NotAuthorized` without retry.
    pub(crate) async fn fetch(&self, note_id: NoteId) -> Result<NoteAccess> {
        let note = self
            .backend
            .get_note(note_id, self.user)
            .await
            .map_err(SecretaryError::store(Collaborator::NoteStore))?;

        let record = self
            .backend
            .get_access(note_id, self.user)
            .await
            .map_err(SecretaryError::store(Collaborator::AccessRecordStore))?
            .ok_or_else(|| {
                SecretaryError::NotAuthorized(format!(
                    "user {} holds no access record for note {note_id}",
                    self.user
                ))
            })?;

        Ok(NoteAccess { note, record })
    }

    /// Reject a record without write permission.
    pub(crate) fn check_write(&self, record: &AccessRecord) -> Result<()> {
        if !record.can_write() {
            return Err(SecretaryError::PermissionDenied {
                user: self.user,
                note: record.note_id,
            });
        }
        Ok(())
    }

    /// Fetch and require write permission in one step.
    pub(crate) async fn require_write(&self, note_id: NoteId) -> Result<NoteAccess> {
        let access = self.fetch(note_id).await?;
        self.check_write(&access.record)?;
        Ok(access)
    }
}
