//! The Secretary client: create, read, edit and delete shared notes.

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use secretary_core::{
    require_text, AccessRecord, Group, GroupId, NewNote, Note, NoteId, Permissions, User, UserId,
};
use secretary_crypt::{EnvelopeCipher, SealedPayload};
use secretary_store::Backend;

use crate::config::ClientConfig;
use crate::credentials::KeyMaterial;
use crate::edit::{revise, EditOutcome, EditProgress, EditState, NoteEditor};
use crate::error::{Collaborator, Result, SecretaryError};
use crate::guard::PermissionGuard;
use crate::recipients::{Recipient, RecipientChooser, RecipientResolver};

/// A decrypted note.
#[derive(Debug)]
pub struct OpenedNote {
    pub note: Note,
    /// The caller's permissions on the note.
    pub permissions: Permissions,
    pub content: Zeroizing<Vec<u8>>,
}

impl OpenedNote {
    /// The content as UTF-8, if it is.
    pub fn content_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// One recipient of a note, without key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipientInfo {
    pub user_id: UserId,
    pub permissions: Permissions,
}

/// Which phase-two write an access record gets.
#[derive(Debug, Clone, Copy)]
enum KeyWrite {
    Create,
    Rewrap,
}

/// Client for one acting user against one backend.
///
/// Every collaborator call is awaited before the next is issued. To share a
/// backend between clients, pass an `Arc` of it.
pub struct Secretary<B: Backend> {
    config: ClientConfig,
    backend: B,
    cipher: EnvelopeCipher,
}

impl<B: Backend> Secretary<B> {
    pub fn new(config: ClientConfig, backend: B) -> Self {
        Self {
            config,
            backend,
            cipher: EnvelopeCipher::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The acting user.
    pub fn user_id(&self) -> UserId {
        self.config.user_id
    }

    fn guard(&self) -> PermissionGuard<'_, B> {
        PermissionGuard::new(&self.backend, self.user_id())
    }

    fn resolver(&self) -> RecipientResolver<'_, B> {
        RecipientResolver::new(&self.backend, self.user_id())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Creation
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a note readable only by the acting user.
    pub async fn create_private_note(&self, title: &str, content: &[u8]) -> Result<Note> {
        require_text("title", title)?;

        let selection = self.resolver().private();
        self.create(title, content, None, selection).await
    }

    /// Create a note for members of `group_id` picked by `chooser`.
    ///
    /// The acting user is never offered to the chooser and is always added
    /// last as owner.
    pub async fn create_group_note<C: RecipientChooser + ?Sized>(
        &self,
        title: &str,
        content: &[u8],
        group_id: GroupId,
        chooser: &mut C,
    ) -> Result<Note> {
        require_text("title", title)?;

        let selection = self.resolver().group(group_id, chooser).await?;
        self.create(title, content, Some(group_id), selection).await
    }

    async fn create(
        &self,
        title: &str,
        content: &[u8],
        group_id: Option<GroupId>,
        selection: Vec<(UserId, Permissions)>,
    ) -> Result<Note> {
        let recipients = self.resolver().fetch_keys(selection).await?;
        let sealed = self.seal(content, &recipients)?;

        let note = self
            .backend
            .create_note(&NewNote {
                title: title.to_string(),
                ciphertext: sealed.ciphertext.clone(),
                is_private: group_id.is_none(),
                group_id,
            })
            .await
            .map_err(SecretaryError::store(Collaborator::NoteStore))?;

        self.write_keys(note.id, &recipients, &sealed, KeyWrite::Create)
            .await?;

        info!(
            note = %note.id,
            private = note.is_private,
            recipients = recipients.len(),
            "created note"
        );
        Ok(note)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reading
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch and decrypt a note with the caller's key material.
    pub async fn read_note(&self, note_id: NoteId, keys: &KeyMaterial) -> Result<OpenedNote> {
        let access = self.guard().fetch(note_id).await?;

        let content = self.cipher.unseal(
            &access.note.ciphertext,
            &access.record.wrapped_key,
            keys.private_key(),
            keys.passphrase(),
        )?;

        debug!(note = %note_id, "opened note");
        Ok(OpenedNote {
            note: access.note,
            permissions: access.record.permissions,
            content,
        })
    }

    /// Recipients of a note the caller can read.
    pub async fn recipients(&self, note_id: NoteId) -> Result<Vec<RecipientInfo>> {
        self.guard().fetch(note_id).await?;

        let records = self.list_records(note_id).await?;
        Ok(records
            .into_iter()
            .map(|r| RecipientInfo {
                user_id: r.user_id,
                permissions: r.permissions,
            })
            .collect())
    }

    /// Groups the acting user belongs to.
    pub async fn groups(&self) -> Result<Vec<Group>> {
        self.backend
            .groups_for_user(self.user_id())
            .await
            .map_err(SecretaryError::store(Collaborator::GroupDirectory))
    }

    /// Members of a group that can be offered as recipients.
    pub async fn group_candidates(&self, group_id: GroupId) -> Result<Vec<User>> {
        self.resolver().candidates(group_id).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Decrypt, let `editor` change title and/or content, reseal for the
    /// note's existing recipients and persist.
    ///
    /// The recipient set is the one listed before the edit; nobody is added
    /// or dropped. Each recipient's key is fetched again, so rotated keys are
    /// picked up.
    pub async fn edit_note<E: NoteEditor + ?Sized>(
        &self,
        note_id: NoteId,
        keys: &KeyMaterial,
        editor: &mut E,
    ) -> Result<EditOutcome> {
        let guard = self.guard();

        let access = guard.fetch(note_id).await?;
        let mut progress = EditProgress::fetched(note_id);

        guard.check_write(&access.record)?;
        progress.advance(EditState::PermissionChecked);

        let current = self.cipher.unseal(
            &access.note.ciphertext,
            &access.record.wrapped_key,
            keys.private_key(),
            keys.passphrase(),
        )?;
        progress.advance(EditState::Decrypted);

        let edit = editor.edit(&access.note.title, &current);
        let Some(revision) = revise(&access.note.title, &current, edit)? else {
            progress.advance(EditState::Aborted);
            info!(note = %note_id, "edit aborted, nothing changed");
            return Ok(EditOutcome::Aborted);
        };
        drop(current);

        let records = self.list_records(note_id).await?;
        let recipients = self
            .resolver()
            .fetch_keys(records.iter().map(|r| (r.user_id, r.permissions)))
            .await?;
        let sealed = self.seal(&revision.content, &recipients)?;
        progress.advance(EditState::Resealed);

        let note = self
            .backend
            .update_note(note_id, &revision.title, &sealed.ciphertext)
            .await
            .map_err(SecretaryError::store(Collaborator::NoteStore))?;

        let rewrapped = self
            .write_keys(note_id, &recipients, &sealed, KeyWrite::Rewrap)
            .await?;
        progress.advance(EditState::Persisted);

        info!(
            note = %note_id,
            state = ?progress.state(),
            recipients = rewrapped.len(),
            "edited note"
        );
        Ok(EditOutcome::Persisted { note, rewrapped })
    }

    /// Delete a note and, through the backend, its access records.
    pub async fn delete_note(&self, note_id: NoteId) -> Result<()> {
        self.guard().require_write(note_id).await?;

        self.backend
            .delete_note(note_id)
            .await
            .map_err(SecretaryError::store(Collaborator::NoteStore))?;

        info!(note = %note_id, "deleted note");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    async fn list_records(&self, note_id: NoteId) -> Result<Vec<AccessRecord>> {
        self.backend
            .list_by_note(note_id)
            .await
            .map_err(SecretaryError::store(Collaborator::AccessRecordStore))
    }

    fn seal(&self, content: &[u8], recipients: &[Recipient]) -> Result<SealedPayload> {
        let keys: Vec<&str> = recipients.iter().map(|r| r.public_key.as_str()).collect();
        Ok(self.cipher.seal(content, &keys)?)
    }

    /// Second phase of create/edit: one access record write per recipient.
    ///
    /// Not transactional with the note write that precedes it. A failure
    /// part way is reported as `PartialCommit` naming who was and was not
    /// written; nothing is rolled back.
    async fn write_keys(
        &self,
        note_id: NoteId,
        recipients: &[Recipient],
        sealed: &SealedPayload,
        mode: KeyWrite,
    ) -> Result<Vec<UserId>> {
        let mut committed = Vec::with_capacity(recipients.len());

        for (i, (recipient, wrapped_key)) in recipients.iter().zip(&sealed.wrapped_keys).enumerate() {
            let written = match mode {
                KeyWrite::Create => {
                    self.backend
                        .create_access(&AccessRecord {
                            user_id: recipient.user_id,
                            note_id,
                            wrapped_key: wrapped_key.clone(),
                            permissions: recipient.permissions,
                        })
                        .await
                }
                KeyWrite::Rewrap => {
                    self.backend
                        .update_wrapped_key(recipient.user_id, note_id, wrapped_key)
                        .await
                }
            };

            if let Err(source) = written {
                let pending: Vec<UserId> = recipients[i..].iter().map(|r| r.user_id).collect();
                warn!(
                    note = %note_id,
                    committed = committed.len(),
                    pending = pending.len(),
                    error = %source,
                    "access records partially written"
                );
                return Err(SecretaryError::PartialCommit {
                    note: note_id,
                    committed,
                    pending,
                    collaborator: Collaborator::AccessRecordStore,
                    source,
                });
            }

            debug!(note = %note_id, user = %recipient.user_id, ?mode, "wrote access record");
            committed.push(recipient.user_id);
        }

        Ok(committed)
    }
}
