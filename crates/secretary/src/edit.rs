//! Edit/reseal state and the editor seam.
//!
//! An edit moves through
//! `Fetched -> PermissionChecked -> Decrypted -> (Aborted | Resealed) -> Persisted`.
//! Nothing is written before `Resealed`; an edit that changes neither title
//! nor content stops at `Aborted` with no backend writes at all.

use std::fmt;

use tracing::debug;
use zeroize::Zeroizing;

use secretary_core::{require_text, Note, NoteId, UserId};

use crate::error::Result;

/// Where an edit currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Fetched,
    PermissionChecked,
    Decrypted,
    Aborted,
    Resealed,
    Persisted,
}

/// Replacement values proposed by an editor. `None` keeps the current value.
#[derive(Default)]
pub struct NoteEdit {
    pub title: Option<String>,
    pub content: Option<Zeroizing<Vec<u8>>>,
}

impl NoteEdit {
    /// Keep both title and content.
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = Some(Zeroizing::new(content.into()));
        self
    }
}

impl fmt::Debug for NoteEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoteEdit")
            .field("title", &self.title)
            .field("content", &self.content.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Supplies new title/content given the current decrypted note.
pub trait NoteEditor {
    fn edit(&mut self, title: &str, content: &[u8]) -> NoteEdit;
}

impl<F> NoteEditor for F
where
    F: FnMut(&str, &[u8]) -> NoteEdit,
{
    fn edit(&mut self, title: &str, content: &[u8]) -> NoteEdit {
        self(title, content)
    }
}

/// How an edit ended.
#[derive(Debug)]
pub enum EditOutcome {
    /// Nothing changed; no backend writes were issued.
    Aborted,
    /// New ciphertext and wrapped keys were written.
    Persisted {
        note: Note,
        /// Recipients whose wrapped key was replaced, in order.
        rewrapped: Vec<UserId>,
    },
}

impl EditOutcome {
    pub fn state(&self) -> EditState {
        match self {
            Self::Aborted => EditState::Aborted,
            Self::Persisted { .. } => EditState::Persisted,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// The values to seal after an edit.
pub(crate) struct Revision {
    pub title: String,
    pub content: Zeroizing<Vec<u8>>,
}

/// Compare an edit with the current values.
///
/// Returns `None` when nothing differs. A changed title must not be blank.
pub(crate) fn revise(title: &str, content: &[u8], edit: NoteEdit) -> Result<Option<Revision>> {
    let new_title = edit.title.filter(|t| t != title);
    let new_content = edit.content.filter(|c| c.as_slice() != content);

    if new_title.is_none() && new_content.is_none() {
        return Ok(None);
    }

    if let Some(t) = &new_title {
        require_text("title", t)?;
    }

    Ok(Some(Revision {
        title: new_title.unwrap_or_else(|| title.to_string()),
        content: new_content.unwrap_or_else(|| Zeroizing::new(content.to_vec())),
    }))
}

/// Tracks and logs state transitions of one edit.
pub(crate) struct EditProgress {
    note: NoteId,
    state: EditState,
}

impl EditProgress {
    pub(crate) fn fetched(note: NoteId) -> Self {
        debug!(note = %note, state = ?EditState::Fetched, "edit");
        Self {
            note,
            state: EditState::Fetched,
        }
    }

    pub(crate) fn advance(&mut self, next: EditState) {
        debug!(note = %self.note, from = ?self.state, to = ?next, "edit");
        self.state = next;
    }

    pub(crate) fn state(&self) -> EditState {
        self.state
    }
}
