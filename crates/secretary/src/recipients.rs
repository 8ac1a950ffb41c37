//! Recipient set resolution.
//!
//! A private note is sealed for the acting user alone. For a group note the
//! other group members are offered to a [`RecipientChooser`] one pick at a
//! time; the acting user is always appended last as owner. Every recipient's
//! public key is then fetched fresh from the Key Directory.

use std::collections::VecDeque;

use tracing::debug;

use secretary_core::{GroupId, Permissions, User, UserId, ValidationError};
use secretary_crypt::X25519PublicKey;
use secretary_store::Backend;

use crate::error::{Collaborator, Result, SecretaryError};

/// A user a note is sealed for, with the key fetched for this operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub user_id: UserId,
    pub public_key: String,
    pub permissions: Permissions,
}

/// One step of interactive recipient selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Add a candidate, granting write if `write` is set. Read is implied.
    Add { user_id: UserId, write: bool },
    /// Stop adding recipients.
    Done,
}

/// Picks recipients for a group note.
///
/// Called repeatedly with the candidates not yet picked until it returns
/// [`Choice::Done`] or no candidates remain.
pub trait RecipientChooser {
    fn choose(&mut self, remaining: &[User]) -> Choice;
}

impl<F> RecipientChooser for F
where
    F: FnMut(&[User]) -> Choice,
{
    fn choose(&mut self, remaining: &[User]) -> Choice {
        self(remaining)
    }
}

/// Adds every candidate with the same write flag.
#[derive(Debug, Clone, Copy)]
pub struct AllMembers {
    pub write: bool,
}

impl RecipientChooser for AllMembers {
    fn choose(&mut self, remaining: &[User]) -> Choice {
        remaining.first().map_or(Choice::Done, |user| Choice::Add {
            user_id: user.id,
            write: self.write,
        })
    }
}

/// Adds a predetermined list of `(user, write)` picks, in order.
#[derive(Debug, Clone, Default)]
pub struct FixedSelection {
    picks: VecDeque<(UserId, bool)>,
}

impl FixedSelection {
    pub fn new(picks: impl IntoIterator<Item = (UserId, bool)>) -> Self {
        Self {
            picks: picks.into_iter().collect(),
        }
    }
}

impl RecipientChooser for FixedSelection {
    fn choose(&mut self, _remaining: &[User]) -> Choice {
        self.picks
            .pop_front()
            .map_or(Choice::Done, |(user_id, write)| Choice::Add { user_id, write })
    }
}

/// Resolves recipient sets against the directories of a backend.
pub(crate) struct RecipientResolver<'a, B: ?Sized> {
    backend: &'a B,
    acting: UserId,
}

impl<'a, B: Backend + ?Sized> RecipientResolver<'a, B> {
    pub(crate) fn new(backend: &'a B, acting: UserId) -> Self {
        Self { backend, acting }
    }

    /// The recipient selection of a private note.
    pub(crate) fn private(&self) -> Vec<(UserId, Permissions)> {
        vec![(self.acting, Permissions::owner())]
    }

    /// Group members other than the acting user, as directory entries.
    pub(crate) async fn candidates(&self, group_id: GroupId) -> Result<Vec<User>> {
        let group = self
            .backend
            .group(group_id)
            .await
            .map_err(SecretaryError::store(Collaborator::GroupDirectory))?;

        let ids: Vec<UserId> = group
            .members
            .iter()
            .copied()
            .filter(|id| *id != self.acting)
            .collect();

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        self.backend
            .users(&ids)
            .await
            .map_err(SecretaryError::store(Collaborator::UserDirectory))
    }

    /// Let `chooser` pick among the group's members, then append the acting
    /// user as owner.
    pub(crate) async fn group<C: RecipientChooser + ?Sized>(
        &self,
        group_id: GroupId,
        chooser: &mut C,
    ) -> Result<Vec<(UserId, Permissions)>> {
        let mut remaining = self.candidates(group_id).await?;
        let mut selection = Vec::with_capacity(remaining.len() + 1);

        while !remaining.is_empty() {
            match chooser.choose(&remaining) {
                Choice::Done => break,
                Choice::Add { user_id, write } => {
                    let index = remaining
                        .iter()
                        .position(|u| u.id == user_id)
                        .ok_or(ValidationError::NotAGroupMember {
                            user: user_id.get(),
                            group: group_id.get(),
                        })?;
                    remaining.remove(index);
                    selection.push((user_id, Permissions::member(write)));
                }
            }
        }

        selection.push((self.acting, Permissions::owner()));
        Ok(selection)
    }

    /// Fetch the current public key of every selected user, in order.
    ///
    /// Fails on the first lookup that fails, before anything is sealed.
    pub(crate) async fn fetch_keys(
        &self,
        selection: impl IntoIterator<Item = (UserId, Permissions)>,
    ) -> Result<Vec<Recipient>> {
        let mut recipients = Vec::new();

        for (user_id, permissions) in selection {
            let public_key = self.backend.public_key(user_id).await.map_err(|source| {
                SecretaryError::RecipientKeyUnavailable {
                    user: user_id,
                    source,
                }
            })?;

            debug!(
                user = %user_id,
                key = %fingerprint(&public_key),
                write = permissions.write,
                "resolved recipient"
            );
            recipients.push(Recipient {
                user_id,
                public_key,
                permissions,
            });
        }

        Ok(recipients)
    }
}

/// Loggable stand-in for a textual public key.
pub(crate) fn fingerprint(public_key: &str) -> String {
    X25519PublicKey::parse(public_key)
        .map(|k| k.fingerprint())
        .unwrap_or_else(|_| "unparseable".to_string())
}
