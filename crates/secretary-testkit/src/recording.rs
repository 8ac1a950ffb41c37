//! A backend wrapper that counts collaborator calls and injects failures.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use secretary_core::{AccessRecord, Group, GroupId, NewNote, Note, NoteId, User, UserId};
use secretary_store::{
    AccessRecordStore, GroupDirectory, KeyDirectory, NoteStore, Result, StoreError, UserDirectory,
};

/// A collaborator operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CreateNote,
    GetNote,
    UpdateNote,
    DeleteNote,
    CreateAccess,
    UpdateWrappedKey,
    GetAccess,
    ListByNote,
    PublicKey,
    Group,
    GroupsForUser,
    Users,
}

const OP_COUNT: usize = 12;

impl Op {
    const ALL: [Op; OP_COUNT] = [
        Op::CreateNote,
        Op::GetNote,
        Op::UpdateNote,
        Op::DeleteNote,
        Op::CreateAccess,
        Op::UpdateWrappedKey,
        Op::GetAccess,
        Op::ListByNote,
        Op::PublicKey,
        Op::Group,
        Op::GroupsForUser,
        Op::Users,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Whether the operation changes stored state.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Op::CreateNote
                | Op::UpdateNote
                | Op::DeleteNote
                | Op::CreateAccess
                | Op::UpdateWrappedKey
        )
    }
}

const DISABLED: usize = usize::MAX;

/// Wraps a backend, counting each call in the order it is issued.
///
/// Failures can be injected for the access record writes of create and edit,
/// and for public key lookups of chosen users. Injected failures are
/// `StoreError::Unavailable` and are counted like any other call.
pub struct CountingBackend<B> {
    inner: B,
    counts: [AtomicUsize; OP_COUNT],
    log: Mutex<Vec<Op>>,
    create_access_limit: AtomicUsize,
    update_wrapped_key_limit: AtomicUsize,
    missing_keys: Mutex<BTreeSet<UserId>>,
}

impl<B> CountingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            counts: Default::default(),
            log: Mutex::new(Vec::new()),
            create_access_limit: AtomicUsize::new(DISABLED),
            update_wrapped_key_limit: AtomicUsize::new(DISABLED),
            missing_keys: Mutex::new(BTreeSet::new()),
        }
    }

    /// The wrapped backend, for setup that bypasses counting.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Calls of `op` so far.
    pub fn count(&self, op: Op) -> usize {
        self.counts[op.index()].load(Ordering::SeqCst)
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<Op> {
        lock(&self.log).clone()
    }

    /// Calls that change stored state.
    pub fn writes(&self) -> usize {
        Op::ALL
            .iter()
            .filter(|op| op.is_write())
            .map(|op| self.count(*op))
            .sum()
    }

    /// Forget all counted calls. Injected failures stay armed.
    pub fn reset(&self) {
        for count in &self.counts {
            count.store(0, Ordering::SeqCst);
        }
        lock(&self.log).clear();
    }

    /// Let `n` access record inserts succeed, then fail every later one.
    pub fn fail_access_creates_after(&self, n: usize) {
        self.create_access_limit.store(n, Ordering::SeqCst);
    }

    /// Let `n` wrapped key updates succeed, then fail every later one.
    pub fn fail_wrapped_key_updates_after(&self, n: usize) {
        self.update_wrapped_key_limit.store(n, Ordering::SeqCst);
    }

    /// Make the Key Directory fail for `user`.
    pub fn withhold_key(&self, user: UserId) {
        lock(&self.missing_keys).insert(user);
    }

    /// Disarm every injected failure.
    pub fn heal(&self) {
        self.create_access_limit.store(DISABLED, Ordering::SeqCst);
        self.update_wrapped_key_limit.store(DISABLED, Ordering::SeqCst);
        lock(&self.missing_keys).clear();
    }

    /// Count a call and return how many calls of `op` preceded it.
    fn record(&self, op: Op) -> usize {
        lock(&self.log).push(op);
        self.counts[op.index()].fetch_add(1, Ordering::SeqCst)
    }

    fn check_limit(&self, op: Op, limit: &AtomicUsize) -> Result<()> {
        let previous = self.record(op);
        if previous >= limit.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("injected {op:?} failure")));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl<B: NoteStore> NoteStore for CountingBackend<B> {
    async fn create_note(&self, note: &NewNote) -> Result<Note> {
        self.record(Op::CreateNote);
        self.inner.create_note(note).await
    }

    async fn get_note(&self, note_id: NoteId, reader: UserId) -> Result<Note> {
        self.record(Op::GetNote);
        self.inner.get_note(note_id, reader).await
    }

    async fn update_note(&self, note_id: NoteId, title: &str, ciphertext: &[u8]) -> Result<Note> {
        self.record(Op::UpdateNote);
        self.inner.update_note(note_id, title, ciphertext).await
    }

    async fn delete_note(&self, note_id: NoteId) -> Result<()> {
        self.record(Op::DeleteNote);
        self.inner.delete_note(note_id).await
    }
}

#[async_trait]
impl<B: AccessRecordStore> AccessRecordStore for CountingBackend<B> {
    async fn create_access(&self, record: &AccessRecord) -> Result<()> {
        self.check_limit(Op::CreateAccess, &self.create_access_limit)?;
        self.inner.create_access(record).await
    }

    async fn update_wrapped_key(
        &self,
        user_id: UserId,
        note_id: NoteId,
        wrapped_key: &[u8],
    ) -> Result<()> {
        self.check_limit(Op::UpdateWrappedKey, &self.update_wrapped_key_limit)?;
        self.inner
            .update_wrapped_key(user_id, note_id, wrapped_key)
            .await
    }

    async fn get_access(&self, note_id: NoteId, user_id: UserId) -> Result<Option<AccessRecord>> {
        self.record(Op::GetAccess);
        self.inner.get_access(note_id, user_id).await
    }

    async fn list_by_note(&self, note_id: NoteId) -> Result<Vec<AccessRecord>> {
        self.record(Op::ListByNote);
        self.inner.list_by_note(note_id).await
    }
}

#[async_trait]
impl<B: KeyDirectory> KeyDirectory for CountingBackend<B> {
    async fn public_key(&self, user_id: UserId) -> Result<String> {
        self.record(Op::PublicKey);
        let withheld = lock(&self.missing_keys).contains(&user_id);
        if withheld {
            return Err(StoreError::Unavailable(format!(
                "injected key lookup failure for user {user_id}"
            )));
        }
        self.inner.public_key(user_id).await
    }
}

#[async_trait]
impl<B: GroupDirectory> GroupDirectory for CountingBackend<B> {
    async fn group(&self, group_id: GroupId) -> Result<Group> {
        self.record(Op::Group);
        self.inner.group(group_id).await
    }

    async fn groups_for_user(&self, user_id: UserId) -> Result<Vec<Group>> {
        self.record(Op::GroupsForUser);
        self.inner.groups_for_user(user_id).await
    }
}

#[async_trait]
impl<B: UserDirectory> UserDirectory for CountingBackend<B> {
    async fn users(&self, ids: &[UserId]) -> Result<Vec<User>> {
        self.record(Op::Users);
        self.inner.users(ids).await
    }
}
