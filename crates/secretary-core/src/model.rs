//! Domain model: users, groups, notes and access records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::{GroupId, NoteId, UserId};

/// A registered user as known to the directory.
///
/// `public_key` is the textual key the Key Directory returned at lookup time.
/// It is never cached beyond the operation that fetched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub public_key: String,
}

/// A named set of users that can share notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub members: BTreeSet<UserId>,
}

impl Group {
    /// Whether `user` belongs to this group.
    pub fn has_member(&self, user: UserId) -> bool {
        self.members.contains(&user)
    }
}

/// A stored note.
///
/// `ciphertext` is recipient-independent: one symmetric encryption serves
/// every reader, each of whom holds their own wrapped content key in an
/// [`AccessRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub ciphertext: Vec<u8>,
    pub is_private: bool,
    pub group_id: Option<GroupId>,
    /// Unix milliseconds.
    pub created_at: i64,
    /// Unix milliseconds.
    pub updated_at: i64,
}

/// Input to `NoteStore::create_note`; the backend assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub ciphertext: Vec<u8>,
    pub is_private: bool,
    pub group_id: Option<GroupId>,
}

/// Permission flags on an access record.
///
/// Flags are fixed when the record is created; edits only replace the
/// wrapped key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permissions {
    pub owner: bool,
    pub read: bool,
    pub write: bool,
}

impl Permissions {
    /// The creator's flags: owner with read and write.
    pub const fn owner() -> Self {
        Self {
            owner: true,
            read: true,
            write: true,
        }
    }

    /// A non-owning member who can always read and may be allowed to write.
    pub const fn member(write: bool) -> Self {
        Self {
            owner: false,
            read: true,
            write,
        }
    }
}

/// One recipient's entry in a note's access ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
    pub user_id: UserId,
    pub note_id: NoteId,
    /// The note's content key wrapped for this user. Opaque here.
    pub wrapped_key: Vec<u8>,
    pub permissions: Permissions,
}

impl AccessRecord {
    pub fn can_write(&self) -> bool {
        self.permissions.write
    }

    pub fn is_owner(&self) -> bool {
        self.permissions.owner
    }
}

/// Current time in Unix milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
