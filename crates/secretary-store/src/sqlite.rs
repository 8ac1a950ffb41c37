//! SQLite implementation of the collaborator traits.
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! `tokio::task::spawn_blocking`. Foreign keys are enabled on every
//! connection so deleting a note removes its access records.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use secretary_core::{
    now_millis, AccessRecord, Group, GroupId, NewNote, Note, NoteId, Permissions, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{AccessRecordStore, GroupDirectory, KeyDirectory, NoteStore, UserDirectory};

/// SQLite-backed implementation of every collaborator.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Open a SQLite database at the given path, creating and migrating it
    /// as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn call<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {e}")))?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {e}")))?
    }

    /// Register a user with their textual public key.
    pub async fn register_user(&self, email: &str, public_key: &str) -> Result<UserId> {
        let email = email.to_string();
        let public_key = public_key.to_string();

        self.call(move |conn| {
            let taken: Option<i64> = conn
                .query_row("SELECT id FROM users WHERE email = ?1", [&email], |row| {
                    row.get(0)
                })
                .optional()?;
            if taken.is_some() {
                return Err(StoreError::Conflict(format!("email {email} already registered")));
            }

            conn.execute(
                "INSERT INTO users (email, public_key) VALUES (?1, ?2)",
                params![email, public_key],
            )?;
            Ok(UserId::new(from_sql_id(conn.last_insert_rowid())?))
        })
        .await
    }

    /// Replace a user's registered public key.
    pub async fn set_public_key(&self, user_id: UserId, public_key: &str) -> Result<()> {
        let public_key = public_key.to_string();

        self.call(move |conn| {
            let changed = conn.execute(
                "UPDATE users SET public_key = ?1 WHERE id = ?2",
                params![public_key, to_sql_id(user_id.get())],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("user {user_id}")));
            }
            Ok(())
        })
        .await
    }

    /// Create a group with the given members.
    pub async fn create_group(
        &self,
        name: &str,
        members: impl IntoIterator<Item = UserId>,
    ) -> Result<GroupId> {
        let name = name.to_string();
        let members: BTreeSet<UserId> = members.into_iter().collect();

        self.call(move |conn| {
            let tx = conn.transaction()?;

            for member in &members {
                if !user_exists(&tx, *member)? {
                    return Err(StoreError::NotFound(format!("user {member}")));
                }
            }

            tx.execute("INSERT INTO user_groups (name) VALUES (?1)", [&name])?;
            let group_id = tx.last_insert_rowid();

            for member in &members {
                tx.execute(
                    "INSERT INTO group_members (group_id, user_id) VALUES (?1, ?2)",
                    params![group_id, to_sql_id(member.get())],
                )?;
            }

            tx.commit()?;
            Ok(GroupId::new(from_sql_id(group_id)?))
        })
        .await
    }
}

fn to_sql_id(id: u64) -> i64 {
    id as i64
}

fn from_sql_id(id: i64) -> Result<u64> {
    u64::try_from(id).map_err(|_| StoreError::InvalidData(format!("negative id {id}")))
}

fn flag(value: i64) -> bool {
    value != 0
}

fn user_exists(conn: &Connection, user_id: UserId) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM users WHERE id = ?1",
            [to_sql_id(user_id.get())],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn note_exists(conn: &Connection, note_id: NoteId) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM notes WHERE id = ?1",
            [to_sql_id(note_id.get())],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

const NOTE_COLUMNS: &str = "id, title, content, private, group_id, created_at, updated_at";

/// Row mappers read columns in rusqlite's error space and map ids in ours,
/// so a bad stored id surfaces as `InvalidData` rather than a SQLite error.
fn row_to_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Note>> {
    let id: i64 = row.get("id")?;
    let group_id: Option<i64> = row.get("group_id")?;
    let title: String = row.get("title")?;
    let ciphertext: Vec<u8> = row.get("content")?;
    let private: i64 = row.get("private")?;
    let created_at: i64 = row.get("created_at")?;
    let updated_at: i64 = row.get("updated_at")?;

    let note = || -> Result<Note> {
        Ok(Note {
            id: NoteId::new(from_sql_id(id)?),
            title,
            ciphertext,
            is_private: flag(private),
            group_id: group_id.map(from_sql_id).transpose()?.map(GroupId::new),
            created_at,
            updated_at,
        })
    };
    Ok(note())
}

const ACCESS_COLUMNS: &str =
    "user_id, note_id, wrapped_key, owner, read_permission, write_permission";

fn row_to_access(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<AccessRecord>> {
    let user_id: i64 = row.get("user_id")?;
    let note_id: i64 = row.get("note_id")?;
    let wrapped_key: Vec<u8> = row.get("wrapped_key")?;
    let permissions = Permissions {
        owner: flag(row.get("owner")?),
        read: flag(row.get("read_permission")?),
        write: flag(row.get("write_permission")?),
    };

    let record = || -> Result<AccessRecord> {
        Ok(AccessRecord {
            user_id: UserId::new(from_sql_id(user_id)?),
            note_id: NoteId::new(from_sql_id(note_id)?),
            wrapped_key,
            permissions,
        })
    };
    Ok(record())
}

fn load_note(conn: &Connection, note_id: NoteId) -> Result<Option<Note>> {
    conn.query_row(
            &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
            [to_sql_id(note_id.get())],
            row_to_note,
        )
        .optional()?
        .transpose()
}

fn load_access(conn: &Connection, note_id: NoteId, user_id: UserId) -> Result<Option<AccessRecord>> {
    conn.query_row(
            &format!("SELECT {ACCESS_COLUMNS} FROM access_records WHERE note_id = ?1 AND user_id = ?2"),
            params![to_sql_id(note_id.get()), to_sql_id(user_id.get())],
            row_to_access,
        )
        .optional()?
        .transpose()
}

fn load_group(conn: &Connection, group_id: GroupId) -> Result<Option<Group>> {
    let name: Option<String> = conn
        .query_row(
            "SELECT name FROM user_groups WHERE id = ?1",
            [to_sql_id(group_id.get())],
            |row| row.get(0),
        )
        .optional()?;

    let Some(name) = name else {
        return Ok(None);
    };

    let members = conn
        .prepare("SELECT user_id FROM group_members WHERE group_id = ?1")?
        .query_map([to_sql_id(group_id.get())], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .into_iter()
        .map(|id| from_sql_id(id).map(UserId::new))
        .collect::<Result<BTreeSet<_>>>()?;

    Ok(Some(Group {
        id: group_id,
        name,
        members,
    }))
}

#[async_trait]
impl NoteStore for SqliteBackend {
    async fn create_note(&self, note: &NewNote) -> Result<Note> {
        let note = note.clone();

        self.call(move |conn| {
            if let Some(group_id) = note.group_id {
                if load_group(conn, group_id)?.is_none() {
                    return Err(StoreError::NotFound(format!("group {group_id}")));
                }
            }

            let now = now_millis();
            conn.execute(
                "INSERT INTO notes (title, content, private, group_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    note.title,
                    note.ciphertext,
                    i64::from(note.is_private),
                    note.group_id.map(|g| to_sql_id(g.get())),
                    now,
                ],
            )?;

            Ok(Note {
                id: NoteId::new(from_sql_id(conn.last_insert_rowid())?),
                title: note.title,
                ciphertext: note.ciphertext,
                is_private: note.is_private,
                group_id: note.group_id,
                created_at: now,
                updated_at: now,
            })
        })
        .await
    }

    async fn get_note(&self, note_id: NoteId, reader: UserId) -> Result<Note> {
        self.call(move |conn| {
            let note = load_note(conn, note_id)?
                .ok_or_else(|| StoreError::NotFound(format!("note {note_id}")))?;

            let readable = load_access(conn, note_id, reader)?.is_some_and(|r| r.permissions.read);
            if !readable {
                return Err(StoreError::Forbidden(format!(
                    "user {reader} cannot read note {note_id}"
                )));
            }

            Ok(note)
        })
        .await
    }

    async fn update_note(&self, note_id: NoteId, title: &str, ciphertext: &[u8]) -> Result<Note> {
        let title = title.to_string();
        let ciphertext = ciphertext.to_vec();

        self.call(move |conn| {
            let changed = conn.execute(
                "UPDATE notes SET title = ?1, content = ?2, updated_at = MAX(updated_at, ?3)
                 WHERE id = ?4",
                params![title, ciphertext, now_millis(), to_sql_id(note_id.get())],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("note {note_id}")));
            }

            load_note(conn, note_id)?
                .ok_or_else(|| StoreError::NotFound(format!("note {note_id}")))
        })
        .await
    }

    async fn delete_note(&self, note_id: NoteId) -> Result<()> {
        self.call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM notes WHERE id = ?1",
                [to_sql_id(note_id.get())],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("note {note_id}")));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl AccessRecordStore for SqliteBackend {
    async fn create_access(&self, record: &AccessRecord) -> Result<()> {
        let record = record.clone();

        self.call(move |conn| {
            if !user_exists(conn, record.user_id)? {
                return Err(StoreError::NotFound(format!("user {}", record.user_id)));
            }
            if !note_exists(conn, record.note_id)? {
                return Err(StoreError::NotFound(format!("note {}", record.note_id)));
            }
            if load_access(conn, record.note_id, record.user_id)?.is_some() {
                return Err(StoreError::Conflict(format!(
                    "user {} already has access to note {}",
                    record.user_id, record.note_id
                )));
            }

            conn.execute(
                "INSERT INTO access_records
                    (user_id, note_id, wrapped_key, owner, read_permission, write_permission)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    to_sql_id(record.user_id.get()),
                    to_sql_id(record.note_id.get()),
                    record.wrapped_key,
                    i64::from(record.permissions.owner),
                    i64::from(record.permissions.read),
                    i64::from(record.permissions.write),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn update_wrapped_key(
        &self,
        user_id: UserId,
        note_id: NoteId,
        wrapped_key: &[u8],
    ) -> Result<()> {
        let wrapped_key = wrapped_key.to_vec();

        self.call(move |conn| {
            let changed = conn.execute(
                "UPDATE access_records SET wrapped_key = ?1 WHERE note_id = ?2 AND user_id = ?3",
                params![wrapped_key, to_sql_id(note_id.get()), to_sql_id(user_id.get())],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!(
                    "access of user {user_id} to note {note_id}"
                )));
            }
            Ok(())
        })
        .await
    }

    async fn get_access(&self, note_id: NoteId, user_id: UserId) -> Result<Option<AccessRecord>> {
        self.call(move |conn| load_access(conn, note_id, user_id)).await
    }

    async fn list_by_note(&self, note_id: NoteId) -> Result<Vec<AccessRecord>> {
        self.call(move |conn| {
            if !note_exists(conn, note_id)? {
                return Err(StoreError::NotFound(format!("note {note_id}")));
            }

            let records = conn
                .prepare(&format!(
                    "SELECT {ACCESS_COLUMNS} FROM access_records WHERE note_id = ?1 ORDER BY seq"
                ))?
                .query_map([to_sql_id(note_id.get())], row_to_access)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            records.into_iter().collect()
        })
        .await
    }
}

#[async_trait]
impl KeyDirectory for SqliteBackend {
    async fn public_key(&self, user_id: UserId) -> Result<String> {
        self.call(move |conn| {
            conn.query_row(
                "SELECT public_key FROM users WHERE id = ?1",
                [to_sql_id(user_id.get())],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))
        })
        .await
    }
}

#[async_trait]
impl GroupDirectory for SqliteBackend {
    async fn group(&self, group_id: GroupId) -> Result<Group> {
        self.call(move |conn| {
            load_group(conn, group_id)?
                .ok_or_else(|| StoreError::NotFound(format!("group {group_id}")))
        })
        .await
    }

    async fn groups_for_user(&self, user_id: UserId) -> Result<Vec<Group>> {
        self.call(move |conn| {
            let ids = conn
                .prepare("SELECT group_id FROM group_members WHERE user_id = ?1 ORDER BY group_id")?
                .query_map([to_sql_id(user_id.get())], |row| row.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut groups = Vec::with_capacity(ids.len());
            for id in ids {
                let group_id = GroupId::new(from_sql_id(id)?);
                if let Some(group) = load_group(conn, group_id)? {
                    groups.push(group);
                }
            }
            Ok(groups)
        })
        .await
    }
}

#[async_trait]
impl UserDirectory for SqliteBackend {
    async fn users(&self, ids: &[UserId]) -> Result<Vec<User>> {
        let ids = ids.to_vec();

        self.call(move |conn| {
            let mut stmt = conn.prepare("SELECT email, public_key FROM users WHERE id = ?1")?;
            let mut users = Vec::with_capacity(ids.len());

            for id in ids {
                let found = stmt
                    .query_row([to_sql_id(id.get())], |row| {
                        Ok(User {
                            id,
                            email: row.get(0)?,
                            public_key: row.get(1)?,
                        })
                    })
                    .optional()?;
                users.push(found.ok_or_else(|| StoreError::NotFound(format!("user {id}")))?);
            }
            Ok(users)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (SqliteBackend, UserId, UserId) {
        let backend = SqliteBackend::open_memory().unwrap();
        let alice = backend
            .register_user("alice@example.com", "x25519:a")
            .await
            .unwrap();
        let bob = backend
            .register_user("bob@example.com", "x25519:b")
            .await
            .unwrap();
        (backend, alice, bob)
    }

    fn access(user_id: UserId, note_id: NoteId, permissions: Permissions) -> AccessRecord {
        AccessRecord {
            user_id,
            note_id,
            wrapped_key: vec![0xab; 8],
            permissions,
        }
    }

    #[tokio::test]
    async fn test_create_and_read_note() {
        let (backend, alice, bob) = seeded().await;
        let group = backend.create_group("ops", [alice, bob]).await.unwrap();

        let note = backend
            .create_note(&NewNote {
                title: "T1".into(),
                ciphertext: vec![1, 2, 3],
                is_private: false,
                group_id: Some(group),
            })
            .await
            .unwrap();
        backend
            .create_access(&access(alice, note.id, Permissions::owner()))
            .await
            .unwrap();

        let fetched = backend.get_note(note.id, alice).await.unwrap();
        assert_eq!(fetched, note);

        assert!(matches!(
            backend.get_note(note.id, bob).await,
            Err(StoreError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_access_flags_and_order() {
        let (backend, alice, bob) = seeded().await;
        let note = backend
            .create_note(&NewNote {
                title: "T1".into(),
                ciphertext: vec![1],
                is_private: false,
                group_id: None,
            })
            .await
            .unwrap();

        backend
            .create_access(&access(bob, note.id, Permissions::member(false)))
            .await
            .unwrap();
        backend
            .create_access(&access(alice, note.id, Permissions::owner()))
            .await
            .unwrap();

        let records = backend.list_by_note(note.id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].user_id, bob);
        assert!(!records[0].can_write());
        assert!(records[1].is_owner());

        assert!(matches!(
            backend
                .create_access(&access(bob, note.id, Permissions::member(true)))
                .await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_cascade_delete() {
        let (backend, alice, _) = seeded().await;
        let note = backend
            .create_note(&NewNote {
                title: "T1".into(),
                ciphertext: vec![1],
                is_private: true,
                group_id: None,
            })
            .await
            .unwrap();
        backend
            .create_access(&access(alice, note.id, Permissions::owner()))
            .await
            .unwrap();

        let updated = backend.update_note(note.id, "T2", &[4, 5]).await.unwrap();
        assert_eq!(updated.title, "T2");
        assert_eq!(updated.ciphertext, vec![4, 5]);
        assert!(updated.updated_at >= note.updated_at);

        backend
            .update_wrapped_key(alice, note.id, &[1, 1])
            .await
            .unwrap();
        let record = backend.get_access(note.id, alice).await.unwrap().unwrap();
        assert_eq!(record.wrapped_key, vec![1, 1]);
        assert_eq!(record.permissions, Permissions::owner());

        backend.delete_note(note.id).await.unwrap();
        assert!(backend.get_access(note.id, alice).await.unwrap().is_none());
        assert!(matches!(
            backend.list_by_note(note.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_directories() {
        let (backend, alice, bob) = seeded().await;
        let group = backend.create_group("ops", [alice, bob]).await.unwrap();

        let loaded = backend.group(group).await.unwrap();
        assert_eq!(loaded.name, "ops");
        assert!(loaded.has_member(alice) && loaded.has_member(bob));

        assert_eq!(backend.groups_for_user(bob).await.unwrap().len(), 1);

        backend.set_public_key(alice, "x25519:new").await.unwrap();
        assert_eq!(backend.public_key(alice).await.unwrap(), "x25519:new");
        assert!(matches!(
            backend.public_key(UserId::new(404)).await,
            Err(StoreError::NotFound(_))
        ));

        let users = backend.users(&[bob, alice]).await.unwrap();
        assert_eq!(users[0].email, "bob@example.com");
        assert_eq!(users[1].public_key, "x25519:new");
    }

    #[tokio::test]
    async fn test_negative_stored_id_is_invalid_data() {
        let (backend, alice, _) = seeded().await;
        let group = backend.create_group("ops", [alice]).await.unwrap();
        let note = backend
            .create_note(&NewNote {
                title: "T1".into(),
                ciphertext: vec![1, 2, 3],
                is_private: false,
                group_id: Some(group),
            })
            .await
            .unwrap();

        let (note_id, group_id) = (to_sql_id(note.id.get()), to_sql_id(group.get()));
        backend
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO users (id, email, public_key) VALUES (-1, 'neg@example.com', 'x25519:n')",
                    [],
                )?;
                conn.execute(
                    "INSERT INTO access_records
                        (user_id, note_id, wrapped_key, owner, read_permission, write_permission)
                     VALUES (-1, ?1, x'00', 0, 1, 0)",
                    [note_id],
                )?;
                conn.execute(
                    "INSERT INTO group_members (group_id, user_id) VALUES (?1, -1)",
                    [group_id],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(matches!(
            backend.list_by_note(note.id).await,
            Err(StoreError::InvalidData(_))
        ));
        assert!(matches!(
            backend.group(group).await,
            Err(StoreError::InvalidData(_))
        ));
        assert!(matches!(
            backend.groups_for_user(alice).await,
            Err(StoreError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_file_backed_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secretary.db");

        let alice = {
            let backend = SqliteBackend::open(&path).unwrap();
            backend
                .register_user("alice@example.com", "x25519:a")
                .await
                .unwrap()
        };

        let reopened = SqliteBackend::open(&path).unwrap();
        assert_eq!(reopened.public_key(alice).await.unwrap(), "x25519:a");
    }
}
