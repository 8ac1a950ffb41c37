//! End-to-end create/edit scenarios with call-count assertions.

mod common;

use secretary::store::{AccessRecordStore, NoteStore};
use secretary::crypt::EnvelopeCipher;
use secretary::{
    EditOutcome, EditState, FixedSelection, NoteEdit, NoteId, Permissions, SecretaryError,
};
use secretary_testkit::{Op, TestUser};

use common::{keys, Harness};

/// U1 owns a group note shared with U2 (write) and U3 (read only).
async fn group_note(h: &Harness) -> (TestUser, TestUser, TestUser, NoteId) {
    let u1 = h.world.user("u1@example.com");
    let u2 = h.world.user("u2@example.com");
    let u3 = h.world.user("u3@example.com");
    let group = h.world.group("team", [&u1, &u2, &u3]);

    let note = h
        .client(&u1)
        .create_group_note(
            "T1",
            b"Hello",
            group,
            &mut FixedSelection::new([(u2.id, true), (u3.id, false)]),
        )
        .await
        .unwrap();

    h.backend.reset();
    (u1, u2, u3, note.id)
}

#[tokio::test]
async fn private_note_has_one_owner_record() {
    let h = Harness::new();
    let u1 = h.world.user("u1@example.com");
    let client = h.client(&u1);

    let note = client.create_private_note("T1", b"Hello").await.unwrap();

    assert!(note.is_private);
    assert_eq!(note.group_id, None);
    assert_eq!(h.backend.count(Op::CreateNote), 1);
    assert_eq!(h.backend.count(Op::CreateAccess), 1);

    let records = h.world.backend.list_by_note(note.id).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_id, u1.id);
    assert_eq!(records[0].permissions, Permissions::owner());
    assert!(records[0].permissions.read);

    let plain = EnvelopeCipher::new()
        .unseal(
            &note.ciphertext,
            &records[0].wrapped_key,
            u1.private_key(),
            &u1.passphrase,
        )
        .unwrap();
    assert_eq!(plain.as_slice(), b"Hello");

    let opened = client.read_note(note.id, &keys(&u1)).await.unwrap();
    assert_eq!(opened.note.title, "T1");
    assert_eq!(opened.content_str(), Some("Hello"));
}

#[tokio::test]
async fn group_note_seals_once_for_three_recipients() {
    let h = Harness::new();
    let u1 = h.world.user("u1@example.com");
    let u2 = h.world.user("u2@example.com");
    let u3 = h.world.user("u3@example.com");
    let group = h.world.group("team", [&u1, &u2, &u3]);

    let note = h
        .client(&u1)
        .create_group_note(
            "T1",
            b"Hello",
            group,
            &mut FixedSelection::new([(u2.id, true), (u3.id, false)]),
        )
        .await
        .unwrap();

    assert!(!note.is_private);
    assert_eq!(note.group_id, Some(group));
    assert_eq!(h.backend.count(Op::CreateNote), 1);
    assert_eq!(h.backend.count(Op::CreateAccess), 3);

    let records = h.world.backend.list_by_note(note.id).await.unwrap();
    let users: Vec<_> = records.iter().map(|r| r.user_id).collect();
    assert_eq!(users, vec![u2.id, u3.id, u1.id]);
    assert_eq!(records[0].permissions, Permissions::member(true));
    assert_eq!(records[1].permissions, Permissions::member(false));
    assert_eq!(records[2].permissions, Permissions::owner());

    assert_ne!(records[0].wrapped_key, records[1].wrapped_key);
    assert_ne!(records[1].wrapped_key, records[2].wrapped_key);

    // One stored ciphertext opens under every recipient's own wrapped key.
    let stored = h.world.backend.get_note(note.id, u1.id).await.unwrap();
    for (user, record) in [&u2, &u3, &u1].into_iter().zip(&records) {
        let plain = EnvelopeCipher::new()
            .unseal(
                &stored.ciphertext,
                &record.wrapped_key,
                user.private_key(),
                &user.passphrase,
            )
            .unwrap();
        assert_eq!(plain.as_slice(), b"Hello");
    }
}

#[tokio::test]
async fn read_only_member_cannot_edit() {
    let h = Harness::new();
    let (_, _, u3, note) = group_note(&h).await;

    let mut invoked = 0;
    let result = h
        .client(&u3)
        .edit_note(note, &keys(&u3), &mut |_: &str, _: &[u8]| {
            invoked += 1;
            NoteEdit::unchanged().with_content(b"Hijacked".to_vec())
        })
        .await;

    assert!(matches!(
        result,
        Err(SecretaryError::PermissionDenied { user, note: n }) if user == u3.id && n == note
    ));
    assert_eq!(invoked, 0);
    assert_eq!(h.backend.count(Op::UpdateNote), 0);
    assert_eq!(h.backend.count(Op::UpdateWrappedKey), 0);
    assert_eq!(h.backend.writes(), 0);
}

#[tokio::test]
async fn content_edit_rewraps_for_every_recipient() {
    let h = Harness::new();
    let (u1, u2, u3, note) = group_note(&h).await;
    let before = h.world.backend.list_by_note(note).await.unwrap();

    let outcome = h
        .client(&u2)
        .edit_note(note, &keys(&u2), &mut |_: &str, _: &[u8]| {
            NoteEdit::unchanged().with_content(b"Hello, team".to_vec())
        })
        .await
        .unwrap();

    assert_eq!(outcome.state(), EditState::Persisted);
    let EditOutcome::Persisted { note: edited, rewrapped } = outcome else {
        panic!("edit was not persisted");
    };
    assert_eq!(edited.title, "T1");
    assert_eq!(rewrapped, vec![u2.id, u3.id, u1.id]);

    assert_eq!(
        h.backend.calls(),
        vec![
            Op::GetNote,
            Op::GetAccess,
            Op::ListByNote,
            Op::PublicKey,
            Op::PublicKey,
            Op::PublicKey,
            Op::UpdateNote,
            Op::UpdateWrappedKey,
            Op::UpdateWrappedKey,
            Op::UpdateWrappedKey,
        ]
    );

    let after = h.world.backend.list_by_note(note).await.unwrap();
    for (old, new) in before.iter().zip(&after) {
        assert_eq!(old.user_id, new.user_id);
        assert_eq!(old.permissions, new.permissions);
        assert_ne!(old.wrapped_key, new.wrapped_key);
    }

    for user in [&u1, &u2, &u3] {
        let opened = h.client(user).read_note(note, &keys(user)).await.unwrap();
        assert_eq!(opened.note.title, "T1");
        assert_eq!(opened.content.as_slice(), b"Hello, team");
    }
}

#[tokio::test]
async fn unchanged_edit_aborts_without_writes() {
    let h = Harness::new();
    let (u1, _, _, note) = group_note(&h).await;
    let client = h.client(&u1);

    let outcome = client
        .edit_note(note, &keys(&u1), &mut |_: &str, _: &[u8]| NoteEdit::unchanged())
        .await
        .unwrap();
    assert!(outcome.is_aborted());

    // Resubmitting the current values is no change either.
    let outcome = client
        .edit_note(note, &keys(&u1), &mut |title: &str, content: &[u8]| {
            NoteEdit::unchanged()
                .with_title(title)
                .with_content(content.to_vec())
        })
        .await
        .unwrap();
    assert_eq!(outcome.state(), EditState::Aborted);

    assert_eq!(h.backend.count(Op::UpdateNote), 0);
    assert_eq!(h.backend.count(Op::UpdateWrappedKey), 0);
    assert_eq!(h.backend.count(Op::ListByNote), 0);
    assert_eq!(h.backend.writes(), 0);
}

#[tokio::test]
async fn stored_rows_have_the_backend_wire_shape() {
    use secretary::core::wire::{to_json, AccessRecordWire, NoteWire};

    let h = Harness::new();
    let (u1, _, u3, note) = group_note(&h).await;

    let stored = h.world.backend.get_note(note, u1.id).await.unwrap();
    let json = to_json(&NoteWire::from(&stored)).unwrap();
    assert!(json.contains(r#""title":"T1""#));
    assert!(json.contains(r#""private":0"#));

    let record = h.world.backend.get_access(note, u3.id).await.unwrap().unwrap();
    let wire = AccessRecordWire::from(&record);
    assert_eq!(
        (wire.owner, wire.read_permission, wire.write_permission),
        (0, 1, 0)
    );
    let json = to_json(&wire).unwrap();
    assert!(json.contains(r#""eKey":""#));
    assert!(json.contains(&format!(r#""userId":{}"#, u3.id)));
}
