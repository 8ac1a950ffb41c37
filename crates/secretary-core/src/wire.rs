//! JSON wire shapes exchanged with the backend.
//!
//! Binary fields travel as standard base64; boolean flags travel as `0|1`
//! integers. Conversions to and from the domain types validate both.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{GroupId, NoteId, UserId};
use crate::model::{AccessRecord, Note, Permissions};

/// Encode bytes as standard base64.
pub fn encode_b64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 field, naming the field on failure.
pub fn decode_b64(field: &'static str, encoded: &str) -> Result<Vec<u8>, CoreError> {
    STANDARD
        .decode(encoded)
        .map_err(|e| CoreError::InvalidBase64 {
            field,
            reason: e.to_string(),
        })
}

fn flag_to_wire(flag: bool) -> u8 {
    u8::from(flag)
}

fn flag_from_wire(field: &'static str, value: u8) -> Result<bool, CoreError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CoreError::InvalidFlag {
            field,
            value: i64::from(other),
        }),
    }
}

/// Sealed content for exactly one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleRecipientPayload {
    pub content: String,
    #[serde(rename = "eKey")]
    pub e_key: String,
}

/// Sealed content for several recipients, `ekeys` aligned with the recipient list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiRecipientPayload {
    pub content: String,
    pub ekeys: Vec<String>,
}

/// Wire form of an [`AccessRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRecordWire {
    pub user_id: u64,
    pub note_id: u64,
    pub e_key: String,
    pub owner: u8,
    pub read_permission: u8,
    pub write_permission: u8,
}

impl From<&AccessRecord> for AccessRecordWire {
    fn from(record: &AccessRecord) -> Self {
        Self {
            user_id: record.user_id.get(),
            note_id: record.note_id.get(),
            e_key: encode_b64(&record.wrapped_key),
            owner: flag_to_wire(record.permissions.owner),
            read_permission: flag_to_wire(record.permissions.read),
            write_permission: flag_to_wire(record.permissions.write),
        }
    }
}

impl TryFrom<AccessRecordWire> for AccessRecord {
    type Error = CoreError;

    fn try_from(wire: AccessRecordWire) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::new(wire.user_id),
            note_id: NoteId::new(wire.note_id),
            wrapped_key: decode_b64("eKey", &wire.e_key)?,
            permissions: Permissions {
                owner: flag_from_wire("owner", wire.owner)?,
                read: flag_from_wire("readPermission", wire.read_permission)?,
                write: flag_from_wire("writePermission", wire.write_permission)?,
            },
        })
    }
}

/// Wire form of a [`Note`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteWire {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub private: u8,
    pub group_id: Option<u64>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl From<&Note> for NoteWire {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.get(),
            title: note.title.clone(),
            content: encode_b64(&note.ciphertext),
            private: flag_to_wire(note.is_private),
            group_id: note.group_id.map(GroupId::get),
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

impl TryFrom<NoteWire> for Note {
    type Error = CoreError;

    fn try_from(wire: NoteWire) -> Result<Self, Self::Error> {
        Ok(Self {
            id: NoteId::new(wire.id),
            title: wire.title,
            ciphertext: decode_b64("content", &wire.content)?,
            is_private: flag_from_wire("private", wire.private)?,
            group_id: wire.group_id.map(GroupId::new),
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        })
    }
}

/// Serialize any wire shape to a JSON string.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, CoreError> {
    serde_json::to_string(value).map_err(|e| CoreError::EncodingError(e.to_string()))
}

/// Parse any wire shape from a JSON string.
pub fn from_json<'a, T: Deserialize<'a>>(json: &'a str) -> Result<T, CoreError> {
    serde_json::from_str(json).map_err(|e| CoreError::DecodingError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> AccessRecord {
        AccessRecord {
            user_id: UserId::new(3),
            note_id: NoteId::new(11),
            wrapped_key: vec![1, 2, 3, 4],
            permissions: Permissions::member(false),
        }
    }

    #[test]
    fn test_access_record_json_field_names() {
        let wire = AccessRecordWire::from(&sample_record());
        let value: serde_json::Value = serde_json::from_str(&to_json(&wire).unwrap()).unwrap();

        assert_eq!(value["userId"], 3);
        assert_eq!(value["noteId"], 11);
        assert_eq!(value["eKey"], "AQIDBA==");
        assert_eq!(value["owner"], 0);
        assert_eq!(value["readPermission"], 1);
        assert_eq!(value["writePermission"], 0);
    }

    #[test]
    fn test_access_record_from_wire() {
        let json = r#"{"userId":3,"noteId":11,"eKey":"AQIDBA==","owner":0,"readPermission":1,"writePermission":0}"#;
        let wire: AccessRecordWire = from_json(json).unwrap();
        let record = AccessRecord::try_from(wire).unwrap();
        assert_eq!(record, sample_record());
    }

    #[test]
    fn test_flag_out_of_range_rejected() {
        let json = r#"{"userId":3,"noteId":11,"eKey":"AQIDBA==","owner":2,"readPermission":1,"writePermission":0}"#;
        let wire: AccessRecordWire = from_json(json).unwrap();
        let err = AccessRecord::try_from(wire).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFlag { field: "owner", value: 2 }));
    }

    #[test]
    fn test_note_wire_null_group() {
        let json = r#"{"id":5,"title":"T1","content":"aGk=","private":1,"groupId":null}"#;
        let note = Note::try_from(from_json::<NoteWire>(json).unwrap()).unwrap();

        assert_eq!(note.id, NoteId::new(5));
        assert_eq!(note.ciphertext, b"hi");
        assert!(note.is_private);
        assert_eq!(note.group_id, None);
    }

    #[test]
    fn test_bad_base64_names_field() {
        let err = decode_b64("content", "not base64!").unwrap_err();
        assert!(matches!(err, CoreError::InvalidBase64 { field: "content", .. }));
    }

    #[test]
    fn test_multi_payload_shape() {
        let payload = MultiRecipientPayload {
            content: "Y3Q=".into(),
            ekeys: vec!["a2V5MQ==".into(), "a2V5Mg==".into()],
        };
        let json = to_json(&payload).unwrap();
        assert_eq!(json, r#"{"content":"Y3Q=","ekeys":["a2V5MQ==","a2V5Mg=="]}"#);

        let single = SingleRecipientPayload {
            content: "Y3Q=".into(),
            e_key: "a2V5MQ==".into(),
        };
        assert_eq!(to_json(&single).unwrap(), r#"{"content":"Y3Q=","eKey":"a2V5MQ=="}"#);
    }
}
