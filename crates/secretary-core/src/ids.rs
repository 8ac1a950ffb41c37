//! Strong identifier types.
//!
//! The backend hands out integer ids for users, notes and groups. Each gets
//! its own newtype so a `NoteId` can never be passed where a `UserId` belongs.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! backend_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a raw backend id.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw backend id.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $label, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

backend_id!(
    /// Identifier of a registered user.
    UserId,
    "UserId"
);

backend_id!(
    /// Identifier of a stored note.
    NoteId,
    "NoteId"
);

backend_id!(
    /// Identifier of a user group.
    GroupId,
    "GroupId"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_is_raw_number() {
        assert_eq!(NoteId::new(42).to_string(), "42");
        assert_eq!(format!("{:?}", UserId::new(7)), "UserId(7)");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&GroupId::new(3)).unwrap();
        assert_eq!(json, "3");

        let id: UserId = serde_json::from_str("19").unwrap();
        assert_eq!(id, UserId::new(19));
    }
}
