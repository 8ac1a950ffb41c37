//! Proptest generators for property-based testing.

use proptest::prelude::*;

use secretary_core::Permissions;
use secretary_crypt::X25519StaticSecret;

/// A title that passes validation: printable, not blank.
pub fn note_title() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 ,.!?-]{0,40}"
}

/// Note content of at most `max_len` bytes, empty included.
pub fn note_content(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Permission flags of a non-owner recipient.
pub fn member_permissions() -> impl Strategy<Value = Permissions> {
    any::<bool>().prop_map(Permissions::member)
}

/// A static secret derived from random bytes.
pub fn static_secret() -> impl Strategy<Value = X25519StaticSecret> {
    any::<[u8; 32]>().prop_map(X25519StaticSecret::from_bytes)
}

/// Write flags for `count` group members picked in order.
pub fn write_flags(count: usize) -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secretary_core::require_text;

    proptest! {
        #[test]
        fn titles_are_valid(title in note_title()) {
            prop_assert!(require_text("title", &title).is_ok());
        }

        #[test]
        fn members_are_never_owners(permissions in member_permissions()) {
            prop_assert!(!permissions.owner);
            prop_assert!(permissions.read);
        }

        #[test]
        fn content_respects_bound(content in note_content(64)) {
            prop_assert!(content.len() <= 64);
        }
    }
}
