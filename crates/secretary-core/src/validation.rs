//! Input presence checks shared by the cipher and the client.

use crate::error::ValidationError;

/// Reject an empty byte argument.
pub fn require_bytes(field: &'static str, value: &[u8]) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(())
}

/// Reject an empty or whitespace-only text argument.
pub fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_bytes() {
        assert!(require_bytes("ciphertext", b"x").is_ok());
        assert_eq!(
            require_bytes("ciphertext", b""),
            Err(ValidationError::Empty("ciphertext"))
        );
    }

    #[test]
    fn test_require_text_rejects_whitespace() {
        assert!(require_text("title", "T1").is_ok());
        assert_eq!(
            require_text("title", "  \n"),
            Err(ValidationError::Empty("title"))
        );
    }
}
