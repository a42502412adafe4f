//! Acceptance check for decoded text parts.

use std::fmt;

/// Outcome of validating one text part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Null-free, trimmed UTF-8 text ready to store.
    Clean(String),
    /// The part must not be stored.
    Rejected(Rejection),
}

/// Why a text part was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Nothing but whitespace (or nulls).
    Empty,
    /// Not valid UTF-8.
    InvalidEncoding,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty"),
            Self::InvalidEncoding => f.write_str("invalid-encoding"),
        }
    }
}

/// Validates a decoded text part.
///
/// Null bytes are stripped first, then whitespace-only content is
/// rejected as empty, then the remainder must be valid UTF-8.
#[must_use]
pub fn validate(mut raw: Vec<u8>) -> Validation {
    raw.retain(|&b| b != 0);

    if raw.trim_ascii().is_empty() {
        return Validation::Rejected(Rejection::Empty);
    }

    match String::from_utf8(raw) {
        Ok(text) if text.trim().is_empty() => Validation::Rejected(Rejection::Empty),
        Ok(text) => Validation::Clean(text.trim().to_string()),
        Err(_) => Validation::Rejected(Rejection::InvalidEncoding),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_is_trimmed() {
        assert_eq!(
            validate(b"  Hello, world.\r\n\r\n".to_vec()),
            Validation::Clean("Hello, world.".into())
        );
    }

    #[test]
    fn test_nulls_are_stripped() {
        assert_eq!(
            validate(b"He\0llo\0".to_vec()),
            Validation::Clean("Hello".into())
        );
    }

    #[test]
    fn test_empty_after_stripping() {
        assert_eq!(validate(Vec::new()), Validation::Rejected(Rejection::Empty));
        assert_eq!(
            validate(b"\0 \r\n\t\0".to_vec()),
            Validation::Rejected(Rejection::Empty)
        );
        // Unicode whitespace only.
        assert_eq!(
            validate("\u{2003}\u{a0}".as_bytes().to_vec()),
            Validation::Rejected(Rejection::Empty)
        );
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        assert_eq!(
            validate(b"caf\xe9 au lait".to_vec()),
            Validation::Rejected(Rejection::InvalidEncoding)
        );
    }

    #[test]
    fn test_empty_wins_over_invalid() {
        // Stripping happens before the encoding check.
        assert_eq!(
            validate(b"\0\0".to_vec()),
            Validation::Rejected(Rejection::Empty)
        );
    }

    #[test]
    fn test_rejection_display() {
        assert_eq!(Rejection::Empty.to_string(), "empty");
        assert_eq!(Rejection::InvalidEncoding.to_string(), "invalid-encoding");
    }
}
