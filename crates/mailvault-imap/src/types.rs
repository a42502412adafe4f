//! Core IMAP types.

use std::fmt;

/// Status of a tagged or untagged status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed successfully.
    Ok,
    /// Command failed.
    No,
    /// Command was not understood.
    Bad,
    /// Connection is already authenticated (greeting only).
    PreAuth,
    /// Server is closing the connection.
    Bye,
}

impl Status {
    /// Parses a status keyword (case-insensitive).
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BAD" => Some(Self::Bad),
            "PREAUTH" => Some(Self::PreAuth),
            "BYE" => Some(Self::Bye),
            _ => None,
        }
    }
}

/// Bracketed response code, e.g. `[UIDVALIDITY 3857529045]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// Mailbox UID validity.
    UidValidity(u32),
    /// Next UID to be assigned.
    UidNext(u32),
    /// Mailbox opened read-only.
    ReadOnly,
    /// Mailbox opened read-write.
    ReadWrite,
    /// Capability list sent with the greeting or a login response.
    Capability(Vec<String>),
    /// Any other code, kept verbatim.
    Other(String),
}

/// A contiguous, 1-based range of message sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceRange {
    start: u32,
    end: u32,
}

impl SequenceRange {
    /// Creates a range. Returns `None` if `start` is zero or after `end`.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Option<Self> {
        if start == 0 || start > end {
            None
        } else {
            Some(Self { start, end })
        }
    }

    /// Range ending at the newest message of a mailbox holding `total`
    /// messages and starting at `total - count`, clamped to 1.
    ///
    /// A small mailbox therefore yields every message instead of an error.
    /// Returns `None` for an empty mailbox.
    #[must_use]
    pub const fn newest(total: u32, count: u32) -> Option<Self> {
        let start = total.saturating_sub(count);
        Self::new(if start == 0 { 1 } else { start }, total)
    }

    /// First sequence number in the range.
    #[must_use]
    pub const fn start(&self) -> u32 {
        self.start
    }

    /// Last sequence number in the range.
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.end
    }

    /// Number of messages covered.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Always false; a range holds at least one message.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for SequenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

/// Mailbox state reported by SELECT/EXAMINE.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Number of messages in the mailbox.
    pub exists: u32,
    /// Number of recent messages.
    pub recent: u32,
    /// UID validity value.
    pub uid_validity: Option<u32>,
    /// Next UID value.
    pub uid_next: Option<u32>,
    /// True if the server granted read-only access.
    pub read_only: bool,
}

/// One entry of a LIST response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// Mailbox attributes such as `\HasChildren` or `\Noselect`.
    pub attributes: Vec<String>,
    /// Hierarchy delimiter, if the server uses one.
    pub delimiter: Option<char>,
    /// Mailbox name as sent by the server.
    pub name: String,
}

impl ListEntry {
    /// Returns false for `\Noselect` / `\NonExistent` placeholders.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !self.attributes.iter().any(|a| {
            a.eq_ignore_ascii_case("\\Noselect") || a.eq_ignore_ascii_case("\\NonExistent")
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_status_keywords() {
        assert_eq!(Status::from_keyword("ok"), Some(Status::Ok));
        assert_eq!(Status::from_keyword("BYE"), Some(Status::Bye));
        assert_eq!(Status::from_keyword("FETCH"), None);
    }

    #[test]
    fn test_range_display() {
        assert_eq!(SequenceRange::new(1, 5).unwrap().to_string(), "1:5");
        assert_eq!(SequenceRange::new(7, 7).unwrap().to_string(), "7");
        assert!(SequenceRange::new(0, 5).is_none());
        assert!(SequenceRange::new(6, 5).is_none());
    }

    #[test]
    fn test_newest_clamps_small_mailbox() {
        let range = SequenceRange::newest(5, 10).unwrap();
        assert_eq!((range.start(), range.end()), (1, 5));
        assert_eq!(range.len(), 5);
    }

    #[test]
    fn test_newest_large_mailbox() {
        let range = SequenceRange::newest(100, 10).unwrap();
        assert_eq!((range.start(), range.end()), (90, 100));
    }

    #[test]
    fn test_newest_empty_mailbox() {
        assert!(SequenceRange::newest(0, 10).is_none());
        assert!(SequenceRange::newest(0, 0).is_none());
    }

    #[test]
    fn test_list_entry_selectable() {
        let entry = ListEntry {
            attributes: vec!["\\NoSelect".into()],
            delimiter: Some('/'),
            name: "[Gmail]".into(),
        };
        assert!(!entry.is_selectable());
    }

    proptest! {
        #[test]
        fn newest_range_matches_clamped_formula(total in 1u32..1_000_000, count in 0u32..1_000_000) {
            let range = SequenceRange::newest(total, count).unwrap();
            let expected_start = i64::from(total) - i64::from(count);
            prop_assert_eq!(i64::from(range.start()), expected_start.max(1));
            prop_assert_eq!(range.end(), total);
        }
    }
}
