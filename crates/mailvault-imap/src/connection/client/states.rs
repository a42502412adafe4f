//! Type-state markers for IMAP client connection states.
//!
//! `Selected` is not a bare marker: it carries the mailbox that was opened
//! and the status snapshot the server sent with EXAMINE.

use crate::types::MailboxStatus;

/// Marker type for the not-authenticated state.
///
/// In this state, only LOGIN and LOGOUT are valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Marker type for the authenticated state.
///
/// In this state, LIST and EXAMINE are valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// State for a selected mailbox.
#[derive(Debug, Clone)]
pub struct Selected {
    pub(crate) mailbox: String,
    pub(crate) status: MailboxStatus,
}

impl Selected {
    /// Creates a new Selected state.
    #[must_use]
    pub fn new(mailbox: impl Into<String>, status: MailboxStatus) -> Self {
        Self {
            mailbox: mailbox.into(),
            status,
        }
    }

    /// Returns the name of the selected mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// Returns the mailbox status snapshot, updated by EXISTS responses.
    #[must_use]
    pub const fn status(&self) -> &MailboxStatus {
        &self.status
    }

    /// Returns the number of messages in the mailbox.
    #[must_use]
    pub const fn exists(&self) -> u32 {
        self.status.exists
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}

    #[test]
    fn test_states_are_send() {
        assert_send::<NotAuthenticated>();
        assert_send::<Authenticated>();
        assert_send::<Selected>();
    }

    #[test]
    fn test_selected_accessors() {
        let status = MailboxStatus {
            exists: 100,
            uid_validity: Some(12345),
            read_only: true,
            ..Default::default()
        };
        let selected = Selected::new("INBOX", status);

        assert_eq!(selected.mailbox(), "INBOX");
        assert_eq!(selected.exists(), 100);
        assert!(selected.status().read_only);
    }
}
