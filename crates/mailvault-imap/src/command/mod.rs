//! IMAP commands.
//!
//! Only the commands a read-only ingestion client needs are modelled.

mod tag_generator;

pub use tag_generator::TagGenerator;

use crate::types::SequenceRange;

/// An IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// LOGIN username password.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// LIST reference pattern.
    List {
        /// Reference name (usually empty).
        reference: String,
        /// Mailbox pattern with `*` / `%` wildcards.
        pattern: String,
    },
    /// EXAMINE mailbox (read-only SELECT).
    Examine {
        /// Mailbox name.
        mailbox: String,
    },
    /// FETCH range (UID BODY.PEEK[]): full bodies without setting `\Seen`.
    FetchBodies {
        /// Messages to fetch.
        range: SequenceRange,
    },
    /// LOGOUT.
    Logout,
}

impl Command {
    /// Serializes the command with the given tag, including the trailing CRLF.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username);
                buf.push(b' ');
                write_astring(&mut buf, password);
            }
            Self::List { reference, pattern } => {
                buf.extend_from_slice(b"LIST ");
                write_astring(&mut buf, reference);
                buf.push(b' ');
                write_list_mailbox(&mut buf, pattern);
            }
            Self::Examine { mailbox } => {
                buf.extend_from_slice(b"EXAMINE ");
                write_astring(&mut buf, mailbox);
            }
            Self::FetchBodies { range } => {
                buf.extend_from_slice(format!("FETCH {range} (UID BODY.PEEK[])").as_bytes());
            }
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }
}

/// Writes an astring (atom or quoted string).
fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        write_quoted(buf, s);
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

/// Writes a LIST pattern, where `*` and `%` are allowed unquoted.
fn write_list_mailbox(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(|b| b != b'*' && b != b'%' && needs_quoting(b)) {
        write_quoted(buf, s);
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

fn write_quoted(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for b in s.bytes() {
        if b == b'"' || b == b'\\' {
            buf.push(b'\\');
        }
        buf.push(b);
    }
    buf.push(b'"');
}

/// Returns true if the byte needs quoting.
const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']') || b < 0x20 || b == 0x7F
}
