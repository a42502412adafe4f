//! Failures of a read-only mailbox session.
//!
//! Anything that goes wrong between opening the connection and the last
//! FETCH completion is one [`Error`]. Callers mostly care whether the
//! session is still usable: `No` leaves it intact, everything else means
//! the connection should be dropped.

use std::time::Duration;

use thiserror::Error;

/// A mailbox session failure.
#[derive(Debug, Error)]
pub enum Error {
    /// The socket failed or closed mid-exchange.
    #[error("connection to mail server lost: {0}")]
    Io(#[from] std::io::Error),

    /// The TLS handshake or record layer failed.
    #[error("TLS negotiation with mail server failed: {0}")]
    Tls(#[from] rustls::Error),

    /// The configured host is not usable as a TLS server name.
    #[error("mail server host is not a valid TLS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// A server response could not be read, including a FETCH response
    /// whose message data is garbled.
    #[error("unreadable server response (byte {position}): {message}")]
    Parse {
        /// Offset into the raw response line.
        position: usize,
        /// What the reader expected there.
        message: String,
    },

    /// LOGIN was refused.
    #[error("mailbox login refused: {0}")]
    Auth(String),

    /// A command was refused with NO, e.g. an unknown folder on EXAMINE or
    /// messages that could not be fetched.
    #[error("mail server refused the request: {0}")]
    No(String),

    /// A command was rejected with BAD.
    #[error("mail server rejected the command as malformed: {0}")]
    Bad(String),

    /// The server ended the session.
    #[error("mail server closed the session: {0}")]
    Bye(String),

    /// The TCP connect or TLS handshake did not finish in time.
    #[error("no answer from mail server within {0:?}")]
    Timeout(Duration),

    /// The server sent something the session cannot proceed from, such as
    /// a greeting that is neither OK nor BYE.
    #[error("unexpected answer from mail server: {0}")]
    Protocol(String),
}

impl Error {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }
}

/// Result of a mailbox session step.
pub type Result<T> = std::result::Result<T, Error>;
