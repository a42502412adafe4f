//! Type-state IMAP client connection.
//!
//! Uses the type-state pattern to enforce valid state transitions at compile time.
//! The IMAP connection states are:
//!
//! - `NotAuthenticated`: Initial state after connection
//! - `Authenticated`: After successful LOGIN
//! - `Selected`: After successful EXAMINE
//!
//! Each state only exposes methods that are valid for that state.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

pub use self::selected::{FetchStream, FetchedMessage};
pub use self::states::{Authenticated, NotAuthenticated, Selected};
use super::framed::FramedStream;
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{ResponseCode, Status};
use crate::{Error, Result};

/// IMAP client connection with type-state.
///
/// The type parameter `State` tracks the connection state at compile time.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) capabilities: Vec<String>,
    pub(crate) state: State,
}

// Manual Debug implementation since FramedStream doesn't implement Debug
impl<S, State: std::fmt::Debug> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Untagged data collected while a command ran, plus the code of its
/// tagged OK.
#[derive(Debug, Default)]
pub(crate) struct Completion {
    pub(crate) untagged: Vec<UntaggedResponse>,
    pub(crate) code: Option<ResponseCode>,
}

/// Shared implementation for all states.
impl<S, State> Client<S, State>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    /// Returns the server capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Checks if the server advertised a capability (case-insensitive).
    #[must_use]
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| c.eq_ignore_ascii_case(capability))
    }

    /// Ends the session. The server's BYE and the connection closing are
    /// both expected here, so only write failures are reported.
    pub async fn logout(mut self) -> Result<()> {
        let tag = self.send(&Command::Logout).await?;
        if let Err(e) = self.run_to_completion(&tag).await {
            tracing::debug!(?e, "LOGOUT did not complete cleanly");
        }
        Ok(())
    }

    /// Writes a command and returns the tag it was sent with.
    pub(crate) async fn send(&mut self, command: &Command) -> Result<String> {
        let tag = self.tag_gen.next();
        self.stream.write_command(&command.serialize(&tag)).await?;
        Ok(tag)
    }

    /// Sends a command and reads responses until its tagged completion.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Completion> {
        let tag = self.send(command).await?;
        self.run_to_completion(&tag).await
    }

    /// Reads responses until the tagged completion for `tag`.
    ///
    /// Untagged responses that cannot be parsed are logged and skipped.
    pub(crate) async fn run_to_completion(&mut self, tag: &str) -> Result<Completion> {
        let mut completion = Completion::default();

        loop {
            let raw = self.stream.read_response().await?;
            match ResponseParser::parse(&raw) {
                Ok(Response::Tagged {
                    tag: resp_tag,
                    status,
                    code,
                    text,
                }) if resp_tag == tag => {
                    check_status(status, text)?;
                    completion.code = code;
                    return Ok(completion);
                }
                Ok(Response::Untagged(untagged)) => completion.untagged.push(untagged),
                Ok(other) => tracing::debug!(?other, "ignoring unexpected response"),
                Err(e) if is_tagged_with(&raw, tag) => return Err(e),
                Err(e) => tracing::warn!(?e, "skipping unparsable response"),
            }
        }
    }
}

/// Maps a completion status to a result.
pub(crate) fn check_status(status: Status, text: String) -> Result<()> {
    match status {
        Status::Ok | Status::PreAuth => Ok(()),
        Status::No => Err(Error::No(text)),
        Status::Bad => Err(Error::Bad(text)),
        Status::Bye => Err(Error::Bye(text)),
    }
}

/// Returns true if a raw response starts with `tag` followed by a space.
pub(crate) fn is_tagged_with(raw: &[u8], tag: &str) -> bool {
    raw.strip_prefix(tag.as_bytes())
        .is_some_and(|rest| rest.first() == Some(&b' '))
}
