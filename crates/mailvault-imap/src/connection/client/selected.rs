//! Implementation for the selected state: streaming body retrieval.
//!
//! [`Client::fetch_bodies`] sends one FETCH for a whole range and returns a
//! [`FetchStream`] that yields each message as soon as its response has
//! been read, so only one body is held in memory at a time.

use tokio::io::{AsyncRead, AsyncWrite};

use super::states::Selected;
use super::{Client, check_status, is_tagged_with};
use crate::command::Command;
use crate::parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
use crate::types::{SequenceRange, Status};
use crate::{Error, Result};

/// A message returned by a FETCH response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    /// Sequence number.
    pub seq: u32,
    /// UID, if the server sent one.
    pub uid: Option<u32>,
    /// Full message body; `None` if the response carried no `BODY[]`.
    pub body: Option<Vec<u8>>,
}

impl FetchedMessage {
    fn from_items(seq: u32, items: Vec<FetchItem>) -> Self {
        let mut message = Self {
            seq,
            uid: None,
            body: None,
        };
        for item in items {
            match item {
                FetchItem::Uid(uid) => message.uid = Some(uid),
                FetchItem::Body { section, data } if section.is_empty() => message.body = data,
                _ => {}
            }
        }
        message
    }
}

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the selected mailbox state.
    #[must_use]
    pub const fn selected(&self) -> &Selected {
        &self.state
    }

    /// Fetches full bodies (and UIDs) for `range` without setting `\Seen`.
    ///
    /// The returned stream must be driven to its end before the client is
    /// used for another command.
    pub async fn fetch_bodies(&mut self, range: SequenceRange) -> Result<FetchStream<'_, S>> {
        let tag = self.send(&Command::FetchBodies { range }).await?;
        tracing::debug!(%range, %tag, "FETCH started");
        Ok(FetchStream {
            client: self,
            tag,
            done: false,
        })
    }
}

/// Responses of one FETCH command, read lazily.
pub struct FetchStream<'a, S> {
    client: &'a mut Client<S, Selected>,
    tag: String,
    done: bool,
}

impl<S> FetchStream<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the next fetched message.
    ///
    /// `None` means the FETCH completed successfully. An error ends the
    /// stream: a NO/BAD completion, a BYE, a FETCH response that cannot be
    /// parsed, or a broken connection.
    pub async fn next(&mut self) -> Option<Result<FetchedMessage>> {
        if self.done {
            return None;
        }

        let outcome = self.read_next().await;
        if !matches!(outcome, Some(Ok(_))) {
            self.done = true;
        }
        outcome
    }

    async fn read_next(&mut self) -> Option<Result<FetchedMessage>> {
        loop {
            let raw = match self.client.stream.read_response().await {
                Ok(raw) => raw,
                Err(e) => return Some(Err(e)),
            };

            match ResponseParser::parse(&raw) {
                Ok(Response::Untagged(UntaggedResponse::Fetch { seq, items })) => {
                    return Some(Ok(FetchedMessage::from_items(seq, items)));
                }
                Ok(Response::Untagged(UntaggedResponse::Exists(n))) => {
                    self.client.state.status.exists = n;
                }
                Ok(Response::Untagged(UntaggedResponse::Status {
                    status: Status::Bye,
                    text,
                    ..
                })) => return Some(Err(Error::Bye(text))),
                Ok(Response::Tagged {
                    tag, status, text, ..
                }) if tag == self.tag => {
                    return check_status(status, text).err().map(Err);
                }
                Ok(other) => tracing::debug!(?other, "ignoring response during FETCH"),
                Err(e) if is_tagged_with(&raw, &self.tag) || is_fetch_data(&raw) => {
                    return Some(Err(e));
                }
                Err(e) => tracing::warn!(?e, "skipping unparsable untagged response"),
            }
        }
    }
}

/// True for `* <n> FETCH ...`, whatever follows.
fn is_fetch_data(raw: &[u8]) -> bool {
    let Some(rest) = raw.strip_prefix(b"* ") else {
        return false;
    };
    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    digits > 0
        && rest
            .get(digits..digits + 6)
            .is_some_and(|word| word.eq_ignore_ascii_case(b" FETCH"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_fetch_data() {
        assert!(is_fetch_data(b"* 2 FETCH (UID x2 BODY[] {5}\r\nhello)\r\n"));
        assert!(is_fetch_data(b"* 17 fetch garbage"));
        assert!(!is_fetch_data(b"* 3 EXISTS\r\n"));
        assert!(!is_fetch_data(b"* OK [ALERT] FETCH soon\r\n"));
        assert!(!is_fetch_data(b"A0003 FETCH\r\n"));
    }

    #[test]
    fn test_fetched_message_from_items() {
        let message = FetchedMessage::from_items(
            4,
            vec![
                FetchItem::Flags(vec![]),
                FetchItem::Uid(99),
                FetchItem::Body {
                    section: "HEADER".into(),
                    data: Some(b"ignored".to_vec()),
                },
                FetchItem::Body {
                    section: String::new(),
                    data: Some(b"full".to_vec()),
                },
            ],
        );
        assert_eq!(message.seq, 4);
        assert_eq!(message.uid, Some(99));
        assert_eq!(message.body.as_deref(), Some(&b"full"[..]));
    }

    #[test]
    fn test_fetched_message_without_body() {
        let message = FetchedMessage::from_items(1, vec![FetchItem::Uid(5)]);
        assert!(message.body.is_none());
    }
}
