//! Implementation for the authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::states::{Authenticated, Selected};
use super::{Client, Completion};
use crate::Result;
use crate::command::Command;
use crate::parser::UntaggedResponse;
use crate::types::{ListEntry, MailboxStatus, ResponseCode};

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Lists mailboxes matching a pattern.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListEntry>> {
        let completion = self
            .execute(&Command::List {
                reference: reference.to_string(),
                pattern: pattern.to_string(),
            })
            .await?;

        Ok(completion
            .untagged
            .into_iter()
            .filter_map(|untagged| match untagged {
                UntaggedResponse::List(entry) => Some(entry),
                _ => None,
            })
            .collect())
    }

    /// Opens a mailbox read-only (EXAMINE).
    ///
    /// Consumes self and returns a selected client on success.
    pub async fn examine(mut self, mailbox: &str) -> Result<Client<S, Selected>> {
        let completion = self
            .execute(&Command::Examine {
                mailbox: mailbox.to_string(),
            })
            .await?;
        let status = mailbox_status(completion);

        tracing::debug!(mailbox, exists = status.exists, "mailbox opened read-only");
        Ok(Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            state: Selected::new(mailbox, status),
        })
    }
}

/// Collects the SELECT/EXAMINE data into a status snapshot.
fn mailbox_status(completion: Completion) -> MailboxStatus {
    let mut status = MailboxStatus {
        read_only: matches!(completion.code, Some(ResponseCode::ReadOnly)),
        ..MailboxStatus::default()
    };

    for untagged in completion.untagged {
        match untagged {
            UntaggedResponse::Exists(n) => status.exists = n,
            UntaggedResponse::Recent(n) => status.recent = n,
            UntaggedResponse::Status {
                code: Some(ResponseCode::UidValidity(v)),
                ..
            } => status.uid_validity = Some(v),
            UntaggedResponse::Status {
                code: Some(ResponseCode::UidNext(v)),
                ..
            } => status.uid_next = Some(v),
            _ => {}
        }
    }

    status
}
