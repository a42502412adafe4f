//! Records written to and read back from the store.

use chrono::{DateTime, FixedOffset};
use mailvault_mime::{Address, MessageHeader};

use crate::error::IngestError;

/// Header record of one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Decoded subject, possibly empty.
    pub subject: String,
    /// Date header; `None` when missing or unparsable.
    pub received: Option<DateTime<FixedOffset>>,
    /// First From address.
    pub from: String,
    /// First To address, empty when missing.
    pub to: String,
}

impl Message {
    /// Extracts the header record.
    ///
    /// Every field is parsed on its own and falls back to its empty value,
    /// except From: a message whose From list is missing, empty or
    /// unparsable cannot be stored.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::MissingSender`] when there is no sender.
    pub fn from_header(header: &MessageHeader, uid: Option<u32>) -> Result<Self, IngestError> {
        let from = match header.address_list("From") {
            Ok(list) => first_address(&list),
            Err(e) => {
                tracing::debug!(?uid, error = %e, "unparsable From header");
                None
            }
        }
        .ok_or(IngestError::MissingSender { uid })?;

        let received = header
            .date()
            .inspect_err(|e| tracing::debug!(?uid, error = %e, "no usable Date header"))
            .ok();

        let subject = header.subject().unwrap_or_else(|e| {
            tracing::debug!(?uid, error = %e, "undecodable Subject header");
            String::new()
        });

        let to = match header.address_list("To") {
            Ok(list) => first_address(&list).unwrap_or_default(),
            Err(e) => {
                tracing::debug!(?uid, error = %e, "unparsable To header");
                String::new()
            }
        };

        Ok(Self {
            subject,
            received,
            from,
            to,
        })
    }
}

fn first_address(list: &[Address]) -> Option<String> {
    list.first().map(ToString::to_string)
}

/// A message row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// Generated id.
    pub id: i64,
    /// Subject.
    pub subject: String,
    /// RFC 3339 timestamp, if the message had a date.
    pub received: Option<String>,
    /// Sender.
    pub from: String,
    /// Recipient.
    pub to: String,
    /// Body text; `None` until a text part was accepted.
    pub content: Option<String>,
}

/// An attachment row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttachment {
    /// Generated id.
    pub id: i64,
    /// Owning message id.
    pub email_id: i64,
    /// Declared filename, possibly empty.
    pub filename: String,
    /// Exact payload.
    pub data: Vec<u8>,
}
