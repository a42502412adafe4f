//! Remote mailbox abstraction.
//!
//! A [`MessageSource`] selects a folder and hands out the raw bodies of a
//! sequence range as a [`MessageBatch`]: a bounded queue filled by a
//! background producer, plus the terminal status of the retrieval, which
//! is only read once the queue has been drained.

mod imap;

use std::future::Future;

use mailvault_imap::SequenceRange;
use tokio::sync::{mpsc, oneshot};

pub use self::imap::ImapSource;

/// Errors raised by a message source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// IMAP protocol or connection failure.
    #[error("IMAP error: {0}")]
    Imap(#[from] mailvault_imap::Error),

    /// The server answered a FETCH without the message body.
    #[error("server did not return a body for message {seq} (uid {uid:?})")]
    MissingBody {
        /// Sequence number.
        seq: u32,
        /// UID, if known.
        uid: Option<u32>,
    },

    /// The session cannot serve this request.
    #[error("mailbox session unavailable: {0}")]
    SessionUnavailable(&'static str),

    /// The background fetch task failed.
    #[error("fetch task failed: {0}")]
    Producer(String),
}

/// A raw message as retrieved from the mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Sequence number in the selected folder.
    pub seq: u32,
    /// Server-assigned UID, for diagnostics.
    pub uid: Option<u32>,
    /// Full RFC 5322 message.
    pub body: Vec<u8>,
}

/// A remote mailbox.
///
/// Any error returned here is fatal to an ingestion run.
pub trait MessageSource: Send {
    /// Enumerates folder names.
    fn folders(&mut self) -> impl Future<Output = Result<Vec<String>, SourceError>> + Send;

    /// Opens `folder` read-only and returns its message count.
    fn select(&mut self, folder: &str) -> impl Future<Output = Result<u32, SourceError>> + Send;

    /// Starts retrieving the bodies in `range`.
    fn fetch(
        &mut self,
        range: SequenceRange,
    ) -> impl Future<Output = Result<MessageBatch, SourceError>> + Send;

    /// Ends the session.
    fn logout(&mut self) -> impl Future<Output = Result<(), SourceError>> + Send;
}

/// Consumer side of a batch retrieval.
#[derive(Debug)]
pub struct MessageBatch {
    messages: mpsc::Receiver<RawMessage>,
    outcome: oneshot::Receiver<Result<(), SourceError>>,
}

/// Producer side of a batch retrieval.
#[derive(Debug)]
pub struct BatchSender {
    messages: mpsc::Sender<RawMessage>,
    outcome: oneshot::Sender<Result<(), SourceError>>,
}

impl MessageBatch {
    /// Creates a batch whose queue holds at most `capacity` messages.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn channel(capacity: usize) -> (BatchSender, Self) {
        let (message_tx, message_rx) = mpsc::channel(capacity);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        (
            BatchSender {
                messages: message_tx,
                outcome: outcome_tx,
            },
            Self {
                messages: message_rx,
                outcome: outcome_rx,
            },
        )
    }

    /// Creates an already completed batch.
    #[must_use]
    pub fn ready(messages: Vec<RawMessage>, outcome: Result<(), SourceError>) -> Self {
        let (sender, batch) = Self::channel(messages.len().max(1));
        for message in messages {
            // Capacity covers every message and the receiver is alive.
            let _ = sender.messages.try_send(message);
        }
        sender.finish(outcome);
        batch
    }

    /// Receives the next message; `None` once the producer is done.
    pub async fn next(&mut self) -> Option<RawMessage> {
        self.messages.recv().await
    }

    /// Returns the terminal status of the retrieval.
    ///
    /// Messages still queued are discarded.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the retrieval, if any.
    pub async fn finish(self) -> Result<(), SourceError> {
        let Self { messages, outcome } = self;
        drop(messages);
        outcome
            .await
            .unwrap_or_else(|_| Err(SourceError::Producer("ended without a status".into())))
    }
}

impl BatchSender {
    /// Queues a message, waiting for room.
    ///
    /// Returns false if the batch has been dropped.
    pub async fn send(&self, message: RawMessage) -> bool {
        self.messages.send(message).await.is_ok()
    }

    /// Resolves once the batch has been dropped.
    pub async fn closed(&self) {
        self.messages.closed().await;
    }

    /// Reports the terminal status and closes the queue.
    pub fn finish(self, outcome: Result<(), SourceError>) {
        // The consumer may be gone; nobody is left to tell.
        let _ = self.outcome.send(outcome);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn raw(seq: u32) -> RawMessage {
        RawMessage {
            seq,
            uid: Some(seq + 100),
            body: format!("Subject: {seq}\r\n\r\nbody\r\n").into_bytes(),
        }
    }

    #[tokio::test]
    async fn test_ready_batch_yields_in_order() {
        let mut batch = MessageBatch::ready(vec![raw(1), raw(2)], Ok(()));
        assert_eq!(batch.next().await.unwrap().seq, 1);
        assert_eq!(batch.next().await.unwrap().seq, 2);
        assert!(batch.next().await.is_none());
        assert!(batch.finish().await.is_ok());
    }

    #[tokio::test]
    async fn test_terminal_error_arrives_after_messages() {
        let mut batch = MessageBatch::ready(
            vec![raw(1)],
            Err(SourceError::MissingBody { seq: 2, uid: None }),
        );
        assert!(batch.next().await.is_some());
        assert!(batch.next().await.is_none());
        assert!(matches!(
            batch.finish().await,
            Err(SourceError::MissingBody { seq: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_producer_sees_dropped_batch() {
        let (sender, batch) = MessageBatch::channel(1);
        drop(batch);
        assert!(!sender.send(raw(1)).await);
    }

    #[tokio::test]
    async fn test_producer_is_woken_by_dropped_batch() {
        let (sender, batch) = MessageBatch::channel(1);
        let waiter = tokio::spawn(async move { sender.closed().await });
        drop(batch);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_vanished_producer_is_an_error() {
        let (sender, batch) = MessageBatch::channel(1);
        drop(sender);
        assert!(matches!(
            batch.finish().await,
            Err(SourceError::Producer(_))
        ));
    }
}
