//! [`MessageSource`] over an IMAP session.
//!
//! `fetch` moves the selected client into a spawned task that streams
//! bodies into the batch queue. The task hands the client back through
//! its join handle, and the next call on the source waits for it.
//!
//! A task that stops before the FETCH completion (dropped batch, garbled
//! or failed stream) leaves the connection mid-command. It hands nothing
//! back; the connection is closed without a LOGOUT.

use mailvault_imap::{
    Authenticated, Client, FetchedMessage, ImapStream, SequenceRange, Selected, connection,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;

use super::{BatchSender, MessageBatch, MessageSource, RawMessage, SourceError};
use crate::config::ImapConfig;

enum Session<S> {
    Authenticated(Client<S, Authenticated>),
    Selected(Client<S, Selected>),
    Fetching(JoinHandle<Option<Client<S, Selected>>>),
    Closed,
}

/// Message source backed by a logged-in IMAP client.
pub struct ImapSource<S = ImapStream> {
    session: Session<S>,
    queue_capacity: usize,
}

impl<S> std::fmt::Debug for ImapSource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = match self.session {
            Session::Authenticated(_) => "authenticated",
            Session::Selected(_) => "selected",
            Session::Fetching(_) => "fetching",
            Session::Closed => "closed",
        };
        f.debug_struct("ImapSource")
            .field("session", &session)
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

impl ImapSource<ImapStream> {
    /// Connects and logs in.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, greeting or login fails.
    pub async fn connect(config: &ImapConfig, queue_capacity: usize) -> Result<Self, SourceError> {
        let stream = connection::connect(&config.connection()).await?;
        let client = Client::from_stream(stream)
            .await?
            .login(&config.username, &config.password)
            .await?;
        Ok(Self::new(client, queue_capacity))
    }
}

impl<S> ImapSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps an authenticated client.
    ///
    /// `queue_capacity` bounds how many fetched messages may wait for the
    /// consumer; it is raised to 1 if zero.
    #[must_use]
    pub fn new(client: Client<S, Authenticated>, queue_capacity: usize) -> Self {
        Self {
            session: Session::Authenticated(client),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Waits for a running fetch task and takes the client back, if the
    /// task left it usable.
    async fn reclaim(&mut self) -> Result<(), SourceError> {
        match std::mem::replace(&mut self.session, Session::Closed) {
            Session::Fetching(handle) => {
                let client = handle
                    .await
                    .map_err(|e| SourceError::Producer(e.to_string()))?;
                match client {
                    Some(client) => self.session = Session::Selected(client),
                    None => tracing::debug!("FETCH interrupted, connection dropped"),
                }
            }
            other => self.session = other,
        }
        Ok(())
    }
}

impl<S> MessageSource for ImapSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn folders(&mut self) -> Result<Vec<String>, SourceError> {
        let Session::Authenticated(client) = &mut self.session else {
            return Err(SourceError::SessionUnavailable(
                "folders can only be listed before a folder is selected",
            ));
        };

        let entries = client.list("", "*").await?;
        Ok(entries.into_iter().map(|entry| entry.name).collect())
    }

    async fn select(&mut self, folder: &str) -> Result<u32, SourceError> {
        let client = match std::mem::replace(&mut self.session, Session::Closed) {
            Session::Authenticated(client) => client,
            other => {
                self.session = other;
                return Err(SourceError::SessionUnavailable("a folder is already selected"));
            }
        };

        let client = client.examine(folder).await?;
        let exists = client.selected().exists();
        tracing::info!(folder, exists, "folder selected");
        self.session = Session::Selected(client);
        Ok(exists)
    }

    async fn fetch(&mut self, range: SequenceRange) -> Result<MessageBatch, SourceError> {
        self.reclaim().await?;
        let mut client = match std::mem::replace(&mut self.session, Session::Closed) {
            Session::Selected(client) => client,
            Session::Closed => {
                return Err(SourceError::SessionUnavailable("connection is closed"));
            }
            other => {
                self.session = other;
                return Err(SourceError::SessionUnavailable("no folder is selected"));
            }
        };

        let (sender, batch) = MessageBatch::channel(self.queue_capacity);
        let handle = tokio::spawn(async move {
            let outcome = produce(&mut client, range, &sender).await;
            let completed = matches!(outcome, Ok(()) | Err(SourceError::MissingBody { .. }));
            if let Err(e) = &outcome {
                tracing::debug!(error = %e, completed, "fetch task finished with error");
            }
            sender.finish(outcome);
            completed.then_some(client)
        });

        self.session = Session::Fetching(handle);
        Ok(batch)
    }

    async fn logout(&mut self) -> Result<(), SourceError> {
        self.reclaim().await?;
        match std::mem::replace(&mut self.session, Session::Closed) {
            Session::Authenticated(client) => client.logout().await?,
            Session::Selected(client) => client.logout().await?,
            Session::Fetching(_) | Session::Closed => {}
        }
        Ok(())
    }
}

/// Streams one FETCH into the queue.
///
/// Returns as soon as the batch is dropped or the stream fails. A missing
/// body stops delivery but the FETCH is still read to its completion, so
/// only `Ok` and `MissingBody` leave the session usable.
async fn produce<S>(
    client: &mut Client<S, Selected>,
    range: SequenceRange,
    sender: &BatchSender,
) -> Result<(), SourceError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut fetch = client.fetch_bodies(range).await?;
    let mut failure = None;

    loop {
        let item = tokio::select! {
            () = sender.closed() => return Err(abandoned()),
            item = fetch.next() => item,
        };
        let Some(item) = item else { break };
        let FetchedMessage { seq, uid, body } = item?;
        if failure.is_some() {
            continue;
        }

        match body {
            Some(body) => {
                if !sender.send(RawMessage { seq, uid, body }).await {
                    return Err(abandoned());
                }
            }
            None => failure = Some(SourceError::MissingBody { seq, uid }),
        }
    }

    failure.map_or(Ok(()), Err)
}

fn abandoned() -> SourceError {
    SourceError::Producer("batch dropped before the FETCH completed".into())
}
