//! Implementation for the not-authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::{Command, TagGenerator};
use crate::connection::framed::FramedStream;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{ResponseCode, Status};
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new client from a connected stream.
    ///
    /// Reads the server greeting and any capabilities it carries.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);

        let greeting = framed.read_response().await?;
        let capabilities = match ResponseParser::parse(&greeting)? {
            Response::Untagged(UntaggedResponse::Status {
                status: Status::Ok | Status::PreAuth,
                code,
                ..
            }) => match code {
                Some(ResponseCode::Capability(caps)) => caps,
                _ => Vec::new(),
            },
            Response::Untagged(UntaggedResponse::Status {
                status: Status::Bye,
                text,
                ..
            }) => return Err(Error::Bye(text)),
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        };

        tracing::debug!(?capabilities, "server greeting received");
        Ok(Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            capabilities,
            state: NotAuthenticated,
        })
    }

    /// Authenticates with the server using LOGIN.
    ///
    /// Consumes self and returns an authenticated client on success. A NO
    /// completion is reported as [`Error::Auth`].
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let command = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };

        let completion = match self.execute(&command).await {
            Ok(completion) => completion,
            Err(Error::No(text)) => return Err(Error::Auth(text)),
            Err(e) => return Err(e),
        };

        // Servers may announce post-login capabilities either way.
        if let Some(ResponseCode::Capability(caps)) = completion.code {
            self.capabilities = caps;
        }
        for untagged in completion.untagged {
            if let UntaggedResponse::Capability(caps) = untagged {
                self.capabilities = caps;
            }
        }

        tracing::info!(username, "logged in");
        Ok(Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            state: Authenticated,
        })
    }
}
