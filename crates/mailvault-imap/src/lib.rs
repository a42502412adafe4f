//! # mailvault-imap
//!
//! A small async IMAP client for read-only bulk retrieval (RFC 3501 /
//! RFC 9051 subset): LOGIN, LIST, EXAMINE and a streaming
//! `FETCH (UID BODY.PEEK[])`.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailvault_imap::{Client, Config, SequenceRange, connection};
//!
//! let stream = connection::connect(&Config::new("imap.example.com")).await?;
//! let mut client = Client::from_stream(stream)
//!     .await?
//!     .login("user@example.com", "password")
//!     .await?;
//!
//! for folder in client.list("", "*").await? {
//!     println!("{}", folder.name);
//! }
//!
//! let mut client = client.examine("INBOX").await?;
//! if let Some(range) = SequenceRange::newest(client.selected().exists(), 50) {
//!     let mut fetch = client.fetch_bodies(range).await?;
//!     while let Some(message) = fetch.next().await {
//!         let message = message?;
//!         println!("#{} uid={:?}", message.seq, message.uid);
//!     }
//! }
//! client.logout().await?;
//! ```
//!
//! ## Connection States
//!
//! ```text
//! NotAuthenticated ── login() ──→ Authenticated ── examine() ──→ Selected
//! ```
//!
//! `logout()` is available in every state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, ConfigBuilder, FetchStream, FetchedMessage, FramedStream,
    ImapStream, NotAuthenticated, Security, Selected,
};
pub use error::{Error, Result};
pub use parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
pub use types::{ListEntry, MailboxStatus, ResponseCode, SequenceRange, Status};
