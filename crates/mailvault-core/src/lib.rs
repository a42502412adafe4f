//! # mailvault-core
//!
//! Mail ingestion: pulls the newest messages of a mailbox folder, splits
//! each into a header record, body text and attachments, and writes them
//! to a SQLite store.
//!
//! ## Flow
//!
//! ```text
//! MessageSource ──→ MessageReader ──→ validate ──→ PersistenceSink
//!  (IMAP FETCH)     (MIME parts)     (text only)   (SQLite rows)
//! ```
//!
//! [`IngestionPipeline::run`] handles one message at a time. Skippable
//! problems are counted in the [`BatchReport`]; anything else ends the run
//! with [`Aborted`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod model;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod validator;

pub use config::Config;
pub use error::{Aborted, Error, IngestError, Result};
pub use mailvault_imap::SequenceRange;
pub use model::{Message, StoredAttachment, StoredMessage};
pub use pipeline::{BatchReport, IngestionPipeline};
pub use source::{BatchSender, ImapSource, MessageBatch, MessageSource, RawMessage, SourceError};
pub use store::{MailStore, PersistenceSink};
pub use validator::{Rejection, Validation, validate};
