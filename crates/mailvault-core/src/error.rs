//! Error types for the core library.
//!
//! [`Error`] covers setup (configuration and opening the store).
//! [`IngestError`] is the taxonomy of conditions that halt an ingestion
//! run; recoverable conditions never become errors and are only counted.

use thiserror::Error;

use crate::source::SourceError;

/// Errors that can occur while setting up an ingestion run.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML for the expected layout.
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// A condition that stops an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The mailbox session failed or is unavailable.
    #[error("Connection error: {0}")]
    Connection(#[source] SourceError),

    /// A message could not be tokenized at all.
    #[error("Malformed message (uid {uid:?}): {source}")]
    Malformed {
        /// Server UID of the offending message.
        uid: Option<u32>,
        /// Decomposer error.
        #[source]
        source: mailvault_mime::Error,
    },

    /// A message has no usable From list.
    #[error("Message without sender (uid {uid:?})")]
    MissingSender {
        /// Server UID of the offending message.
        uid: Option<u32>,
    },

    /// A store write failed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// The fetch stream ended with an error after the batch drained.
    #[error("Fetch stream error: {0}")]
    FetchStream(#[source] SourceError),
}

/// An ingestion run that halted on an unrecoverable error.
///
/// Rows committed before the halt are kept.
#[derive(Debug, Error)]
#[error("ingestion aborted after {processed} messages: {cause}")]
pub struct Aborted {
    /// What stopped the run.
    #[source]
    pub cause: IngestError,
    /// Messages fully processed before the halt.
    pub processed: usize,
}
