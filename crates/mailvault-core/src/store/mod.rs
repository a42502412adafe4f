//! Persistence of message records.
//!
//! A message is written as one header row, then at most one body-text
//! update, then zero or more attachment rows referencing the header's id.
//! Each write commits on its own; a failure part-way through leaves the
//! rows already written in place.

mod sqlite;

use std::future::Future;

pub use self::sqlite::MailStore;
use crate::model::Message;

/// Destination for decomposed messages.
pub trait PersistenceSink: Send + Sync {
    /// Inserts a header row and returns its generated id.
    fn insert_header(
        &self,
        message: &Message,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;

    /// Sets the body text of an inserted header row.
    fn update_body_text(
        &self,
        id: i64,
        text: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Inserts an attachment row owned by message `id`.
    fn insert_attachment(
        &self,
        filename: &str,
        data: &[u8],
        id: i64,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}
