//! SQLite-backed message store.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use super::PersistenceSink;
use crate::Result;
use crate::model::{Message, StoredAttachment, StoredMessage};

/// Message store on a pooled SQLite database.
#[derive(Debug, Clone)]
pub struct MailStore {
    pool: SqlitePool,
}

impl MailStore {
    /// Opens (or creates) the database at `database_path`.
    ///
    /// The pool never holds more than `max_connections` connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str, max_connections: u32) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        tracing::debug!(database_path, max_connections, "message store opened");
        Ok(store)
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS email (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject TEXT NOT NULL DEFAULT '',
                received TEXT,
                mailfrom TEXT NOT NULL,
                mailto TEXT NOT NULL DEFAULT '',
                content TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS attachment (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL DEFAULT '',
                data BLOB NOT NULL,
                email INTEGER NOT NULL REFERENCES email(id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_attachment_email ON attachment(email)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Get a stored message by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn message(&self, id: i64) -> Result<Option<StoredMessage>> {
        let row = sqlx::query(
            r"
            SELECT id, subject, received, mailfrom, mailto, content
            FROM email WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_message))
    }

    /// Get all stored messages in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn messages(&self) -> Result<Vec<StoredMessage>> {
        let rows = sqlx::query(
            r"
            SELECT id, subject, received, mailfrom, mailto, content
            FROM email ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_message).collect())
    }

    /// Get the attachments of a message in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn attachments(&self, email_id: i64) -> Result<Vec<StoredAttachment>> {
        let rows = sqlx::query(
            r"
            SELECT id, filename, data, email
            FROM attachment WHERE email = ? ORDER BY id
            ",
        )
        .bind(email_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| StoredAttachment {
                id: row.get("id"),
                email_id: row.get("email"),
                filename: row.get("filename"),
                data: row.get("data"),
            })
            .collect())
    }

    /// Count stored messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn message_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM email")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("count"))
    }
}

fn row_to_message(row: &SqliteRow) -> StoredMessage {
    StoredMessage {
        id: row.get("id"),
        subject: row.get("subject"),
        received: row.get("received"),
        from: row.get("mailfrom"),
        to: row.get("mailto"),
        content: row.get("content"),
    }
}

impl PersistenceSink for MailStore {
    async fn insert_header(&self, message: &Message) -> std::result::Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r"
            INSERT INTO email (subject, received, mailfrom, mailto)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(&message.subject)
        .bind(message.received.map(|date| date.to_rfc3339()))
        .bind(&message.from)
        .bind(&message.to)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn update_body_text(&self, id: i64, text: &str) -> std::result::Result<(), sqlx::Error> {
        sqlx::query("UPDATE email SET content = ? WHERE id = ?")
            .bind(text)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_attachment(
        &self,
        filename: &str,
        data: &[u8],
        id: i64,
    ) -> std::result::Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO attachment (filename, data, email) VALUES (?, ?, ?)")
            .bind(filename)
            .bind(data)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
