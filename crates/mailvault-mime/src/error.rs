//! Error types for MIME decomposition.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The raw stream could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The header block or MIME structure cannot be tokenized.
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// Unknown or undecodable transfer encoding.
    #[error("Unknown transfer encoding: {0}")]
    UnknownTransferEncoding(String),

    /// Unknown character set.
    #[error("Unknown charset: {0}")]
    UnknownCharset(String),

    /// Encoded payload does not match its declared encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Header field is not present.
    #[error("Missing header: {0}")]
    MissingHeader(String),

    /// Header field is present but cannot be parsed.
    #[error("Invalid {field} header: {reason}")]
    InvalidHeader {
        /// Header name.
        field: String,
        /// What went wrong.
        reason: String,
    },

    /// Multipart body is missing a delimiter line.
    #[error("Invalid multipart structure: {0}")]
    InvalidMultipart(String),
}

impl Error {
    /// Returns true for errors caused by an encoding this crate does not
    /// understand (transfer encoding or charset).
    ///
    /// These are the errors a caller can treat as "skip this message".
    #[must_use]
    pub const fn is_unknown_encoding(&self) -> bool {
        matches!(
            self,
            Self::UnknownTransferEncoding(_) | Self::UnknownCharset(_)
        )
    }

    pub(crate) fn invalid_header(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
