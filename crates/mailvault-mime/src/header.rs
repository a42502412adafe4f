//! Header block tokenizing and typed header access.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

use crate::address::{Address, parse_address_list};
use crate::content_type::{ContentDisposition, ContentType};
use crate::encoding::{TransferEncoding, decode_rfc2047};
use crate::error::{Error, Result};

/// Collection of header fields, keyed by lowercased name.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: HashMap<String, Vec<String>>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_ascii_lowercase();
        self.headers.entry(name).or_default().push(value.into());
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|v| v.first().map(String::as_str))
    }

    /// Returns true if no header fields were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Parses a header block.
    ///
    /// Folded continuation lines (leading space or tab) are unfolded. Parsing
    /// stops at the first empty line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if a line is neither a continuation nor a
    /// `Name: value` field, or if the block starts with a continuation line.
    pub fn parse(text: &str) -> Result<Self> {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                let Some((_, value)) = current.as_mut() else {
                    return Err(Error::Malformed(format!(
                        "header block starts with a continuation line: {line:?}"
                    )));
                };
                value.push(' ');
                value.push_str(line.trim());
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value.trim().to_string());
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::Malformed(format!("malformed header line: {line:?}")))?;
            let name = name.trim_end();
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(Error::Malformed(format!("invalid header name: {name:?}")));
            }
            current = Some((name.to_string(), value.trim().to_string()));
        }

        if let Some((name, value)) = current {
            headers.add(name, value.trim().to_string());
        }

        Ok(headers)
    }

    /// Parses the Content-Type field, defaulting to `text/plain`.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is present but invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Parses the Content-Transfer-Encoding field, defaulting to 7bit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTransferEncoding`] for unsupported mechanisms.
    pub fn transfer_encoding(&self) -> Result<TransferEncoding> {
        self.get("content-transfer-encoding")
            .map_or(Ok(TransferEncoding::SevenBit), TransferEncoding::parse)
    }

    /// Parses the Content-Disposition field if present.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.get("content-disposition").map(ContentDisposition::parse)
    }
}

/// Splits a raw entity into its header block and the offset where the body
/// starts.
///
/// The blank separator line belongs to neither half. An entity without a
/// separator is all header, and its body starts at `raw.len()`.
#[must_use]
pub fn split_entity(raw: &[u8]) -> (&[u8], usize) {
    if raw.starts_with(b"\r\n") {
        return (&[], 2);
    }
    if raw.starts_with(b"\n") {
        return (&[], 1);
    }

    let mut i = 0;
    while let Some(offset) = raw[i..].iter().position(|&b| b == b'\n') {
        let nl = i + offset;
        let rest = &raw[nl + 1..];
        if rest.starts_with(b"\r\n") {
            return (&raw[..=nl], nl + 3);
        }
        if rest.starts_with(b"\n") {
            return (&raw[..=nl], nl + 2);
        }
        i = nl + 1;
    }

    (raw, raw.len())
}

/// Parsed top-level header record of a message.
///
/// Each accessor parses its field independently, so a broken Date does not
/// prevent reading the Subject.
#[derive(Debug, Clone)]
pub struct MessageHeader {
    headers: Headers,
}

impl MessageHeader {
    /// Wraps an already parsed header collection.
    #[must_use]
    pub const fn new(headers: Headers) -> Self {
        Self { headers }
    }

    /// Parses the Date field (RFC 2822).
    ///
    /// # Errors
    ///
    /// Returns an error if the field is missing or unparsable.
    pub fn date(&self) -> Result<DateTime<FixedOffset>> {
        let raw = self
            .headers
            .get("date")
            .ok_or_else(|| Error::MissingHeader("Date".into()))?;
        parse_date(raw)
    }

    /// Decodes the Subject field. A missing subject is an empty string.
    ///
    /// # Errors
    ///
    /// Returns an error if an encoded word cannot be decoded.
    pub fn subject(&self) -> Result<String> {
        self.headers
            .get("subject")
            .map_or_else(|| Ok(String::new()), decode_rfc2047)
    }

    /// Parses an address-list field such as From, To or Cc.
    ///
    /// A missing field yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is present but cannot be parsed.
    pub fn address_list(&self, name: &str) -> Result<Vec<Address>> {
        self.headers
            .get(name)
            .map_or_else(|| Ok(Vec::new()), |v| parse_address_list(name, v))
    }

    /// Returns the Message-ID field, if any.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers.get("message-id")
    }
}

/// Parses an RFC 2822 date, tolerating trailing comments such as `(UTC)`.
///
/// # Errors
///
/// Returns an error if the date cannot be parsed.
pub fn parse_date(raw: &str) -> Result<DateTime<FixedOffset>> {
    let without_comments = raw
        .find('(')
        .map_or(raw, |idx| &raw[..idx])
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    DateTime::parse_from_rfc2822(&without_comments)
        .map_err(|e| Error::invalid_header("Date", format!("{raw:?}: {e}")))
}
