//! Lazy, single-pass decomposition of a raw message into parts.
//!
//! [`MessageReader::open`] validates the top-level entity and exposes the
//! parsed [`MessageHeader`]. Leaf parts are then produced one at a time by
//! [`MessageReader::next_part`], walking nested multiparts depth-first. The
//! cursor always moves past a part before reporting an error for it, so a
//! caller may skip the failed part and keep iterating.

use std::io::Read;
use std::ops::Range;

use crate::charset::{Charset, decode_to_utf8};
use crate::content_type::{ContentType, DispositionKind};
use crate::encoding::decode_rfc2047;
use crate::error::{Error, Result};
use crate::header::{Headers, MessageHeader, split_entity};

/// A decoded leaf part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Displayable text (plain or HTML).
    Text(TextPart),
    /// Binary attachment.
    Attachment(AttachmentPart),
}

/// Text part, transfer-decoded and converted to UTF-8 from its charset.
///
/// The body is not validated: a part that claims to be UTF-8 but is not
/// keeps its original bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPart {
    /// Content type of the part.
    pub content_type: ContentType,
    /// Decoded body.
    pub body: Vec<u8>,
}

/// Attachment part with its transfer-decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPart {
    /// Declared filename, empty if none was given.
    pub filename: String,
    /// Content type of the part.
    pub content_type: ContentType,
    /// Decoded payload.
    pub body: Vec<u8>,
}

/// Reader over a single raw message.
#[derive(Debug)]
pub struct MessageReader {
    raw: Vec<u8>,
    header: MessageHeader,
    stack: Vec<Frame>,
}

#[derive(Debug)]
enum Frame {
    /// A non-multipart entity that has not been yielded yet.
    Leaf { headers: Headers, body: Range<usize> },
    /// A multipart container being walked.
    Multipart(MultipartCursor),
}

impl MessageReader {
    /// Reads a whole message from `reader` and opens it.
    ///
    /// # Errors
    ///
    /// See [`MessageReader::from_bytes`]; I/O failures are returned as
    /// [`Error::Io`].
    pub fn open<R: Read>(mut reader: R) -> Result<Self> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        Self::from_bytes(raw)
    }

    /// Opens an in-memory message.
    ///
    /// # Errors
    ///
    /// - [`Error::Malformed`] if the message is empty, its header block
    ///   cannot be tokenized, its Content-Type is invalid, or a multipart
    ///   body has no boundary.
    /// - [`Error::UnknownTransferEncoding`] / [`Error::UnknownCharset`] if
    ///   the top-level entity uses an encoding this crate cannot decode.
    pub fn from_bytes(raw: Vec<u8>) -> Result<Self> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::Malformed("empty message".into()));
        }

        let (head, body_start) = split_entity(&raw);
        let headers = Headers::parse(&String::from_utf8_lossy(head))?;
        if headers.is_empty() {
            return Err(Error::Malformed("message has no header fields".into()));
        }
        let body_range = body_start..raw.len();

        let content_type = headers
            .content_type()
            .map_err(|e| Error::Malformed(e.to_string()))?;
        let encoding = headers.transfer_encoding()?;

        let frame = if content_type.is_multipart() {
            let boundary = content_type.boundary().ok_or_else(|| {
                Error::Malformed(format!("{content_type} body without boundary"))
            })?;
            if !encoding.is_identity() {
                return Err(Error::UnknownTransferEncoding(format!(
                    "{encoding} on a multipart body"
                )));
            }
            Frame::Multipart(MultipartCursor::new(boundary, body_range))
        } else {
            if content_type.is_text() {
                Charset::from_label(content_type.charset().unwrap_or("us-ascii"))?;
            }
            Frame::Leaf {
                headers: headers.clone(),
                body: body_range,
            }
        };

        Ok(Self {
            raw,
            header: MessageHeader::new(headers),
            stack: vec![frame],
        })
    }

    /// Returns the top-level header record.
    #[must_use]
    pub const fn header(&self) -> &MessageHeader {
        &self.header
    }

    /// Produces the next leaf part.
    ///
    /// Returns `None` once all parts have been produced. `Some(Err(_))`
    /// reports a part that could not be decoded; iteration may continue.
    pub fn next_part(&mut self) -> Option<Result<Part>> {
        loop {
            let frame = self.stack.last_mut()?;
            let range = match frame {
                Frame::Leaf { .. } => {
                    let Some(Frame::Leaf { headers, body }) = self.stack.pop() else {
                        return None;
                    };
                    return Some(build_part(&headers, &self.raw[body]));
                }
                Frame::Multipart(cursor) => match cursor.next_range(&self.raw) {
                    None => {
                        self.stack.pop();
                        continue;
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    Some(Ok(range)) => range,
                },
            };

            let (head, body_start) = split_entity(&self.raw[range.clone()]);
            let body_range = range.start + body_start..range.end;
            let headers = match Headers::parse(&String::from_utf8_lossy(head)) {
                Ok(headers) => headers,
                Err(e) => return Some(Err(e)),
            };
            let content_type = match headers.content_type() {
                Ok(ct) => ct,
                Err(e) => return Some(Err(e)),
            };

            if content_type.is_multipart() {
                match content_type.boundary() {
                    Some(boundary) => self
                        .stack
                        .push(Frame::Multipart(MultipartCursor::new(boundary, body_range))),
                    None => {
                        return Some(Err(Error::InvalidMultipart(format!(
                            "nested {content_type} without boundary"
                        ))));
                    }
                }
                continue;
            }

            return Some(build_part(&headers, &self.raw[body_range]));
        }
    }
}

impl Iterator for MessageReader {
    type Item = Result<Part>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_part()
    }
}

/// Decodes one leaf entity and classifies it as text or attachment.
///
/// Parts with `Content-Disposition: attachment`, and any part that is not
/// `text/*`, are attachments.
fn build_part(headers: &Headers, body: &[u8]) -> Result<Part> {
    let content_type = headers.content_type()?;
    let disposition = headers.disposition();
    let encoding = headers.transfer_encoding()?;

    let is_attachment = disposition
        .as_ref()
        .is_some_and(|d| d.kind == DispositionKind::Attachment)
        || !content_type.is_text();

    let decoded = encoding.decode(body)?;

    if is_attachment {
        let raw_name = disposition
            .as_ref()
            .and_then(|d| d.filename())
            .or_else(|| content_type.name())
            .unwrap_or_default();
        let filename = decode_rfc2047(raw_name).unwrap_or_else(|_| raw_name.to_string());
        return Ok(Part::Attachment(AttachmentPart {
            filename,
            content_type,
            body: decoded,
        }));
    }

    let charset = content_type.charset().unwrap_or("us-ascii");
    let body = decode_to_utf8(charset, decoded)?;
    Ok(Part::Text(TextPart {
        content_type,
        body,
    }))
}

/// Walks the body parts of one multipart container.
#[derive(Debug)]
struct MultipartCursor {
    boundary: Vec<u8>,
    pos: usize,
    end: usize,
    started: bool,
    closed: bool,
}

/// A delimiter line found in a multipart body.
#[derive(Debug, PartialEq, Eq)]
struct Delimiter {
    /// End of the preceding part (the line break before the delimiter
    /// belongs to the delimiter).
    content_end: usize,
    /// Start of the line after the delimiter.
    next: usize,
    /// True for the closing `--boundary--` delimiter.
    close: bool,
}

impl MultipartCursor {
    fn new(boundary: &str, body: Range<usize>) -> Self {
        let mut marker = b"--".to_vec();
        marker.extend_from_slice(boundary.as_bytes());
        Self {
            boundary: marker,
            pos: body.start,
            end: body.end,
            started: false,
            closed: false,
        }
    }

    /// Returns the byte range of the next body part, or `None` after the
    /// closing delimiter. A missing closing delimiter ends the container at
    /// the end of the body.
    fn next_range(&mut self, raw: &[u8]) -> Option<Result<Range<usize>>> {
        if self.closed {
            return None;
        }

        if !self.started {
            self.started = true;
            let Some(open) = self.find_delimiter(raw) else {
                self.closed = true;
                return Some(Err(Error::InvalidMultipart(
                    "no opening delimiter found".into(),
                )));
            };
            self.pos = open.next;
            if open.close {
                self.closed = true;
                return None;
            }
        }

        match self.find_delimiter(raw) {
            Some(delimiter) => {
                let range = self.pos..delimiter.content_end;
                self.pos = delimiter.next;
                self.closed = delimiter.close;
                Some(Ok(range))
            }
            None => {
                self.closed = true;
                Some(Ok(self.pos..self.end))
            }
        }
    }

    /// Finds the next delimiter line at or after `self.pos`, which is always
    /// at the start of a line.
    fn find_delimiter(&self, raw: &[u8]) -> Option<Delimiter> {
        let mut line_start = self.pos;

        while line_start < self.end {
            let line_end = raw[line_start..self.end]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(self.end, |i| line_start + i);
            let line = &raw[line_start..line_end];

            if let Some(rest) = line.strip_prefix(self.boundary.as_slice()) {
                let (close, rest) = match rest.strip_prefix(b"--") {
                    Some(rest) => (true, rest),
                    None => (false, rest),
                };
                if rest.iter().all(u8::is_ascii_whitespace) {
                    let mut content_end = line_start;
                    if content_end > self.pos && raw[content_end - 1] == b'\n' {
                        content_end -= 1;
                        if content_end > self.pos && raw[content_end - 1] == b'\r' {
                            content_end -= 1;
                        }
                    }
                    return Some(Delimiter {
                        content_end,
                        next: (line_end + 1).min(self.end),
                        close,
                    });
                }
            }

            line_start = line_end + 1;
        }

        None
    }
}
