//! Transfer and header decoding.
//!
//! Supports Base64, Quoted-Printable, RFC 2047 encoded words and RFC 2231
//! extended parameter values.

use std::fmt;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::charset::decode_to_utf8;
use crate::error::{Error, Result};

/// Base64 engine that accepts bodies with or without trailing padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Content-Transfer-Encoding of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    #[default]
    SevenBit,
    /// 8-bit data in lines.
    EightBit,
    /// Arbitrary binary data.
    Binary,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl TransferEncoding {
    /// Parses a Content-Transfer-Encoding value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTransferEncoding`] for mechanisms other than
    /// the five defined by RFC 2045.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "7bit" => Ok(Self::SevenBit),
            "8bit" => Ok(Self::EightBit),
            "binary" => Ok(Self::Binary),
            "base64" => Ok(Self::Base64),
            "quoted-printable" => Ok(Self::QuotedPrintable),
            _ => Err(Error::UnknownTransferEncoding(s.trim().to_string())),
        }
    }

    /// Returns true if this encoding is an identity encoding.
    ///
    /// Multipart containers may only use identity encodings.
    #[must_use]
    pub const fn is_identity(self) -> bool {
        matches!(self, Self::SevenBit | Self::EightBit | Self::Binary)
    }

    /// Decodes a body encoded with this transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid for the encoding.
    pub fn decode(self, body: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Base64 => decode_base64(body),
            Self::QuotedPrintable => decode_quoted_printable(body),
            Self::SevenBit | Self::EightBit | Self::Binary => Ok(body.to_vec()),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Binary => write!(f, "binary"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// Decodes Base64 data, ignoring line breaks and other whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    LENIENT_BASE64.decode(cleaned).map_err(Into::into)
}

/// Decodes Quoted-Printable data (RFC 2045).
///
/// Soft line breaks are removed and trailing whitespace before a hard line
/// break is dropped as transport padding.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len());
    for raw_line in data.split_inclusive(|&b| b == b'\n') {
        let (line, newline): (&[u8], &[u8]) = if let Some(l) = raw_line.strip_suffix(b"\r\n") {
            (l, b"\r\n")
        } else if let Some(l) = raw_line.strip_suffix(b"\n") {
            (l, b"\n")
        } else {
            (raw_line, b"")
        };
        let line = line.trim_ascii_end();

        let (line, soft_break) = match line.strip_suffix(b"=") {
            Some(l) => (l, true),
            None => (line, false),
        };

        let mut i = 0;
        while i < line.len() {
            if line[i] == b'=' {
                let hex = line
                    .get(i + 1..i + 3)
                    .ok_or_else(|| Error::InvalidEncoding("incomplete escape sequence".into()))?;
                let byte = std::str::from_utf8(hex)
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| {
                        Error::InvalidEncoding(format!(
                            "invalid hex escape: ={}",
                            String::from_utf8_lossy(hex)
                        ))
                    })?;
                result.push(byte);
                i += 3;
            } else {
                result.push(line[i]);
                i += 1;
            }
        }

        if !soft_break {
            result.extend_from_slice(newline);
        }
    }

    Ok(result)
}

/// Decodes every RFC 2047 encoded word in a header value.
///
/// Format: `=?charset?encoding?encoded-text?=`. Linear whitespace between two
/// adjacent encoded words is removed; text that only looks like an encoded
/// word is kept verbatim.
///
/// # Errors
///
/// Returns an error if an encoded word names an unknown charset or its
/// payload cannot be decoded.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut pending_space = String::new();
    let mut last_was_word = false;

    while !rest.is_empty() {
        if let Some((decoded, consumed)) = decode_encoded_word(rest)? {
            if !last_was_word {
                out.push_str(&pending_space);
            }
            pending_space.clear();
            out.push_str(&decoded);
            rest = &rest[consumed..];
            last_was_word = true;
            continue;
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        if ch == ' ' || ch == '\t' || ch == '\r' || ch == '\n' {
            pending_space.push(ch);
        } else {
            out.push_str(&pending_space);
            pending_space.clear();
            out.push(ch);
            last_was_word = false;
        }
        rest = &rest[ch.len_utf8()..];
    }
    out.push_str(&pending_space);

    Ok(out)
}

/// Tries to decode one encoded word at the start of `input`.
///
/// Returns the decoded text and the number of bytes consumed.
fn decode_encoded_word(input: &str) -> Result<Option<(String, usize)>> {
    let Some(inner) = input.strip_prefix("=?") else {
        return Ok(None);
    };

    let mut fields = inner.splitn(3, '?');
    let (Some(charset), Some(encoding), Some(tail)) = (fields.next(), fields.next(), fields.next())
    else {
        return Ok(None);
    };
    let Some(end) = tail.find("?=") else {
        return Ok(None);
    };
    let payload = &tail[..end];
    if charset.is_empty() || payload.contains(' ') {
        return Ok(None);
    }

    let consumed = 2 + charset.len() + 1 + encoding.len() + 1 + end + 2;

    let raw = match encoding {
        "B" | "b" => decode_base64(payload.as_bytes())?,
        "Q" | "q" => decode_q(payload)?,
        _ => return Ok(None),
    };

    // RFC 2231 allows a language suffix: charset*lang
    let label = charset.split('*').next().unwrap_or(charset);
    let utf8 = decode_to_utf8(label, raw)?;
    Ok(Some((String::from_utf8_lossy(&utf8).into_owned(), consumed)))
}

/// Decodes the "Q" variant of quoted-printable used inside encoded words.
fn decode_q(payload: &str) -> Result<Vec<u8>> {
    let raw = payload.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        match raw[i] {
            b'_' => {
                out.push(b' ');
                i += 1;
            }
            b'=' => {
                let byte = raw
                    .get(i + 1..i + 3)
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| Error::InvalidEncoding("invalid Q escape".into()))?;
                out.push(byte);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    Ok(out)
}

/// Decodes an RFC 2231 extended parameter value (`charset'lang'%XX...`).
///
/// # Errors
///
/// Returns an error if the charset is unknown.
pub fn decode_rfc2231(value: &str) -> Result<String> {
    let mut fields = value.splitn(3, '\'');
    let (charset, encoded) = match (fields.next(), fields.next(), fields.next()) {
        (Some(charset), Some(_lang), Some(encoded)) => (charset, encoded),
        _ => ("us-ascii", value),
    };

    let mut bytes = Vec::with_capacity(encoded.len());
    let raw = encoded.as_bytes();
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%'
            && let Some(byte) = raw
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
        {
            bytes.push(byte);
            i += 3;
            continue;
        }
        bytes.push(raw[i]);
        i += 1;
    }

    let charset = if charset.is_empty() { "us-ascii" } else { charset };
    let utf8 = decode_to_utf8(charset, bytes)?;
    Ok(String::from_utf8_lossy(&utf8).into_owned())
}
