//! Character set conversion to UTF-8.
//!
//! Only the charsets that can be converted without lookup tables larger than
//! a single code page are supported. Anything else is reported as
//! [`Error::UnknownCharset`] so callers can decide whether to skip the data.

use crate::error::{Error, Result};

/// Character sets this crate can convert to UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// UTF-8, passed through unchanged.
    Utf8,
    /// US-ASCII, passed through unchanged.
    Ascii,
    /// ISO-8859-1 (Latin-1), every byte maps to the same code point.
    Latin1,
    /// Windows-1252, Latin-1 with printable characters in 0x80..=0x9F.
    Windows1252,
}

/// Code points for Windows-1252 bytes 0x80..=0x9F. Undefined slots map to
/// the C1 control with the same value, as browsers do.
const WINDOWS_1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

impl Charset {
    /// Looks up a charset by its MIME label (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCharset`] for labels that are not supported.
    pub fn from_label(label: &str) -> Result<Self> {
        let normalized = label.trim().trim_matches('"').to_ascii_lowercase();
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "us-ascii" | "ascii" | "ansi_x3.4-1968" | "iso646-us" => Ok(Self::Ascii),
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "l1" | "cp819" => {
                Ok(Self::Latin1)
            }
            "windows-1252" | "cp1252" | "x-cp1252" => Ok(Self::Windows1252),
            _ => Err(Error::UnknownCharset(label.to_string())),
        }
    }

    /// Converts bytes in this charset to UTF-8 bytes.
    ///
    /// UTF-8 and ASCII input is returned untouched, even if it is not
    /// actually valid; validation is the caller's job.
    #[must_use]
    pub fn to_utf8(self, bytes: Vec<u8>) -> Vec<u8> {
        match self {
            Self::Utf8 | Self::Ascii => bytes,
            Self::Latin1 => bytes
                .iter()
                .map(|&b| char::from(b))
                .collect::<String>()
                .into_bytes(),
            Self::Windows1252 => bytes
                .iter()
                .map(|&b| match b {
                    0x80..=0x9F => WINDOWS_1252_HIGH[usize::from(b - 0x80)],
                    _ => char::from(b),
                })
                .collect::<String>()
                .into_bytes(),
        }
    }
}

/// Converts `bytes` declared as `label` to UTF-8.
///
/// # Errors
///
/// Returns [`Error::UnknownCharset`] if the label is not supported.
pub fn decode_to_utf8(label: &str, bytes: Vec<u8>) -> Result<Vec<u8>> {
    Ok(Charset::from_label(label)?.to_utf8(bytes))
}
