//! Content-Type and Content-Disposition handling.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::encoding::decode_rfc2231;
use crate::error::{Error, Result};

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx), keys lowercased.
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: HashMap::new(),
        }
    }

    /// The RFC 2045 default: `text/plain; charset=us-ascii`.
    #[must_use]
    pub fn text_plain() -> Self {
        let mut ct = Self::new("text", "plain");
        ct.parameters
            .insert("charset".to_string(), "us-ascii".to_string());
        ct
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters
            .get("boundary")
            .map(String::as_str)
            .filter(|b| !b.is_empty())
    }

    /// Returns the `name` parameter if present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.parameters.get("name").map(String::as_str)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("text")
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let (type_str, params) = split_value(s);

        let (main_type, sub_type) = type_str
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("missing subtype in {s:?}")))?;
        let main_type = main_type.trim().to_ascii_lowercase();
        let sub_type = sub_type.trim().to_ascii_lowercase();
        if main_type.is_empty() || sub_type.is_empty() || sub_type.contains(char::is_whitespace)
        {
            return Err(Error::InvalidContentType(s.to_string()));
        }

        Ok(Self {
            main_type,
            sub_type,
            parameters: parse_parameters(params),
        })
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)
    }
}

/// Disposition type of a body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispositionKind {
    /// Displayed inline with the message.
    Inline,
    /// Kept apart from the message body.
    Attachment,
    /// Any other token; treated like an absent header.
    Other,
}

/// Parsed Content-Disposition header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type.
    pub kind: DispositionKind,
    /// Parameters, keys lowercased.
    pub parameters: HashMap<String, String>,
}

impl ContentDisposition {
    /// Parses a Content-Disposition value. Never fails: unknown disposition
    /// types map to [`DispositionKind::Other`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let (kind, params) = split_value(s);
        let kind = match kind.trim().to_ascii_lowercase().as_str() {
            "inline" => DispositionKind::Inline,
            "attachment" => DispositionKind::Attachment,
            _ => DispositionKind::Other,
        };
        Self {
            kind,
            parameters: parse_parameters(params),
        }
    }

    /// Returns the `filename` parameter if present.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.parameters.get("filename").map(String::as_str)
    }
}

/// Splits `value; params` into the leading token and the parameter tail.
fn split_value(s: &str) -> (&str, &str) {
    s.split_once(';').unwrap_or((s, ""))
}

/// Parses a `; key=value; key="quoted; value"` list.
///
/// RFC 2231 extended (`key*=`) and continued (`key*0=`, `key*1*=`) parameters
/// are reassembled and decoded.
fn parse_parameters(s: &str) -> HashMap<String, String> {
    let mut plain = HashMap::new();
    let mut sections: HashMap<String, BTreeMap<u32, (String, bool)>> = HashMap::new();

    for (key, value) in tokenize_parameters(s) {
        let key = key.to_ascii_lowercase();
        let (base, extended) = match key.strip_suffix('*') {
            Some(base) => (base, true),
            None => (key.as_str(), false),
        };

        if let Some((name, index)) = base.split_once('*')
            && let Ok(index) = index.parse::<u32>()
        {
            sections
                .entry(name.to_string())
                .or_default()
                .insert(index, (value, extended));
        } else if extended {
            let decoded = decode_rfc2231(&value).unwrap_or(value);
            plain.insert(base.to_string(), decoded);
        } else {
            plain.entry(base.to_string()).or_insert(value);
        }
    }

    for (name, parts) in sections {
        let any_extended = parts.values().any(|(_, ext)| *ext);
        let joined: String = parts.into_values().map(|(v, _)| v).collect();
        let value = if any_extended {
            decode_rfc2231(&joined).unwrap_or(joined)
        } else {
            joined
        };
        plain.insert(name, value);
    }

    plain
}

/// Splits a parameter list into raw key/value pairs, honouring quotes.
fn tokenize_parameters(s: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = s.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ';') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ';' {
                break;
            }
            key.push(c);
            chars.next();
        }
        if chars.next() != Some('=') {
            continue;
        }
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => value.push(c),
                }
            }
            while chars.peek().is_some_and(|c| *c != ';') {
                chars.next();
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ';' {
                    break;
                }
                value.push(c);
                chars.next();
            }
            value = value.trim().to_string();
        }

        let key = key.trim();
        if !key.is_empty() {
            params.push((key.to_string(), value));
        }
    }

    params
}
