//! IMAP response parser.
//!
//! Sans-I/O: [`ResponseParser::parse`] takes one complete response as
//! produced by the framed reader and builds a structured [`Response`].
//! Only the responses an ingestion client reads are modelled in detail;
//! everything else is kept as [`UntaggedResponse::Other`].
//!
//! ```
//! use mailvault_imap::parser::{Response, ResponseParser, UntaggedResponse};
//!
//! let response = ResponseParser::parse(b"* 23 EXISTS\r\n").unwrap();
//! assert!(matches!(response, Response::Untagged(UntaggedResponse::Exists(23))));
//! ```

pub mod lexer;

use lexer::Lexer;

use crate::types::{ListEntry, ResponseCode, Status};
use crate::{Error, Result};

/// A parsed server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Completion of a command.
    Tagged {
        /// Tag of the completed command.
        tag: String,
        /// Completion status.
        status: Status,
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged data or status.
    Untagged(UntaggedResponse),
    /// Command continuation request (`+ ...`).
    Continuation(String),
}

/// Untagged server data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// `* OK|NO|BAD|PREAUTH|BYE [code] text`.
    Status {
        /// Status keyword.
        status: Status,
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* CAPABILITY ...`.
    Capability(Vec<String>),
    /// `* n EXISTS`.
    Exists(u32),
    /// `* n RECENT`.
    Recent(u32),
    /// `* n EXPUNGE`.
    Expunge(u32),
    /// `* FLAGS (...)`.
    Flags(Vec<String>),
    /// `* LIST (...) "/" name`.
    List(ListEntry),
    /// `* n FETCH (...)`.
    Fetch {
        /// Message sequence number.
        seq: u32,
        /// Returned data items.
        items: Vec<FetchItem>,
    },
    /// Anything not modelled above, as text.
    Other(String),
}

/// A FETCH data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// `UID n`.
    Uid(u32),
    /// `FLAGS (...)`.
    Flags(Vec<String>),
    /// `RFC822.SIZE n`.
    Rfc822Size(u32),
    /// `BODY[section] data` or `RFC822 data`; `data` is `None` for NIL.
    Body {
        /// Section specifier, empty for the whole message.
        section: String,
        /// Section content.
        data: Option<Vec<u8>>,
    },
    /// Any other item, skipped; only its name is kept.
    Other(String),
}

/// IMAP response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the response does not follow the grammar.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.peek() {
            Some(b'+') => {
                lexer.advance();
                lexer.skip_spaces();
                Ok(Response::Continuation(lexer.rest_of_line()))
            }
            Some(b'*') => {
                lexer.advance();
                lexer.expect(b' ')?;
                parse_untagged(&mut lexer).map(Response::Untagged)
            }
            Some(_) => {
                let tag = lexer.atom()?.to_string();
                lexer.expect(b' ')?;
                let start = lexer.position();
                let keyword = lexer.atom()?;
                let status = Status::from_keyword(keyword)
                    .ok_or_else(|| Error::parse(start, format!("unknown status {keyword:?}")))?;
                let (code, text) = parse_resp_text(&mut lexer)?;
                Ok(Response::Tagged {
                    tag,
                    status,
                    code,
                    text,
                })
            }
            None => Err(Error::parse(0, "empty response")),
        }
    }
}

fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<UntaggedResponse> {
    if lexer.peek().is_some_and(|b| b.is_ascii_digit()) {
        let n = lexer.number()?;
        lexer.expect(b' ')?;
        let keyword = lexer.atom()?.to_ascii_uppercase();
        return match keyword.as_str() {
            "EXISTS" => Ok(UntaggedResponse::Exists(n)),
            "RECENT" => Ok(UntaggedResponse::Recent(n)),
            "EXPUNGE" => Ok(UntaggedResponse::Expunge(n)),
            "FETCH" => {
                lexer.expect(b' ')?;
                let items = parse_fetch_items(lexer)?;
                Ok(UntaggedResponse::Fetch { seq: n, items })
            }
            _ => Ok(UntaggedResponse::Other(format!(
                "{n} {keyword}{}",
                lexer.rest_of_line()
            ))),
        };
    }

    let keyword = lexer.atom()?.to_ascii_uppercase();
    if let Some(status) = Status::from_keyword(&keyword) {
        let (code, text) = parse_resp_text(lexer)?;
        return Ok(UntaggedResponse::Status { status, code, text });
    }

    match keyword.as_str() {
        "CAPABILITY" => Ok(UntaggedResponse::Capability(
            lexer
                .rest_of_line()
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        )),
        "FLAGS" => {
            lexer.expect(b' ')?;
            lexer.atom_list().map(UntaggedResponse::Flags)
        }
        "LIST" | "LSUB" => {
            lexer.expect(b' ')?;
            parse_list(lexer).map(UntaggedResponse::List)
        }
        _ => Ok(UntaggedResponse::Other(format!(
            "{keyword}{}",
            lexer.rest_of_line()
        ))),
    }
}

/// Parses `[SP] ["[" code "]" SP] text`.
fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
    lexer.skip_spaces();
    let code = if lexer.peek() == Some(b'[') {
        lexer.advance();
        let inner = lexer.take_while(|b| b != b']' && b != b'\r' && b != b'\n');
        lexer.expect(b']')?;
        lexer.skip_spaces();
        Some(parse_code(&String::from_utf8_lossy(inner)))
    } else {
        None
    };
    Ok((code, lexer.rest_of_line()))
}

fn parse_code(inner: &str) -> ResponseCode {
    let mut words = inner.split_whitespace();
    let name = words.next().unwrap_or_default().to_ascii_uppercase();
    let number = |arg: Option<&str>| arg.and_then(|a| a.parse::<u32>().ok());

    match name.as_str() {
        "UIDVALIDITY" => number(words.next())
            .map_or_else(|| ResponseCode::Other(inner.to_string()), ResponseCode::UidValidity),
        "UIDNEXT" => number(words.next())
            .map_or_else(|| ResponseCode::Other(inner.to_string()), ResponseCode::UidNext),
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "CAPABILITY" => ResponseCode::Capability(words.map(str::to_string).collect()),
        _ => ResponseCode::Other(inner.to_string()),
    }
}

/// Parses `(attrs) delimiter mailbox`.
fn parse_list(lexer: &mut Lexer<'_>) -> Result<ListEntry> {
    let attributes = lexer.atom_list()?;
    lexer.expect(b' ')?;
    let delimiter = lexer
        .nstring()?
        .and_then(|d| String::from_utf8_lossy(&d).chars().next());
    lexer.expect(b' ')?;
    let name = String::from_utf8_lossy(&lexer.astring()?).into_owned();
    Ok(ListEntry {
        attributes,
        delimiter,
        name,
    })
}

/// Parses a parenthesized FETCH item list.
fn parse_fetch_items(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(b'(')?;
    let mut items = Vec::new();

    loop {
        lexer.skip_spaces();
        if lexer.peek() == Some(b')') {
            lexer.advance();
            return Ok(items);
        }

        let name = lexer.atom()?.to_ascii_uppercase();
        let item = match name.as_str() {
            "UID" => {
                lexer.expect(b' ')?;
                FetchItem::Uid(lexer.number()?)
            }
            "RFC822.SIZE" => {
                lexer.expect(b' ')?;
                FetchItem::Rfc822Size(lexer.number()?)
            }
            "FLAGS" => {
                lexer.expect(b' ')?;
                FetchItem::Flags(lexer.atom_list()?)
            }
            "RFC822" => {
                lexer.expect(b' ')?;
                FetchItem::Body {
                    section: String::new(),
                    data: lexer.nstring()?,
                }
            }
            "BODY" | "BINARY" if lexer.peek() == Some(b'[') => {
                let section = parse_section(lexer)?;
                lexer.expect(b' ')?;
                FetchItem::Body {
                    section,
                    data: lexer.nstring()?,
                }
            }
            _ => {
                lexer.expect(b' ')?;
                lexer.skip_value()?;
                FetchItem::Other(name)
            }
        };
        items.push(item);
    }
}

/// Parses `[section]<origin>` and returns the section text.
fn parse_section(lexer: &mut Lexer<'_>) -> Result<String> {
    lexer.expect(b'[')?;
    let section = lexer.take_while(|b| b != b']' && b != b'\r' && b != b'\n');
    lexer.expect(b']')?;
    if lexer.peek() == Some(b'<') {
        lexer.advance();
        lexer.number()?;
        lexer.expect(b'>')?;
    }
    Ok(String::from_utf8_lossy(section).into_owned())
}
