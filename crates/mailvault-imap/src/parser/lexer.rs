//! Byte-level cursor over a single framed IMAP response.
//!
//! The framed reader hands over a complete response with every literal
//! inlined (`{n}\r\n` followed by `n` raw bytes), so the lexer never waits
//! for more input.

#![allow(clippy::missing_errors_doc)]

use crate::{Error, Result};

/// IMAP response lexer.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the current position in the input.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Peeks at the current byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Advances by one byte and returns it.
    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Returns true at end of input or at the terminating CRLF.
    #[must_use]
    pub fn at_line_end(&self) -> bool {
        matches!(self.peek(), None | Some(b'\r' | b'\n'))
    }

    /// Consumes `expected` or fails.
    pub fn expect(&mut self, expected: u8) -> Result<()> {
        match self.peek() {
            Some(b) if b == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(self.error(format!(
                "expected {:?}, found {:?}",
                char::from(expected),
                char::from(b)
            ))),
            None => Err(self.error(format!(
                "expected {:?}, found end of input",
                char::from(expected)
            ))),
        }
    }

    /// Skips any run of spaces.
    pub fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    /// Reads bytes while `pred` holds.
    pub fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a [u8] {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    /// Reads an atom (stops at `[` so `BODY[...]` splits correctly).
    pub fn atom(&mut self) -> Result<&'a str> {
        let bytes = self.take_while(|b| is_astring_char(b) && b != b'[' && b != b']');
        self.non_empty(bytes, "atom")
    }

    /// Reads a number.
    pub fn number(&mut self) -> Result<u32> {
        let start = self.pos;
        let digits = self.take_while(|b| b.is_ascii_digit());
        std::str::from_utf8(digits)
            .ok()
            .and_then(|d| d.parse().ok())
            .ok_or_else(|| Error::parse(start, "expected number"))
    }

    /// Reads an astring: atom (brackets allowed), quoted string or literal.
    pub fn astring(&mut self) -> Result<Vec<u8>> {
        match self.peek() {
            Some(b'"') => self.quoted(),
            Some(b'{') => self.literal().map(<[u8]>::to_vec),
            _ => {
                let bytes = self.take_while(is_astring_char);
                self.non_empty(bytes, "astring").map(|s| s.as_bytes().to_vec())
            }
        }
    }

    /// Reads an nstring: `NIL`, quoted string or literal.
    pub fn nstring(&mut self) -> Result<Option<Vec<u8>>> {
        match self.peek() {
            Some(b'"') => self.quoted().map(Some),
            Some(b'{') => self.literal().map(|l| Some(l.to_vec())),
            _ => {
                let atom = self.atom()?;
                if atom.eq_ignore_ascii_case("NIL") {
                    Ok(None)
                } else {
                    Err(self.error(format!("expected string or NIL, found {atom:?}")))
                }
            }
        }
    }

    /// Reads a parenthesized list of atoms, e.g. `(\Seen \Answered)`.
    pub fn atom_list(&mut self) -> Result<Vec<String>> {
        self.expect(b'(')?;
        let mut atoms = Vec::new();
        loop {
            self.skip_spaces();
            if self.peek() == Some(b')') {
                self.pos += 1;
                return Ok(atoms);
            }
            atoms.push(self.atom()?.to_string());
        }
    }

    /// Reads everything up to the line terminator.
    pub fn rest_of_line(&mut self) -> String {
        let bytes = self.take_while(|b| b != b'\r' && b != b'\n');
        String::from_utf8_lossy(bytes).into_owned()
    }

    /// Skips one value of any shape: atom, string, literal or nested list.
    pub fn skip_value(&mut self) -> Result<()> {
        match self.peek() {
            Some(b'"') => self.quoted().map(drop),
            Some(b'{') => self.literal().map(drop),
            Some(b'(') => {
                self.pos += 1;
                loop {
                    self.skip_spaces();
                    match self.peek() {
                        Some(b')') => {
                            self.pos += 1;
                            return Ok(());
                        }
                        None => return Err(self.error("unterminated list")),
                        _ => self.skip_value()?,
                    }
                }
            }
            _ => {
                let bytes = self.take_while(|b| is_astring_char(b) || b == b'[' || b == b']');
                self.non_empty(bytes, "value").map(drop)
            }
        }
    }

    fn quoted(&mut self) -> Result<Vec<u8>> {
        self.expect(b'"')?;
        let mut out = Vec::new();
        loop {
            match self.advance() {
                Some(b'"') => return Ok(out),
                Some(b'\\') => match self.advance() {
                    Some(b) => out.push(b),
                    None => return Err(self.error("unterminated quoted string")),
                },
                Some(b'\r' | b'\n') | None => {
                    return Err(self.error("unterminated quoted string"));
                }
                Some(b) => out.push(b),
            }
        }
    }

    fn literal(&mut self) -> Result<&'a [u8]> {
        self.expect(b'{')?;
        let len = self.number()? as usize;
        if self.peek() == Some(b'+') {
            self.pos += 1;
        }
        self.expect(b'}')?;
        self.expect(b'\r')?;
        self.expect(b'\n')?;

        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.error(format!("literal of {len} bytes exceeds response")))?;
        let data = &self.input[self.pos..end];
        self.pos = end;
        Ok(data)
    }

    fn non_empty(&self, bytes: &'a [u8], what: &str) -> Result<&'a str> {
        if bytes.is_empty() {
            return Err(self.error(format!("expected {what}")));
        }
        std::str::from_utf8(bytes).map_err(|_| self.error(format!("{what} is not valid UTF-8")))
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(self.pos, message)
    }
}

/// ASTRING-CHAR: any CHAR except atom-specials, with `]` allowed.
const fn is_astring_char(b: u8) -> bool {
    !matches!(b, b'(' | b')' | b'{' | b' ' | b'"' | b'%' | b'*') && b > 0x1F && b != 0x7F
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_stops_at_bracket() {
        let mut lexer = Lexer::new(b"BODY[] {3}");
        assert_eq!(lexer.atom().unwrap(), "BODY");
        assert_eq!(lexer.peek(), Some(b'['));
    }

    #[test]
    fn test_quoted_with_escapes() {
        let mut lexer = Lexer::new(br#""a \"b\" \\c" rest"#);
        assert_eq!(lexer.astring().unwrap(), b"a \"b\" \\c");
    }

    #[test]
    fn test_literal() {
        let mut lexer = Lexer::new(b"{5}\r\nhello)");
        assert_eq!(lexer.nstring().unwrap().unwrap(), b"hello");
        assert_eq!(lexer.peek(), Some(b')'));
    }

    #[test]
    fn test_literal_too_long() {
        let mut lexer = Lexer::new(b"{50}\r\nshort");
        assert!(lexer.nstring().is_err());
    }

    #[test]
    fn test_nil() {
        let mut lexer = Lexer::new(b"NIL");
        assert_eq!(lexer.nstring().unwrap(), None);
    }

    #[test]
    fn test_skip_nested_value() {
        let mut lexer = Lexer::new(b"(\"a\" (NIL {2}\r\n()) x[1]) tail");
        lexer.skip_value().unwrap();
        lexer.skip_spaces();
        assert_eq!(lexer.atom().unwrap(), "tail");
    }

    #[test]
    fn test_atom_list() {
        let mut lexer = Lexer::new(b"(\\Seen \\Flagged)");
        assert_eq!(lexer.atom_list().unwrap(), vec!["\\Seen", "\\Flagged"]);
    }
}
