//! Address-list parsing for From/To/Cc style headers.

use std::fmt;

use crate::encoding::decode_rfc2047;
use crate::error::{Error, Result};

/// A single mailbox address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Display name, if any.
    pub name: Option<String>,
    /// The `local@domain` part.
    pub email: String,
}

impl Address {
    /// Creates an address without display name.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Display for Address {
    /// Formats as `"Name" <local@domain>` or `<local@domain>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{escaped}\" <{}>", self.email)
            }
            None => write!(f, "<{}>", self.email),
        }
    }
}

/// Parses an address list header value.
///
/// Handles display names (plain, quoted or RFC 2047 encoded), angle
/// addresses, bare addresses, comments and group syntax
/// (`Team: a@x.org, b@x.org;`). Empty groups yield no addresses.
///
/// # Errors
///
/// Returns an error naming `field` if any entry is not a valid address.
pub fn parse_address_list(field: &str, value: &str) -> Result<Vec<Address>> {
    split_entries(value)
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .map(|entry| parse_entry(field, &entry))
        .collect()
}

/// Splits on top-level commas, dropping group names and terminators.
fn split_entries(value: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut comment_depth = 0usize;
    let mut escaped = false;

    for c in value.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => {
                current.push(c);
                escaped = true;
            }
            '"' if comment_depth == 0 => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '(' if !in_quotes => comment_depth += 1,
            ')' if !in_quotes && comment_depth > 0 => comment_depth -= 1,
            _ if comment_depth > 0 => {}
            '<' if !in_quotes => {
                in_angle = true;
                current.push(c);
            }
            '>' if !in_quotes => {
                in_angle = false;
                current.push(c);
            }
            ',' | ';' if !in_quotes && !in_angle => {
                entries.push(std::mem::take(&mut current));
            }
            ':' if !in_quotes && !in_angle => current.clear(),
            _ => current.push(c),
        }
    }
    entries.push(current);
    entries
}

fn parse_entry(field: &str, entry: &str) -> Result<Address> {
    let Some(open) = entry.find('<') else {
        return validate(field, entry.trim()).map(Address::new);
    };

    let close = entry[open..]
        .find('>')
        .map(|i| open + i)
        .ok_or_else(|| Error::invalid_header(field, format!("unterminated address in {entry:?}")))?;

    let email = validate(field, entry[open + 1..close].trim())?;
    let raw_name = entry[..open].trim();
    let address = Address::new(email);
    if raw_name.is_empty() {
        return Ok(address);
    }

    let unquoted = unquote(raw_name);
    let name = decode_rfc2047(&unquoted).unwrap_or(unquoted);
    Ok(address.with_name(name))
}

fn validate<'a>(field: &str, email: &'a str) -> Result<&'a str> {
    match email.rsplit_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace) =>
        {
            Ok(email)
        }
        _ => Err(Error::invalid_header(
            field,
            format!("not an address: {email:?}"),
        )),
    }
}

fn unquote(name: &str) -> String {
    let Some(inner) = name.strip_prefix('"').and_then(|n| n.strip_suffix('"')) else {
        return name.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_address() {
        let list = parse_address_list("From", "alice@example.com").unwrap();
        assert_eq!(list, vec![Address::new("alice@example.com")]);
    }

    #[test]
    fn test_display_name_forms() {
        let list = parse_address_list(
            "To",
            "Alice Smith <alice@example.com>, \"Smith, Bob\" <bob@example.com>",
        )
        .unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name.as_deref(), Some("Alice Smith"));
        assert_eq!(list[1].name.as_deref(), Some("Smith, Bob"));
        assert_eq!(list[1].email, "bob@example.com");
    }

    #[test]
    fn test_encoded_display_name() {
        let list = parse_address_list("From", "=?utf-8?Q?Ren=C3=A9?= <rene@example.com>").unwrap();
        assert_eq!(list[0].name.as_deref(), Some("René"));
    }

    #[test]
    fn test_comments_are_ignored() {
        let list = parse_address_list("From", "carol@example.com (Carol, at work)").unwrap();
        assert_eq!(list, vec![Address::new("carol@example.com")]);
    }

    #[test]
    fn test_group_syntax() {
        let list = parse_address_list("To", "Team: a@x.org, b@x.org;, c@y.org").unwrap();
        let emails: Vec<_> = list.iter().map(|a| a.email.as_str()).collect();
        assert_eq!(emails, vec!["a@x.org", "b@x.org", "c@y.org"]);

        assert!(parse_address_list("To", "undisclosed-recipients:;").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_entries() {
        assert!(parse_address_list("From", "not an address").is_err());
        assert!(parse_address_list("From", "Broken <a@b.c").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Address::new("a@b.c").to_string(), "<a@b.c>");
        assert_eq!(
            Address::new("a@b.c").with_name("A \"B\"").to_string(),
            "\"A \\\"B\\\"\" <a@b.c>"
        );
    }
}
