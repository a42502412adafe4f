//! # mailvault-mime
//!
//! Lazy MIME decomposition for mail ingestion.
//!
//! ## Features
//!
//! - **Header record**: Date, Subject and address lists parsed on demand,
//!   each field independently
//! - **Part walk**: nested multiparts visited depth-first, one leaf at a time
//! - **Decoding**: Base64, Quoted-Printable, RFC 2047 words, RFC 2231
//!   parameters, and a small set of legacy charsets converted to UTF-8
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailvault_mime::{MessageReader, Part};
//!
//! let mut reader = MessageReader::from_bytes(raw)?;
//! println!("Subject: {}", reader.header().subject()?);
//!
//! while let Some(part) = reader.next_part() {
//!     match part? {
//!         Part::Text(text) => println!("{} bytes of text", text.body.len()),
//!         Part::Attachment(a) => println!("attachment {:?}", a.filename),
//!     }
//! }
//! ```
//!
//! Errors for which [`Error::is_unknown_encoding`] returns true mean the
//! message (or part) uses an encoding this crate does not decode; callers
//! usually skip it rather than abort.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod charset;
mod content_type;
mod error;
mod header;
mod reader;

pub mod encoding;

pub use address::{Address, parse_address_list};
pub use charset::{Charset, decode_to_utf8};
pub use content_type::{ContentDisposition, ContentType, DispositionKind};
pub use encoding::TransferEncoding;
pub use error::{Error, Result};
pub use header::{Headers, MessageHeader, parse_date, split_entity};
pub use reader::{AttachmentPart, MessageReader, Part, TextPart};
