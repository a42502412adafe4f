//! IMAP connection management.
//!
//! This module provides connection handling for IMAP servers, including:
//! - Configuration (host, port, security mode)
//! - TLS/plaintext stream abstraction
//! - Framed I/O with inlined literals
//! - Type-state connection wrapper

mod client;
mod config;
mod framed;
mod stream;

pub use client::{
    Authenticated, Client, FetchStream, FetchedMessage, NotAuthenticated, Selected,
};
pub use config::{Config, ConfigBuilder, Security};
pub use framed::FramedStream;
pub use stream::{ImapStream, connect, connect_plain, connect_tls, create_tls_connector};
