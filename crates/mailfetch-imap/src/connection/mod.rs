//! IMAP connection management.
//!
//! - Configuration (host, port, security mode, timeouts)
//! - TLS/plaintext stream abstraction
//! - Framed I/O for the IMAP wire format
//! - Type-state client
//! - [`Session`], an owned connection with a runtime state view

mod client;
mod config;
mod framed;
mod session;
mod stream;

pub use client::{Authenticated, Client, FetchedMessage, NotAuthenticated, Selected};
pub use config::{Config, ConfigBuilder, IMAP_PORT, IMAPS_PORT, Security};
pub use framed::{FramedStream, ResponseAccumulator};
pub use session::{ConnectionState, Session};
pub use stream::{ImapStream, create_tls_connector, open};
