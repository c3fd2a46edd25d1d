//! Error types for the IMAP protocol layer.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while talking to an IMAP server.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket-level failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or record-layer failure.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Host name cannot be used for certificate verification.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Malformed server response.
    #[error("Protocol error at position {position}: {message}")]
    Parse {
        /// Byte offset into the response where parsing stopped.
        position: usize,
        /// What the parser expected.
        message: String,
    },

    /// SASL authentication was rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Tagged NO.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Tagged BAD.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Server closed the session with BYE.
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// A bounded operation did not finish in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Command issued in a state that does not allow it.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Server lacks an extension the command depends on.
    #[error("Server does not advertise {0}")]
    MissingCapability(String),

    /// Peer closed the socket mid-response.
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// Response did not follow the protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns `true` for failures that leave the connection unusable.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Tls(_) | Self::Bye(_) | Self::ConnectionClosed | Self::Timeout(_)
        )
    }
}

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::ConnectionClosed.is_fatal());
        assert!(Error::Bye("shutting down".into()).is_fatal());
        assert!(!Error::No("mailbox missing".into()).is_fatal());
        assert!(!Error::MissingCapability("SORT".into()).is_fatal());
    }

    #[test]
    fn test_display_keeps_server_text() {
        let err = Error::No("[NONEXISTENT] Unknown Mailbox".into());
        assert_eq!(err.to_string(), "Server returned NO: [NONEXISTENT] Unknown Mailbox");
    }
}
