//! Error types for the core library.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Credential missing its principal or bearer token.
    ///
    /// Raised before any network I/O.
    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    /// IMAP operation failed; the protocol error is passed through as is.
    #[error(transparent)]
    Imap(#[from] mailfetch_imap::Error),

    /// A bounded operation did not finish in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Operation that was running.
        operation: &'static str,
        /// The bound that expired.
        after: Duration,
    },

    /// The owning request went away while the operation was running.
    #[error("{operation} cancelled")]
    Cancelled {
        /// Operation that was running.
        operation: &'static str,
    },

    /// A fetched message could not be parsed.
    #[error("Failed to parse message UID {uid}: {source}")]
    Parse {
        /// UID of the message.
        uid: u32,
        /// Underlying MIME error.
        source: mailfetch_mime::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Page or size out of range.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl Error {
    /// Returns `true` for connection and authentication failures, the
    /// ones an HTTP layer reports as 401.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_) | Self::Imap(mailfetch_imap::Error::Auth(_))
        )
    }

    /// Attaches the operation name to a protocol-level timeout.
    pub(crate) fn during(self, operation: &'static str) -> Self {
        match self {
            Self::Imap(mailfetch_imap::Error::Timeout(after)) => Self::Timeout { operation, after },
            other => other,
        }
    }
}

/// Result type alias using our Error type.
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
    fn test_imap_error_is_passed_through() {
        let err: Error = mailfetch_imap::Error::No("[NONEXISTENT] no such mailbox".into()).into();
        assert_eq!(err.to_string(), "Server returned NO: [NONEXISTENT] no such mailbox");
        assert!(matches!(err, Error::Imap(mailfetch_imap::Error::No(_))));
    }

    #[test]
    fn test_auth_classification() {
        assert!(Error::Unauthorized("empty principal").is_auth());
        assert!(Error::from(mailfetch_imap::Error::Auth("invalid token".into())).is_auth());
        assert!(!Error::InvalidQuery("page 0".into()).is_auth());
    }

    #[test]
    fn test_protocol_timeout_gets_operation() {
        let err = Error::from(mailfetch_imap::Error::Timeout(Duration::from_secs(60))).during("sort");
        assert!(matches!(
            err,
            Error::Timeout { operation: "sort", after } if after == Duration::from_secs(60)
        ));
        assert_eq!(err.to_string(), "sort timed out after 60s");
    }
}
