//! Mailbox names and SELECT results.

use super::{Flags, SeqNum, Uid, UidValidity};

/// Mailbox name as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(pub String);

impl Mailbox {
    /// Creates a mailbox name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// `INBOX`, the one name every server understands.
    #[must_use]
    pub fn inbox() -> Self {
        Self("INBOX".to_string())
    }

    /// Returns the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compares names, treating `INBOX` case-insensitively as RFC 3501 requires.
    #[must_use]
    pub fn same_as(&self, other: &str) -> bool {
        if self.0.eq_ignore_ascii_case("INBOX") {
            other.eq_ignore_ascii_case("INBOX")
        } else {
            self.0 == other
        }
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the server reported while opening a mailbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Number of messages (`EXISTS`).
    pub exists: u32,
    /// Number of `\Recent` messages.
    pub recent: u32,
    /// First unseen sequence number, if reported.
    pub unseen: Option<SeqNum>,
    /// Predicted next UID.
    pub uid_next: Option<Uid>,
    /// Current UID epoch.
    pub uid_validity: Option<UidValidity>,
    /// Flags defined in the mailbox.
    pub flags: Flags,
    /// Flags the client may change permanently.
    pub permanent_flags: Flags,
    /// Opened with EXAMINE or marked `[READ-ONLY]`.
    pub read_only: bool,
    /// `HIGHESTMODSEQ`, if the server supports CONDSTORE.
    pub highest_mod_seq: Option<u64>,
}

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
    fn test_inbox_is_case_insensitive() {
        assert!(Mailbox::inbox().same_as("inbox"));
        assert!(Mailbox::new("Inbox").same_as("INBOX"));
    }

    #[test]
    fn test_other_names_are_case_sensitive() {
        assert!(Mailbox::new("Sent").same_as("Sent"));
        assert!(!Mailbox::new("Sent").same_as("SENT"));
    }

    #[test]
    fn test_status_default() {
        let status = MailboxStatus::default();
        assert_eq!(status.exists, 0);
        assert!(!status.read_only);
        assert!(status.uid_validity.is_none());
    }
}
