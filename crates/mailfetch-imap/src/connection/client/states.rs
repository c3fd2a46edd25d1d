//! Type-state markers for the client.
//!
//! `Selected` is not a bare marker: it carries what the server reported
//! when the mailbox was opened, so callers never need a second round trip
//! to learn the message count or UID epoch.

use crate::types::{Mailbox, MailboxStatus, UidValidity};

/// Connected, greeting read, not yet authenticated.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Authenticated with no mailbox open.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// A mailbox is open.
#[derive(Debug, Clone)]
pub struct Selected {
    pub(crate) mailbox: Mailbox,
    pub(crate) status: MailboxStatus,
}

impl Selected {
    /// Creates the selected state.
    #[must_use]
    pub const fn new(mailbox: Mailbox, status: MailboxStatus) -> Self {
        Self { mailbox, status }
    }

    /// Name of the open mailbox.
    #[must_use]
    pub const fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Status snapshot from SELECT/EXAMINE.
    #[must_use]
    pub const fn status(&self) -> &MailboxStatus {
        &self.status
    }

    /// True if opened with EXAMINE or the server answered `[READ-ONLY]`.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.status.read_only
    }

    /// Number of messages in the mailbox.
    #[must_use]
    pub const fn exists(&self) -> u32 {
        self.status.exists
    }

    /// UID epoch reported by the server.
    #[must_use]
    pub const fn uid_validity(&self) -> Option<UidValidity> {
        self.status.uid_validity
    }
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

    fn _assert_send<T: Send>() {}
    fn _assert_sync<T: Sync>() {}

    #[test]
    fn test_state_markers_are_send_sync() {
        _assert_send::<NotAuthenticated>();
        _assert_sync::<NotAuthenticated>();
        _assert_send::<Authenticated>();
        _assert_sync::<Authenticated>();
        _assert_send::<Selected>();
        _assert_sync::<Selected>();
    }

    #[test]
    fn test_selected_state_accessors() {
        let status = MailboxStatus {
            exists: 100,
            uid_validity: UidValidity::new(12345),
            read_only: true,
            ..Default::default()
        };
        let selected = Selected::new(Mailbox::inbox(), status);

        assert_eq!(selected.mailbox().as_str(), "INBOX");
        assert!(selected.is_read_only());
        assert_eq!(selected.exists(), 100);
        assert_eq!(selected.uid_validity().map(UidValidity::get), Some(12345));
    }
}
