//! The wire seam under [`MailClient`](crate::MailClient).
//!
//! [`Transport`] is one request/response round trip per method; ordering,
//! pagination, reuse and parsing live above it. [`ImapTransport`] is the
//! real implementation over a [`Session`]. Tests substitute an in-memory
//! one.

use std::future::Future;

use mailfetch_imap::{
    ConnectionState, FetchedMessage, Mailbox, SearchKey, Selected, Session, SortKey, Uid,
};
use tracing::info;

use crate::Result;
use crate::config::ImapConfig;
use crate::credential::Credential;

/// The currently open mailbox, as reported by the server when it was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedBox {
    /// Mailbox name.
    pub name: String,
    /// Messages in the mailbox (`EXISTS`).
    pub total: u32,
    /// Flags the mailbox supports.
    pub flags: Vec<String>,
    /// UID epoch. UIDs from a different epoch do not refer to the same messages.
    pub uid_validity: Option<u32>,
    /// `HIGHESTMODSEQ`, when the server supports CONDSTORE.
    pub highest_mod_seq: Option<u64>,
    /// Opened with EXAMINE, or the server refused write access.
    pub read_only: bool,
}

impl SelectedBox {
    /// Whether this is the mailbox called `name`.
    ///
    /// `INBOX` matches case-insensitively.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        Mailbox::new(self.name.as_str()).same_as(name)
    }
}

impl From<&Selected> for SelectedBox {
    fn from(selected: &Selected) -> Self {
        let status = selected.status();
        Self {
            name: selected.mailbox().as_str().to_string(),
            total: status.exists,
            flags: status.flags.iter().map(|f| f.as_str().to_string()).collect(),
            uid_validity: status.uid_validity.map(mailfetch_imap::UidValidity::get),
            highest_mod_seq: status.highest_mod_seq,
            read_only: selected.is_read_only(),
        }
    }
}

/// One connection's worth of mailbox commands.
///
/// Calls are strictly sequential: a transport never has two commands in
/// flight. Errors are returned as the server or socket reported them.
pub trait Transport {
    /// Opens `name`, read-only when asked. No mailbox may be open.
    fn open_box(
        &mut self,
        name: &str,
        read_only: bool,
    ) -> impl Future<Output = Result<SelectedBox>> + Send;

    /// Closes the open mailbox, expunging `\Deleted` messages when
    /// `auto_expunge` is set.
    fn close_box(&mut self, auto_expunge: bool) -> impl Future<Output = Result<()>> + Send;

    /// UIDs matching `search`, ordered by `sort`.
    fn sort(
        &mut self,
        sort: &[SortKey],
        search: &[SearchKey],
    ) -> impl Future<Output = Result<Vec<Uid>>> + Send;

    /// Full messages for `uids`, in whatever order the server sends them.
    ///
    /// `mark_seen == Some(true)` sets `\Seen`; anything else leaves flags alone.
    fn fetch(
        &mut self,
        uids: &[Uid],
        mark_seen: Option<bool>,
    ) -> impl Future<Output = Result<Vec<FetchedMessage>>> + Send;

    /// Ends the connection. Safe to call more than once.
    fn end(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Current protocol state.
    fn connection_state(&self) -> ConnectionState;
}

/// [`Transport`] over a live IMAP [`Session`].
#[derive(Debug)]
pub struct ImapTransport {
    session: Session,
}

impl ImapTransport {
    /// Connects and authenticates with XOAUTH2.
    ///
    /// # Errors
    ///
    /// Returns the connection or authentication error unchanged.
    pub async fn connect(config: &ImapConfig, credential: &Credential) -> Result<Self> {
        let mut session = Session::new(config.to_imap_config());
        session
            .connect(credential.principal(), credential.bearer_token())
            .await?;
        info!(host = %config.host, user = credential.principal(), "authenticated");
        Ok(Self { session })
    }

    /// The underlying session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }
}

impl Transport for ImapTransport {
    async fn open_box(&mut self, name: &str, read_only: bool) -> Result<SelectedBox> {
        let selected = self
            .session
            .open_mailbox(Mailbox::new(name), read_only)
            .await?;
        Ok(SelectedBox::from(selected))
    }

    async fn close_box(&mut self, auto_expunge: bool) -> Result<()> {
        Ok(self.session.close_mailbox(auto_expunge).await?)
    }

    async fn sort(&mut self, sort: &[SortKey], search: &[SearchKey]) -> Result<Vec<Uid>> {
        Ok(self.session.uid_sort(sort, search).await?)
    }

    async fn fetch(&mut self, uids: &[Uid], mark_seen: Option<bool>) -> Result<Vec<FetchedMessage>> {
        Ok(self
            .session
            .uid_fetch(uids, mark_seen.unwrap_or(false))
            .await?)
    }

    async fn end(&mut self) -> Result<()> {
        Ok(self.session.logout().await?)
    }

    fn connection_state(&self) -> ConnectionState {
        self.session.connection_state()
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
    use mailfetch_imap::{Flag, Flags, MailboxStatus, UidValidity};

    use super::*;

    #[test]
    fn test_selected_box_from_selected() {
        let mut flags = Flags::new();
        flags.insert(Flag::Seen);
        flags.insert(Flag::Deleted);
        let status = MailboxStatus {
            exists: 4,
            uid_validity: UidValidity::new(1_700_000_000),
            flags,
            read_only: true,
            highest_mod_seq: Some(912),
            ..MailboxStatus::default()
        };
        let selected = Selected::new(Mailbox::inbox(), status);

        let selected_box = SelectedBox::from(&selected);
        assert_eq!(selected_box.name, "INBOX");
        assert_eq!(selected_box.total, 4);
        assert_eq!(selected_box.flags, vec!["\\Seen", "\\Deleted"]);
        assert_eq!(selected_box.uid_validity, Some(1_700_000_000));
        assert_eq!(selected_box.highest_mod_seq, Some(912));
        assert!(selected_box.read_only);
    }

    #[test]
    fn test_inbox_name_is_case_insensitive() {
        let selected_box = SelectedBox {
            name: "INBOX".to_string(),
            total: 0,
            flags: Vec::new(),
            uid_validity: None,
            highest_mod_seq: None,
            read_only: false,
        };
        assert!(selected_box.is("inbox"));
        assert!(!selected_box.is("Sent"));
    }

    #[tokio::test]
    async fn test_connect_error_is_passed_through() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut config = ImapConfig::new("127.0.0.1", 143).unwrap();
        config.port = port;
        let err = ImapTransport::connect(&config, &Credential::new("u", "t"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Imap(mailfetch_imap::Error::Io(_))));
    }
}
