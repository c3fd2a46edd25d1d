//! Owned connection with a runtime view of its protocol state.
//!
//! [`Session`] holds whichever type-state [`Client`] the connection is in
//! and exposes the operations a mail fetcher needs through `&mut self`.
//! Every network round trip is bounded by the timeouts in [`Config`].
//!
//! A transition that fails (SELECT answered NO, a timed-out CLOSE) drops
//! the connection: the session reports [`ConnectionState::Disconnected`]
//! and must not be reused. There is no automatic reconnection.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::client::{Authenticated, Client, FetchedMessage, Selected};
use super::config::{Config, Security};
use super::stream::{ImapStream, open};
use crate::command::{SearchKey, SortKey};
use crate::types::{Mailbox, Uid};
use crate::{Error, Result};

/// Protocol state of a connection, as reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket.
    Disconnected,
    /// Greeting received, not yet authenticated.
    Connected,
    /// Authenticated; a mailbox may be open.
    Authenticated,
    /// STARTTLS accepted, TLS handshake running.
    Upgrading,
}

impl ConnectionState {
    /// Lowercase name, e.g. `authenticated`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Authenticated => "authenticated",
            Self::Upgrading => "upgrading",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum SessionState {
    Disconnected,
    Authenticated(Client<ImapStream, Authenticated>),
    Selected(Client<ImapStream, Selected>),
}

/// One authenticated IMAP connection.
pub struct Session {
    config: Config,
    state: SessionState,
    observed: watch::Sender<ConnectionState>,
}

impl Session {
    /// Creates a disconnected session.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let (observed, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            state: SessionState::Disconnected,
            observed,
        }
    }

    /// Connects, upgrades with STARTTLS when offered on a plaintext port,
    /// and authenticates with XOAUTH2.
    ///
    /// The whole sequence is bounded by the connect timeout.
    pub async fn connect(&mut self, user: &str, token: &str) -> Result<()> {
        if !matches!(self.state, SessionState::Disconnected) {
            return Err(Error::InvalidState("session already connected".to_string()));
        }

        let after = self.config.connect_timeout;
        let result = bounded(after, self.establish(user, token)).await;
        match result {
            Ok(client) => {
                self.state = SessionState::Authenticated(client);
                self.publish(ConnectionState::Authenticated);
                Ok(())
            }
            Err(e) => {
                self.publish(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn establish(&self, user: &str, token: &str) -> Result<Client<ImapStream, Authenticated>> {
        let stream = open(&self.config).await?;
        let mut client = Client::from_stream(stream).await?;
        self.publish(ConnectionState::Connected);
        info!(
            host = %self.config.host,
            port = self.config.port,
            tls = client.stream.get_ref().is_tls(),
            "connected"
        );

        if self.config.security == Security::StartTls {
            if client.supports_starttls() {
                self.publish(ConnectionState::Upgrading);
                client = client.starttls(&self.config.host).await?;
                self.publish(ConnectionState::Connected);
            } else {
                warn!(host = %self.config.host, "server does not offer STARTTLS, staying in plaintext");
            }
        }

        client.authenticate_xoauth2(user, token).await
    }

    fn publish(&self, state: ConnectionState) {
        debug!(%state, "connection state");
        self.observed.send_replace(state);
    }

    /// Current protocol state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        *self.observed.borrow()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.observed.subscribe()
    }

    /// The open mailbox, if any.
    #[must_use]
    pub const fn selected(&self) -> Option<&Selected> {
        match &self.state {
            SessionState::Selected(client) => Some(client.state()),
            _ => None,
        }
    }

    /// Opens `mailbox`; no mailbox may be open.
    pub async fn open_mailbox(&mut self, mailbox: Mailbox, read_only: bool) -> Result<&Selected> {
        let client = match std::mem::replace(&mut self.state, SessionState::Disconnected) {
            SessionState::Authenticated(client) => client,
            other => {
                self.state = other;
                return Err(Error::InvalidState("a mailbox is already open".to_string()));
            }
        };

        let after = self.config.io_timeout;
        let opened = if read_only {
            bounded(after, client.examine(mailbox)).await
        } else {
            bounded(after, client.select(mailbox)).await
        };
        let client = self.settle(opened)?;
        self.state = SessionState::Selected(client);

        self.selected()
            .ok_or_else(|| Error::InvalidState("mailbox not open".to_string()))
    }

    /// Leaves the open mailbox. `expunge` chooses CLOSE over a
    /// non-expunging close.
    pub async fn close_mailbox(&mut self, expunge: bool) -> Result<()> {
        let client = match std::mem::replace(&mut self.state, SessionState::Disconnected) {
            SessionState::Selected(client) => client,
            other => {
                self.state = other;
                return Err(Error::InvalidState("no mailbox is open".to_string()));
            }
        };

        let after = self.config.io_timeout;
        let closed = if expunge {
            bounded(after, client.close()).await
        } else {
            bounded(after, client.close_keep_deleted()).await
        };
        let client = self.settle(closed)?;
        self.state = SessionState::Authenticated(client);
        Ok(())
    }

    /// `UID SORT` in the open mailbox.
    pub async fn uid_sort(&mut self, keys: &[SortKey], criteria: &[SearchKey]) -> Result<Vec<Uid>> {
        let after = self.config.io_timeout;
        let client = self.selected_client()?;
        bounded(after, client.uid_sort(keys, criteria)).await
    }

    /// `UID FETCH` of full messages in the open mailbox.
    pub async fn uid_fetch(&mut self, uids: &[Uid], mark_seen: bool) -> Result<Vec<FetchedMessage>> {
        let after = self.config.io_timeout;
        let client = self.selected_client()?;
        bounded(after, client.uid_fetch(uids, mark_seen)).await
    }

    /// Logs out and closes the socket. The session ends disconnected even
    /// if LOGOUT fails.
    pub async fn logout(&mut self) -> Result<()> {
        let after = self.config.io_timeout;
        let result = match std::mem::replace(&mut self.state, SessionState::Disconnected) {
            SessionState::Disconnected => Ok(()),
            SessionState::Authenticated(client) => bounded(after, client.logout()).await,
            SessionState::Selected(client) => bounded(after, client.logout()).await,
        };
        self.publish(ConnectionState::Disconnected);
        info!(host = %self.config.host, "disconnected");
        result
    }

    fn selected_client(&mut self) -> Result<&mut Client<ImapStream, Selected>> {
        match &mut self.state {
            SessionState::Selected(client) if client.is_in_flight() => Err(Error::InvalidState(
                "previous command was abandoned".to_string(),
            )),
            SessionState::Selected(client) => Ok(client),
            _ => Err(Error::InvalidState("no mailbox is open".to_string())),
        }
    }

    /// Publishes `Disconnected` when a transition failed and took the
    /// connection with it.
    fn settle<T>(&self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.publish(ConnectionState::Disconnected);
        }
        result
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("state", &self.connection_state())
            .field("selected", &self.selected().map(|s| s.mailbox().as_str()))
            .finish_non_exhaustive()
    }
}

async fn bounded<T>(after: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| Error::Timeout(after))?
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
    fn test_connection_state_names() {
        assert_eq!(ConnectionState::Disconnected.to_string(), "disconnected");
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::Authenticated.to_string(), "authenticated");
        assert_eq!(ConnectionState::Upgrading.to_string(), "upgrading");
    }

    #[test]
    fn test_new_session_is_disconnected() {
        let session = Session::new(Config::new("imap.example.com", 993));
        assert_eq!(session.connection_state(), ConnectionState::Disconnected);
        assert!(session.selected().is_none());
    }

    #[tokio::test]
    async fn test_operations_need_an_open_mailbox() {
        let mut session = Session::new(Config::new("imap.example.com", 993));

        let err = session.uid_sort(&[], &[]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        let err = session.close_mailbox(true).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        let err = session
            .open_mailbox(Mailbox::inbox(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_logout_when_disconnected_is_noop() {
        let mut session = Session::new(Config::new("imap.example.com", 993));
        session.logout().await.unwrap();
        assert_eq!(session.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        // Accept but never send a greeting.
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let config = Config::builder("127.0.0.1")
            .port(port)
            .security(Security::StartTls)
            .connect_timeout(Duration::from_millis(100))
            .build();
        let mut session = Session::new(config);
        let mut states = session.watch_state();

        let err = session.connect("user", "token").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(100)));
        assert_eq!(*states.borrow_and_update(), ConnectionState::Disconnected);
    }
}
