//! Request/response mail client over one connection.
//!
//! [`MailClient`] owns a [`Transport`] and the mailbox it has open. It adds
//! what the wire does not give for free:
//!
//! - reuse of the open mailbox when the same one is asked for again,
//! - pagination over the sorted UID list,
//! - reassembly of fetched messages in sort order, whatever order the
//!   server streamed them in,
//! - a timeout around every round trip.
//!
//! Commands are strictly sequential; every method takes `&mut self`.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use mailfetch_imap::{ConnectionState, FetchedMessage, SearchKey, SortCriterion, SortKey, Uid};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ImapConfig;
use crate::credential::Credential;
use crate::email::{ReceivedEmail, parse_email};
use crate::mailbox::MailBox;
use crate::pagination::{PageQuery, Pagination, range, slice_page};
use crate::transport::{ImapTransport, SelectedBox, Transport};
use crate::{Error, Result};

/// Newest arrival first.
pub const NEWEST_FIRST: SortKey = SortKey::desc(SortCriterion::Arrival);

/// How to open a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOptions {
    /// Open with EXAMINE.
    pub read_only: bool,
    /// Expunge `\Deleted` messages when a previously open mailbox is closed.
    pub auto_expunge: bool,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            auto_expunge: true,
        }
    }
}

/// Search and sort program for listing a mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria {
    /// Sort program, most significant key first.
    pub sort: Vec<SortKey>,
    /// AND-ed search keys.
    pub search: Vec<SearchKey>,
}

impl Default for Criteria {
    fn default() -> Self {
        Self {
            sort: vec![NEWEST_FIRST],
            search: vec![SearchKey::All],
        }
    }
}

/// What [`MailClient::fetch_messages`] should fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    /// Ordered UIDs to page through; sorted newest first when `None`.
    pub uids: Option<Vec<Uid>>,
    /// Page of `uids` to fetch.
    pub query: PageQuery,
    /// `Some(true)` marks the messages `\Seen`; otherwise flags are left alone.
    pub mark_seen: Option<bool>,
}

/// Options for [`MailClient::get_mails`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetMailsOptions {
    /// Page to return.
    pub query: PageQuery,
    /// Search and sort program.
    pub criteria: Criteria,
    /// Open the mailbox with EXAMINE.
    pub read_only: bool,
    /// Passed through to the fetch.
    pub mark_seen: Option<bool>,
    /// Close the mailbox before returning.
    pub auto_close: bool,
}

impl Default for GetMailsOptions {
    fn default() -> Self {
        Self {
            query: PageQuery::default(),
            criteria: Criteria::default(),
            read_only: false,
            mark_seen: None,
            auto_close: true,
        }
    }
}

/// One page of parsed messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailPage {
    /// Messages in sort order.
    pub mails: Vec<ReceivedEmail>,
    /// Computed over the mailbox's message count.
    pub pagination: Pagination,
}

/// Mail client bound to one authenticated connection.
#[derive(Debug)]
pub struct MailClient<T> {
    transport: T,
    selected: Option<SelectedBox>,
    io_timeout: Duration,
}

impl MailClient<ImapTransport> {
    /// Connects to `config` and authenticates with `credential`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] for an incomplete credential, before
    /// any network I/O. Connection and authentication failures are passed
    /// through unchanged.
    pub async fn connect(credential: &Credential, config: &ImapConfig) -> Result<Self> {
        Self::connect_with(
            credential,
            config.connect_timeout,
            config.io_timeout,
            async |credential: &Credential| ImapTransport::connect(config, credential).await,
        )
        .await
    }
}

impl<T: Transport> MailClient<T> {
    /// Validates `credential`, then builds the transport with `connect`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] without calling `connect` when the
    /// credential is incomplete, or whatever `connect` fails with.
    pub async fn connect_with<F>(
        credential: &Credential,
        connect_timeout: Duration,
        io_timeout: Duration,
        connect: F,
    ) -> Result<Self>
    where
        F: AsyncFnOnce(&Credential) -> Result<T>,
    {
        credential.validate()?;
        let transport = bounded(connect_timeout, "connect", connect(credential)).await?;
        Ok(Self::from_transport(transport, io_timeout))
    }

    /// Wraps an already connected transport.
    #[must_use]
    pub const fn from_transport(transport: T, io_timeout: Duration) -> Self {
        Self {
            transport,
            selected: None,
            io_timeout,
        }
    }

    /// Current protocol state of the connection.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.transport.connection_state()
    }

    /// The open mailbox, if any.
    #[must_use]
    pub const fn selected_box(&self) -> Option<&SelectedBox> {
        self.selected.as_ref()
    }

    /// Opens `mailbox`.
    ///
    /// If it is already open it is returned as is, with no I/O. If another
    /// mailbox is open it is closed first.
    ///
    /// # Errors
    ///
    /// Close and open failures are passed through. After a failure no
    /// mailbox is open.
    pub async fn select_box(&mut self, mailbox: MailBox, options: SelectOptions) -> Result<&SelectedBox> {
        let name = mailbox.as_str();
        if self.selected.as_ref().is_some_and(|open| open.is(name)) {
            debug!(mailbox = name, "mailbox already open");
        } else {
            if let Some(previous) = self.selected.take() {
                debug!(from = %previous.name, to = name, "switching mailbox");
                bounded(
                    self.io_timeout,
                    "close_box",
                    self.transport.close_box(options.auto_expunge),
                )
                .await?;
            }
            let opened = bounded(
                self.io_timeout,
                "open_box",
                self.transport.open_box(name, options.read_only),
            )
            .await?;
            info!(
                mailbox = %opened.name,
                total = opened.total,
                read_only = opened.read_only,
                "mailbox opened"
            );
            self.selected = Some(opened);
        }

        self.selected.as_ref().ok_or_else(no_mailbox)
    }

    /// Closes the open mailbox; a no-op when none is open.
    ///
    /// # Errors
    ///
    /// The server's error is passed through.
    pub async fn close_box(&mut self, auto_expunge: bool) -> Result<()> {
        let Some(closing) = self.selected.take() else {
            debug!("no mailbox open, nothing to close");
            return Ok(());
        };
        bounded(
            self.io_timeout,
            "close_box",
            self.transport.close_box(auto_expunge),
        )
        .await?;
        info!(mailbox = %closing.name, expunged = auto_expunge, "mailbox closed");
        Ok(())
    }

    /// UIDs in the open mailbox matching `search`, ordered by `sort`.
    ///
    /// An empty sort program means newest first; an empty search means all.
    ///
    /// # Errors
    ///
    /// Fails when no mailbox is open. Server errors are passed through.
    pub async fn sort(&mut self, sort: &[SortKey], search: &[SearchKey]) -> Result<Vec<Uid>> {
        if self.selected.is_none() {
            return Err(no_mailbox());
        }
        let sort = if sort.is_empty() { &[NEWEST_FIRST][..] } else { sort };
        let uids = bounded(self.io_timeout, "sort", self.transport.sort(sort, search)).await?;
        debug!(matched = uids.len(), "sorted");
        Ok(uids)
    }

    /// Fetches one page of messages, in the order of the UID list.
    ///
    /// Without explicit UIDs the open mailbox is sorted newest first. No
    /// fetch is issued when the list or the page is empty. Messages the
    /// server did not return (expunged meanwhile) are left out.
    ///
    /// # Errors
    ///
    /// Sort and fetch failures are passed through; nothing partial is
    /// returned.
    pub async fn fetch_messages(&mut self, request: FetchRequest) -> Result<Vec<FetchedMessage>> {
        let uids = match request.uids {
            Some(uids) => uids,
            None => self.sort(&[NEWEST_FIRST], &[SearchKey::All]).await?,
        };
        if uids.is_empty() {
            debug!("no matching messages, skipping fetch");
            return Ok(Vec::new());
        }

        let page = slice_page(&uids, request.query);
        if page.is_empty() {
            debug!(page = request.query.page(), "page out of range, skipping fetch");
            return Ok(Vec::new());
        }

        let delivered = bounded(
            self.io_timeout,
            "fetch",
            self.transport.fetch(page, request.mark_seen),
        )
        .await?;
        Ok(reassemble(page, delivered))
    }

    /// Lists one page of `mailbox`.
    ///
    /// Opens (or reuses) the mailbox, sorts it, and fetches and parses only
    /// the requested page. Pages beyond the end, and empty mailboxes,
    /// return no messages and issue no fetch. With `auto_close` the
    /// mailbox is closed, expunging, before returning.
    ///
    /// # Errors
    ///
    /// Any open, sort, fetch or close failure, or [`Error::Parse`] when a
    /// message on the page cannot be parsed. The mailbox is left open on
    /// error.
    pub async fn get_mails(&mut self, mailbox: MailBox, options: GetMailsOptions) -> Result<MailPage> {
        let select = SelectOptions {
            read_only: options.read_only,
            ..SelectOptions::default()
        };
        let total = self.select_box(mailbox, select).await?.total;
        let uids = self
            .sort(&options.criteria.sort, &options.criteria.search)
            .await?;

        let query = options.query;
        let pagination = Pagination::of(total, query);
        let mails = if range(total, query.page(), query.size()).is_blank() {
            debug!(%mailbox, total, page = query.page(), "nothing to fetch");
            Vec::new()
        } else {
            let fetched = self
                .fetch_messages(FetchRequest {
                    uids: Some(uids),
                    query,
                    mark_seen: options.mark_seen,
                })
                .await?;
            fetched
                .into_iter()
                .map(|message| parse_email(mailbox, message))
                .collect::<Result<Vec<_>>>()?
        };

        if options.auto_close {
            self.close_box(true).await?;
        }

        debug!(%mailbox, count = mails.len(), total, "page ready");
        Ok(MailPage { mails, pagination })
    }

    /// Ends the connection. Failures are logged, not returned.
    pub async fn close_connection(mut self) {
        self.selected = None;
        match bounded(self.io_timeout, "logout", self.transport.end()).await {
            Ok(()) => debug!("connection closed"),
            Err(e) => warn!(error = %e, "connection did not close cleanly"),
        }
    }
}

/// Puts `delivered` in the order of `requested`.
///
/// Servers answer a UID FETCH in sequence order, or any order they like;
/// each slot is keyed by UID and drained in request order.
fn reassemble(requested: &[Uid], delivered: Vec<FetchedMessage>) -> Vec<FetchedMessage> {
    let position: HashMap<Uid, usize> = requested
        .iter()
        .enumerate()
        .map(|(i, uid)| (*uid, i))
        .collect();
    let mut slots: Vec<Option<FetchedMessage>> =
        std::iter::repeat_with(|| None).take(requested.len()).collect();

    for message in delivered {
        match position.get(&message.uid) {
            Some(&i) => slots[i] = Some(message),
            None => debug!(uid = %message.uid, "ignoring unrequested message"),
        }
    }

    slots
        .into_iter()
        .zip(requested)
        .filter_map(|(slot, uid)| {
            if slot.is_none() {
                warn!(%uid, "message missing from fetch response");
            }
            slot
        })
        .collect()
}

fn no_mailbox() -> Error {
    mailfetch_imap::Error::InvalidState("no mailbox is open".to_string()).into()
}

/// Runs `fut`, failing with [`Error::Timeout`] once `after` has elapsed.
pub(crate) async fn bounded<R>(
    after: Duration,
    operation: &'static str,
    fut: impl Future<Output = Result<R>>,
) -> Result<R> {
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result.map_err(|e| e.during(operation)),
        Err(_) => Err(Error::Timeout { operation, after }),
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
    use std::sync::atomic::{AtomicUsize, Ordering};

    use mailfetch_imap::SeqNum;

    use super::*;
    use crate::mock::{Hang, MockTransport};

    const IO: Duration = Duration::from_secs(60);

    fn client(transport: MockTransport) -> MailClient<MockTransport> {
        MailClient::from_transport(transport, IO)
    }

    fn uids(ns: &[u32]) -> Vec<Uid> {
        ns.iter().map(|&n| Uid::new(n).unwrap()).collect()
    }

    fn query(page: u32, size: u32) -> PageQuery {
        PageQuery::new(page, size).unwrap()
    }

    fn order(messages: &[FetchedMessage]) -> Vec<u32> {
        messages.iter().map(|m| m.uid.get()).collect()
    }

    #[tokio::test]
    async fn test_connect_rejects_incomplete_credentials() {
        for (principal, token) in [("", "x"), ("x", ""), ("", "")] {
            let built = AtomicUsize::new(0);
            let result = MailClient::connect_with(
                &Credential::new(principal, token),
                IO,
                IO,
                async |_: &Credential| {
                    built.fetch_add(1, Ordering::SeqCst);
                    Ok(MockTransport::inbox(0))
                },
            )
            .await;

            assert!(matches!(result, Err(Error::Unauthorized(_))));
            assert_eq!(built.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_connect_builds_transport_once() {
        let built = AtomicUsize::new(0);
        let client = MailClient::connect_with(
            &Credential::new("me@example.com", "ya29.token"),
            IO,
            IO,
            async |credential: &Credential| {
                assert_eq!(credential.principal(), "me@example.com");
                built.fetch_add(1, Ordering::SeqCst);
                Ok(MockTransport::inbox(0))
            },
        )
        .await
        .unwrap();

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(client.connection_state(), ConnectionState::Authenticated);
    }

    #[tokio::test]
    async fn test_connect_error_is_passed_through() {
        let result = MailClient::<MockTransport>::connect_with(
            &Credential::new("me@example.com", "expired"),
            IO,
            IO,
            async |_: &Credential| Err(mailfetch_imap::Error::Auth("invalid credentials".into()).into()),
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::Imap(mailfetch_imap::Error::Auth(text))) if text == "invalid credentials"
        ));
    }

    #[tokio::test]
    async fn test_select_same_box_twice_opens_once() {
        let transport = MockTransport::inbox(4);
        let calls = transport.calls();
        let mut client = client(transport);

        client.select_box(MailBox::Inbox, SelectOptions::default()).await.unwrap();
        let selected = client
            .select_box(MailBox::Inbox, SelectOptions::default())
            .await
            .unwrap();
        assert_eq!(selected.total, 4);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.open.len(), 1);
        assert!(calls.close.is_empty());
    }

    #[tokio::test]
    async fn test_select_other_box_closes_then_opens() {
        let transport = MockTransport::inbox(4);
        let calls = transport.calls();
        let mut client = client(transport);

        client.select_box(MailBox::Inbox, SelectOptions::default()).await.unwrap();
        let options = SelectOptions {
            read_only: true,
            auto_expunge: false,
        };
        let selected = client.select_box(MailBox::Sent, options).await.unwrap();
        assert_eq!(selected.name, "Sent");
        assert!(selected.read_only);

        let calls = calls.lock().unwrap();
        assert_eq!(
            calls.open,
            vec![("INBOX".to_string(), false), ("Sent".to_string(), true)]
        );
        assert_eq!(calls.close, vec![false]);
    }

    #[tokio::test]
    async fn test_failed_open_leaves_nothing_selected() {
        let mut transport = MockTransport::inbox(4);
        transport.boxes.remove("Trash");
        let mut client = client(transport);

        let err = client
            .select_box(MailBox::Trash, SelectOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Imap(mailfetch_imap::Error::No(_))));
        assert!(client.selected_box().is_none());
    }

    #[tokio::test]
    async fn test_sort_needs_open_mailbox() {
        let mut client = client(MockTransport::inbox(4));
        let err = client.sort(&[NEWEST_FIRST], &[]).await.unwrap_err();
        assert!(matches!(err, Error::Imap(mailfetch_imap::Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_sort_passes_criteria_through() {
        let transport = MockTransport::inbox(4);
        let calls = transport.calls();
        let mut client = client(transport);
        client.select_box(MailBox::Inbox, SelectOptions::default()).await.unwrap();

        let search = vec![SearchKey::Unseen, SearchKey::From("boss@example.com".into())];
        let sort = vec![SortKey::asc(SortCriterion::Subject)];
        client.sort(&sort, &search).await.unwrap();
        client.sort(&[], &[]).await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.sort[0], (sort, search));
        assert_eq!(calls.sort[1].0, vec![NEWEST_FIRST]);
    }

    #[tokio::test]
    async fn test_fetch_preserves_sort_order() {
        let mut transport = MockTransport::inbox(4);
        transport.delivery = Some(vec![2, 4, 1, 3]);
        let calls = transport.calls();
        let mut client = client(transport);
        client.select_box(MailBox::Inbox, SelectOptions::default()).await.unwrap();

        let messages = client.fetch_messages(FetchRequest::default()).await.unwrap();

        assert_eq!(order(&messages), vec![4, 3, 2, 1]);
        assert_eq!(calls.lock().unwrap().fetch, vec![(vec![4, 3, 2, 1], None)]);
    }

    #[tokio::test]
    async fn test_fetch_empty_sort_skips_fetch() {
        let mut transport = MockTransport::inbox(4);
        transport.sorted.clear();
        let calls = transport.calls();
        let mut client = client(transport);
        client.select_box(MailBox::Inbox, SelectOptions::default()).await.unwrap();

        let messages = client.fetch_messages(FetchRequest::default()).await.unwrap();

        assert!(messages.is_empty());
        let calls = calls.lock().unwrap();
        assert_eq!(calls.sort.len(), 1);
        assert!(calls.fetch.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_explicit_uids_pages_without_sorting() {
        let transport = MockTransport::inbox(12);
        let calls = transport.calls();
        let mut client = client(transport);
        client.select_box(MailBox::Inbox, SelectOptions::default()).await.unwrap();

        let messages = client
            .fetch_messages(FetchRequest {
                uids: Some(uids(&[12, 10, 8, 6, 4, 2, 11, 9, 7])),
                query: query(2, 5),
                mark_seen: Some(true),
            })
            .await
            .unwrap();

        assert_eq!(order(&messages), vec![2, 11, 9, 7]);
        let calls = calls.lock().unwrap();
        assert!(calls.sort.is_empty());
        assert_eq!(calls.fetch, vec![(vec![2, 11, 9, 7], Some(true))]);
    }

    #[tokio::test]
    async fn test_fetch_page_out_of_range_skips_fetch() {
        let transport = MockTransport::inbox(4);
        let calls = transport.calls();
        let mut client = client(transport);
        client.select_box(MailBox::Inbox, SelectOptions::default()).await.unwrap();

        let messages = client
            .fetch_messages(FetchRequest {
                query: query(3, 5),
                ..FetchRequest::default()
            })
            .await
            .unwrap();
        assert!(messages.is_empty());
        assert!(calls.lock().unwrap().fetch.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_discards_everything() {
        let mut transport = MockTransport::inbox(4);
        transport.fetch_error = Some("[UNAVAILABLE] try later".to_string());
        let mut client = client(transport);
        client.select_box(MailBox::Inbox, SelectOptions::default()).await.unwrap();

        let err = client.fetch_messages(FetchRequest::default()).await.unwrap_err();
        assert!(matches!(err, Error::Imap(mailfetch_imap::Error::No(text)) if text.contains("UNAVAILABLE")));
    }

    #[test]
    fn test_reassemble_skips_missing_and_unrequested() {
        let message = |n: u32| FetchedMessage::new(SeqNum::new(n).unwrap(), Uid::new(n).unwrap());
        let delivered = vec![message(1), message(99), message(4)];
        let ordered = reassemble(&uids(&[4, 3, 1]), delivered);
        assert_eq!(order(&ordered), vec![4, 1]);
    }

    #[tokio::test]
    async fn test_get_mails_first_page() {
        let mut transport = MockTransport::inbox(4);
        transport.delivery = Some(vec![2, 4, 1, 3]);
        let calls = transport.calls();
        let mut client = client(transport);

        let page = client
            .get_mails(MailBox::Inbox, GetMailsOptions::default())
            .await
            .unwrap();

        let mail_uids: Vec<u32> = page.mails.iter().map(|m| m.uid).collect();
        assert_eq!(mail_uids, vec![4, 3, 2, 1]);
        assert_eq!(page.mails[0].subject, "message 4");
        assert_eq!(page.mails[0].mail_box, MailBox::Inbox);
        assert_eq!(
            page.pagination,
            Pagination {
                page: 1,
                per_size: 5,
                count: 4,
                total: 4,
                pages: 1,
                overflow: false,
                prev_page: None,
                next_page: None,
            }
        );

        let calls = calls.lock().unwrap();
        assert_eq!(calls.sort, vec![(vec![NEWEST_FIRST], vec![SearchKey::All])]);
        assert_eq!(calls.close, vec![true]);
    }

    #[tokio::test]
    async fn test_get_mails_overflow_never_fetches() {
        let transport = MockTransport::inbox(4);
        let calls = transport.calls();
        let mut client = client(transport);

        let page = client
            .get_mails(
                MailBox::Inbox,
                GetMailsOptions {
                    query: query(2, 5),
                    ..GetMailsOptions::default()
                },
            )
            .await
            .unwrap();

        assert!(page.mails.is_empty());
        assert!(page.pagination.overflow);
        assert_eq!(page.pagination.pages, 1);
        assert_eq!(page.pagination.count, 0);
        assert!(calls.lock().unwrap().fetch.is_empty());
    }

    #[tokio::test]
    async fn test_get_mails_empty_mailbox() {
        let mut transport = MockTransport::inbox(0);
        transport.sorted.clear();
        let calls = transport.calls();
        let mut client = client(transport);

        let page = client
            .get_mails(MailBox::Inbox, GetMailsOptions::default())
            .await
            .unwrap();

        assert!(page.mails.is_empty());
        assert!(!page.pagination.overflow);
        assert_eq!(page.pagination.pages, 0);
        assert!(calls.lock().unwrap().fetch.is_empty());
    }

    #[tokio::test]
    async fn test_get_mails_auto_close() {
        for (auto_close, expected) in [(None, 1), (Some(true), 1), (Some(false), 0)] {
            let transport = MockTransport::inbox(4);
            let calls = transport.calls();
            let mut client = client(transport);

            let mut options = GetMailsOptions::default();
            if let Some(auto_close) = auto_close {
                options.auto_close = auto_close;
            }
            client.get_mails(MailBox::Inbox, options).await.unwrap();

            assert_eq!(calls.lock().unwrap().close.len(), expected, "{auto_close:?}");
            assert_eq!(client.selected_box().is_some(), expected == 0);
        }
    }

    #[tokio::test]
    async fn test_get_mails_without_auto_close_reuses_box() {
        let transport = MockTransport::inbox(12);
        let calls = transport.calls();
        let mut client = client(transport);
        let keep_open = |page| GetMailsOptions {
            query: query(page, 5),
            auto_close: false,
            ..GetMailsOptions::default()
        };

        let first = client.get_mails(MailBox::Inbox, keep_open(1)).await.unwrap();
        let second = client.get_mails(MailBox::Inbox, keep_open(2)).await.unwrap();

        assert_eq!(first.mails.first().map(|m| m.uid), Some(12));
        assert_eq!(second.mails.first().map(|m| m.uid), Some(7));
        assert_eq!(second.pagination.prev_page, Some(1));
        assert_eq!(second.pagination.next_page, Some(3));
        let calls = calls.lock().unwrap();
        assert_eq!(calls.open.len(), 1);
        assert!(calls.close.is_empty());
    }

    #[tokio::test]
    async fn test_get_mails_passes_read_only_and_mark_seen() {
        let transport = MockTransport::inbox(4);
        let calls = transport.calls();
        let mut client = client(transport);

        client
            .get_mails(
                MailBox::Inbox,
                GetMailsOptions {
                    read_only: true,
                    mark_seen: Some(false),
                    ..GetMailsOptions::default()
                },
            )
            .await
            .unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.open, vec![("INBOX".to_string(), true)]);
        assert_eq!(calls.fetch[0].1, Some(false));
    }

    #[tokio::test]
    async fn test_get_mails_unparseable_message_fails_page() {
        let mut transport = MockTransport::inbox(4);
        transport.messages.insert(3, String::new());
        let mut client = client(transport);

        let err = client
            .get_mails(MailBox::Inbox, GetMailsOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse { uid: 3, .. }));
    }

    #[tokio::test]
    async fn test_get_mails_malformed_part_keeps_page() {
        let mut transport = MockTransport::inbox(4);
        transport.messages.insert(
            3,
            "From: a@example.com\r\n\
             Subject: broken\r\n\
             Content-Type: multipart/mixed; boundary=b\r\n\
             \r\n\
             --b\r\n\
             Content-Type: text/plain\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             aGVsbG8!gd29ybGQ=\r\n\
             --b--\r\n"
                .to_string(),
        );
        let mut client = client(transport);

        let page = client
            .get_mails(MailBox::Inbox, GetMailsOptions::default())
            .await
            .unwrap();
        let uids: Vec<u32> = page.mails.iter().map(|m| m.uid).collect();
        assert_eq!(uids, vec![4, 3, 2, 1]);
        assert_eq!(page.mails[1].subject, "broken");
        assert_eq!(page.mails[1].content.source, "<p>hello world</p>");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_sort_times_out() {
        let mut transport = MockTransport::inbox(4);
        transport.hang = Some(Hang::Sort);
        let mut client = MailClient::from_transport(transport, Duration::from_secs(5));

        let err = client
            .get_mails(MailBox::Inbox, GetMailsOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Timeout { operation: "sort", after } if after == Duration::from_secs(5)
        ));
    }

    #[tokio::test]
    async fn test_close_connection_ends_transport() {
        let transport = MockTransport::inbox(4);
        let calls = transport.calls();
        let mut client = client(transport);
        client.select_box(MailBox::Inbox, SelectOptions::default()).await.unwrap();

        client.close_connection().await;

        let calls = calls.lock().unwrap();
        assert_eq!(calls.end, 1);
        assert!(calls.close.is_empty());
    }
}
