//! Close-on-exit wrappers around a [`MailClient`].
//!
//! IMAP servers cap concurrent connections per account, so a connection
//! must not outlive the request that opened it. Both helpers take the
//! client by value and close it exactly once, whatever the body returns.

use std::future::Future;

use tracing::warn;

use crate::client::MailClient;
use crate::transport::Transport;
use crate::{Error, Result};

/// Runs `body`, then closes the connection.
///
/// # Errors
///
/// Returns whatever `body` returns; closing never fails the call.
pub async fn scoped<T, R, F>(mut client: MailClient<T>, body: F) -> Result<R>
where
    T: Transport,
    F: AsyncFnOnce(&mut MailClient<T>) -> Result<R>,
{
    let result = body(&mut client).await;
    client.close_connection().await;
    result
}

/// Like [`scoped`], but gives up as soon as `cancelled` completes.
///
/// The in-flight command is dropped, the connection closed, and
/// [`Error::Cancelled`] returned.
///
/// # Errors
///
/// Returns [`Error::Cancelled`] on cancellation, otherwise whatever `body`
/// returns.
pub async fn scoped_until<T, R, F, C>(mut client: MailClient<T>, cancelled: C, body: F) -> Result<R>
where
    T: Transport,
    F: AsyncFnOnce(&mut MailClient<T>) -> Result<R>,
    C: Future<Output = ()>,
{
    let result = tokio::select! {
        result = body(&mut client) => result,
        () = cancelled => {
            warn!("request cancelled, dropping connection");
            Err(Error::Cancelled { operation: "request" })
        }
    };
    client.close_connection().await;
    result
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
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;
    use crate::client::GetMailsOptions;
    use crate::mailbox::MailBox;
    use crate::mock::{Hang, MockTransport};

    const IO: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_scoped_closes_after_success() {
        let transport = MockTransport::inbox(4);
        let calls = transport.calls();
        let client = MailClient::from_transport(transport, IO);

        let page = scoped(client, async |c: &mut MailClient<MockTransport>| {
            c.get_mails(MailBox::Inbox, GetMailsOptions::default()).await
        })
        .await
        .unwrap();

        assert_eq!(page.mails.len(), 4);
        assert_eq!(calls.lock().unwrap().end, 1);
    }

    #[tokio::test]
    async fn test_scoped_closes_after_failure() {
        let mut transport = MockTransport::inbox(4);
        transport.fetch_error = Some("[SERVERBUG] oops".to_string());
        let calls = transport.calls();
        let client = MailClient::from_transport(transport, IO);

        let result = scoped(client, async |c: &mut MailClient<MockTransport>| {
            c.get_mails(MailBox::Inbox, GetMailsOptions::default()).await
        })
        .await;

        assert!(matches!(result, Err(Error::Imap(mailfetch_imap::Error::No(_)))));
        assert_eq!(calls.lock().unwrap().end, 1);
    }

    #[tokio::test]
    async fn test_scoped_until_cancels_stalled_fetch() {
        let mut transport = MockTransport::inbox(4);
        transport.hang = Some(Hang::Fetch);
        let calls = transport.calls();
        let client = MailClient::from_transport(transport, IO);

        let (cancel, cancelled) = oneshot::channel::<()>();
        let watcher = {
            let calls = calls.clone();
            async move {
                // Cancel once the fetch has been issued.
                while calls.lock().unwrap().fetch.is_empty() {
                    tokio::task::yield_now().await;
                }
                cancel.send(()).unwrap();
            }
        };

        let request = scoped_until(
            client,
            async move {
                let _ = cancelled.await;
            },
            async |c: &mut MailClient<MockTransport>| {
                c.get_mails(MailBox::Inbox, GetMailsOptions::default()).await
            },
        );
        let (result, ()) = tokio::join!(request, watcher);

        assert!(matches!(result, Err(Error::Cancelled { operation: "request" })));
        let calls = calls.lock().unwrap();
        assert_eq!(calls.fetch.len(), 1);
        assert_eq!(calls.end, 1);
    }

    #[tokio::test]
    async fn test_scoped_until_completes_first() {
        let transport = MockTransport::inbox(2);
        let calls = transport.calls();
        let client = MailClient::from_transport(transport, IO);

        let page = scoped_until(
            client,
            std::future::pending::<()>(),
            async |c: &mut MailClient<MockTransport>| {
                c.get_mails(MailBox::Inbox, GetMailsOptions::default()).await
            },
        )
        .await
        .unwrap();

        assert_eq!(page.pagination.total, 2);
        assert_eq!(calls.lock().unwrap().end, 1);
    }
}
