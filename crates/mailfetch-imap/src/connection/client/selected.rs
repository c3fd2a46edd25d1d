//! Sorting, searching, fetching and leaving the selected mailbox.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::authenticated::parse_mailbox_status;
use super::fetched::FetchedMessage;
use super::states::{Authenticated, Selected};
use super::Client;
use crate::command::{Command, FetchItems, SearchKey, SortCriterion, SortKey};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Mailbox, Uid, UidSet};
use crate::{Error, Result};

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Name of the open mailbox.
    #[must_use]
    pub const fn mailbox(&self) -> &Mailbox {
        self.state.mailbox()
    }

    /// Leaves the mailbox with CLOSE, expunging `\Deleted` messages.
    ///
    /// On a read-only mailbox CLOSE never expunges.
    pub async fn close(mut self) -> Result<Client<S, Authenticated>> {
        self.execute(&Command::Close).await?;
        info!(mailbox = %self.state.mailbox, "mailbox closed");
        Ok(self.transition(Authenticated))
    }

    /// Leaves the mailbox with UNSELECT (RFC 3691), never expunging.
    pub async fn unselect(mut self) -> Result<Client<S, Authenticated>> {
        if !self.supports_unselect() {
            return Err(Error::MissingCapability("UNSELECT".to_string()));
        }
        self.execute(&Command::Unselect).await?;
        info!(mailbox = %self.state.mailbox, "mailbox unselected");
        Ok(self.transition(Authenticated))
    }

    /// Leaves the mailbox without expunging.
    ///
    /// Uses UNSELECT when offered. Otherwise a read-write mailbox is first
    /// re-opened with EXAMINE so that the following CLOSE cannot expunge.
    pub async fn close_keep_deleted(mut self) -> Result<Client<S, Authenticated>> {
        if self.supports_unselect() {
            return self.unselect().await;
        }
        if !self.state.is_read_only() {
            let mailbox = self.state.mailbox.clone();
            let responses = self
                .execute(&Command::Examine {
                    mailbox: mailbox.clone(),
                })
                .await?;
            self.state = Selected::new(mailbox, parse_mailbox_status(&responses, true));
        }
        self.close().await
    }

    /// Runs `UID SORT` and returns UIDs in the server's sorted order.
    ///
    /// Without the SORT extension, a program made only of ARRIVAL keys
    /// falls back to `UID SEARCH`: UIDs are assigned in arrival order, so
    /// numeric order is arrival order.
    pub async fn uid_sort(&mut self, keys: &[SortKey], criteria: &[SearchKey]) -> Result<Vec<Uid>> {
        if keys.is_empty() {
            return Err(Error::InvalidState("SORT needs at least one key".to_string()));
        }

        if !self.supports_sort() {
            let arrival_only = keys.iter().all(|k| k.criterion == SortCriterion::Arrival);
            if !arrival_only {
                return Err(Error::MissingCapability("SORT".to_string()));
            }
            debug!("server lacks SORT, ordering SEARCH results by UID");
            let mut uids = self.uid_search(criteria).await?;
            uids.sort_unstable();
            if keys[0].reverse {
                uids.reverse();
            }
            return Ok(uids);
        }

        let responses = self
            .execute(&Command::Sort {
                keys: keys.to_vec(),
                criteria: criteria.to_vec(),
                uid: true,
            })
            .await?;
        collect_uids(&responses, |untagged| match untagged {
            UntaggedResponse::Sort(ids) => Some(ids),
            _ => None,
        })
    }

    /// Runs `UID SEARCH`; an empty criteria list means ALL.
    pub async fn uid_search(&mut self, criteria: &[SearchKey]) -> Result<Vec<Uid>> {
        let responses = self
            .execute(&Command::Search {
                criteria: criteria.to_vec(),
                uid: true,
            })
            .await?;
        collect_uids(&responses, |untagged| match untagged {
            UntaggedResponse::Search(ids) => Some(ids),
            _ => None,
        })
    }

    /// Fetches full messages for `uids`.
    ///
    /// Messages come back in the order the server delivered them, which
    /// need not match `uids`. With `mark_seen` false the body is fetched
    /// with `BODY.PEEK[]` and `\Seen` is left alone.
    pub async fn uid_fetch(&mut self, uids: &[Uid], mark_seen: bool) -> Result<Vec<FetchedMessage>> {
        let Some(set) = UidSet::from_uids(uids) else {
            return Ok(Vec::new());
        };

        let responses = self
            .execute(&Command::UidFetch {
                uids: set.clone(),
                items: FetchItems::full_message(!mark_seen),
            })
            .await?;

        let mut messages: Vec<FetchedMessage> = Vec::with_capacity(uids.len());
        for bytes in &responses {
            let Response::Untagged(UntaggedResponse::Fetch { seq, items }) =
                ResponseParser::parse(bytes)?
            else {
                continue;
            };
            // Unsolicited flag updates for other messages can interleave.
            let Some(uid) = FetchedMessage::uid_of(&items).filter(|uid| set.contains(*uid)) else {
                continue;
            };

            match messages.iter_mut().find(|m| m.uid == uid) {
                Some(message) => message.merge(items),
                None => {
                    let mut message = FetchedMessage::new(seq, uid);
                    message.merge(items);
                    messages.push(message);
                }
            }
        }

        debug!(requested = uids.len(), received = messages.len(), "fetch complete");
        Ok(messages)
    }
}

fn collect_uids(
    responses: &[Vec<u8>],
    pick: impl Fn(UntaggedResponse) -> Option<Vec<u32>>,
) -> Result<Vec<Uid>> {
    let mut uids = Vec::new();
    for bytes in responses {
        if let Response::Untagged(untagged) = ResponseParser::parse(bytes)?
            && let Some(ids) = pick(untagged)
        {
            for id in ids {
                uids.push(Uid::new(id).ok_or_else(|| Error::Protocol("UID 0".to_string()))?);
            }
        }
    }
    Ok(uids)
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
    use crate::command::TagGenerator;
    use crate::connection::framed::FramedStream;
    use crate::types::{Capability, Flag, MailboxStatus};
    use tokio_test::io::Builder;

    fn selected<S>(stream: S, capabilities: Vec<Capability>, read_only: bool) -> Client<S, Selected>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let status = MailboxStatus {
            exists: 4,
            read_only,
            ..MailboxStatus::default()
        };
        Client {
            stream: FramedStream::new(stream),
            tag_gen: TagGenerator::default(),
            capabilities,
            in_flight: false,
            state: Selected::new(Mailbox::inbox(), status),
        }
    }

    fn uids(ids: &[u32]) -> Vec<Uid> {
        ids.iter().map(|&n| Uid::new(n).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_uid_sort() {
        let mock = Builder::new()
            .write(b"A0000 UID SORT (REVERSE ARRIVAL) UTF-8 ALL\r\n")
            .read(b"* SORT 4 3 2 1\r\n")
            .read(b"A0000 OK Sort completed\r\n")
            .build();
        let mut client = selected(mock, vec![Capability::Sort], false);

        let sorted = client
            .uid_sort(&[SortKey::desc(SortCriterion::Arrival)], &[])
            .await
            .unwrap();
        assert_eq!(sorted, uids(&[4, 3, 2, 1]));
    }

    #[tokio::test]
    async fn test_uid_sort_sends_8bit_text_as_literal() {
        let mock = Builder::new()
            .write(b"A0000 UID SORT (REVERSE ARRIVAL) UTF-8 SUBJECT {5}\r\n")
            .read(b"+ Ready for literal data\r\n")
            .write("Café\r\n".as_bytes())
            .read(b"* SORT 3 1\r\n")
            .read(b"A0000 OK Sort completed\r\n")
            .build();
        let mut client = selected(mock, vec![Capability::Sort], false);

        let sorted = client
            .uid_sort(
                &[SortKey::desc(SortCriterion::Arrival)],
                &[SearchKey::Subject("Café".into())],
            )
            .await
            .unwrap();
        assert_eq!(sorted, uids(&[3, 1]));
        assert!(!client.in_flight);
    }

    #[tokio::test]
    async fn test_literal_refused_before_continuation() {
        let mock = Builder::new()
            .write(b"A0000 UID SEARCH CHARSET UTF-8 FROM {7}\r\n")
            .read(b"A0000 NO Charset not supported\r\n")
            .build();
        let mut client = selected(mock, Vec::new(), false);

        let err = client
            .uid_search(&[SearchKey::From("Jürgen".into())])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::No(_)));
        assert!(!client.in_flight);
    }

    #[tokio::test]
    async fn test_uid_sort_empty_mailbox() {
        let mock = Builder::new()
            .write(b"A0000 UID SORT (REVERSE ARRIVAL) UTF-8 ALL\r\n")
            .read(b"* SORT\r\n")
            .read(b"A0000 OK Sort completed\r\n")
            .build();
        let mut client = selected(mock, vec![Capability::Sort], false);

        let sorted = client
            .uid_sort(&[SortKey::desc(SortCriterion::Arrival)], &[SearchKey::All])
            .await
            .unwrap();
        assert!(sorted.is_empty());
    }

    #[tokio::test]
    async fn test_uid_sort_falls_back_to_search() {
        let mock = Builder::new()
            .write(b"A0000 UID SEARCH CHARSET UTF-8 UNSEEN\r\n")
            .read(b"* SEARCH 2 9 5\r\n")
            .read(b"A0000 OK Search completed\r\n")
            .build();
        let mut client = selected(mock, Vec::new(), false);

        let sorted = client
            .uid_sort(&[SortKey::desc(SortCriterion::Arrival)], &[SearchKey::Unseen])
            .await
            .unwrap();
        assert_eq!(sorted, uids(&[9, 5, 2]));
    }

    #[tokio::test]
    async fn test_uid_sort_without_capability() {
        let mock = Builder::new().build();
        let mut client = selected(mock, Vec::new(), false);

        let err = client
            .uid_sort(&[SortKey::asc(SortCriterion::Subject)], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingCapability(_)));
    }

    #[tokio::test]
    async fn test_uid_sort_server_error() {
        let mock = Builder::new()
            .write(b"A0000 UID SORT (REVERSE ARRIVAL) UTF-8 ALL\r\n")
            .read(b"A0000 BAD Invalid search\r\n")
            .build();
        let mut client = selected(mock, vec![Capability::Sort], false);

        let err = client
            .uid_sort(&[SortKey::desc(SortCriterion::Arrival)], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Bad(_)));
        assert!(!client.is_in_flight());
    }

    #[tokio::test]
    async fn test_uid_fetch_keeps_delivery_order() {
        let mock = Builder::new()
            .write(b"A0000 UID FETCH 1:4 (UID FLAGS INTERNALDATE RFC822.SIZE BODYSTRUCTURE BODY.PEEK[])\r\n")
            .read(b"* 2 FETCH (UID 2 FLAGS () BODY[] {3}\r\nabc)\r\n")
            .read(b"* 4 FETCH (UID 4 FLAGS (\\Seen) BODY[] {3}\r\ndef)\r\n")
            .read(b"* 1 FETCH (UID 1 FLAGS () BODY[] {3}\r\nghi)\r\n")
            .read(b"* 3 FETCH (UID 3 FLAGS () BODY[] {3}\r\njkl)\r\n")
            .read(b"* 7 FETCH (FLAGS (\\Deleted))\r\n")
            .read(b"A0000 OK Fetch completed\r\n")
            .build();
        let mut client = selected(mock, vec![Capability::Sort], false);

        let messages = client.uid_fetch(&uids(&[4, 3, 2, 1]), false).await.unwrap();
        let order: Vec<u32> = messages.iter().map(|m| m.uid.get()).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
        assert_eq!(messages[1].flags, vec![Flag::Seen]);
        assert_eq!(messages[3].body.as_deref(), Some(&b"jkl"[..]));
    }

    #[tokio::test]
    async fn test_uid_fetch_mark_seen() {
        let mock = Builder::new()
            .write(b"A0000 UID FETCH 5 (UID FLAGS INTERNALDATE RFC822.SIZE BODYSTRUCTURE BODY[])\r\n")
            .read(b"A0000 OK Fetch completed\r\n")
            .build();
        let mut client = selected(mock, Vec::new(), false);
        assert!(client.uid_fetch(&uids(&[5]), true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_uid_fetch_empty_sends_nothing() {
        let mock = Builder::new().build();
        let mut client = selected(mock, Vec::new(), false);
        assert!(client.uid_fetch(&[], false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close() {
        let mock = Builder::new()
            .write(b"A0000 CLOSE\r\n")
            .read(b"A0000 OK Close completed\r\n")
            .build();
        let client = selected(mock, Vec::new(), false);
        assert!(client.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_close_keep_deleted_prefers_unselect() {
        let mock = Builder::new()
            .write(b"A0000 UNSELECT\r\n")
            .read(b"A0000 OK Unselect completed\r\n")
            .build();
        let client = selected(mock, vec![Capability::Unselect], false);
        assert!(client.close_keep_deleted().await.is_ok());
    }

    #[tokio::test]
    async fn test_close_keep_deleted_reexamines() {
        let mock = Builder::new()
            .write(b"A0000 EXAMINE INBOX\r\n")
            .read(b"A0000 OK [READ-ONLY] done\r\n")
            .write(b"A0001 CLOSE\r\n")
            .read(b"A0001 OK done\r\n")
            .build();
        let client = selected(mock, Vec::new(), false);
        assert!(client.close_keep_deleted().await.is_ok());
    }

    #[tokio::test]
    async fn test_close_keep_deleted_read_only() {
        let mock = Builder::new()
            .write(b"A0000 CLOSE\r\n")
            .read(b"A0000 OK done\r\n")
            .build();
        let client = selected(mock, Vec::new(), true);
        assert!(client.close_keep_deleted().await.is_ok());
    }
}
