//! In-memory [`Transport`] that records every call.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mailfetch_imap::{ConnectionState, Error as ImapError, FetchedMessage, SearchKey, SeqNum, SortKey, Uid};

use crate::transport::{SelectedBox, Transport};
use crate::Result;

/// Everything the client asked the transport to do.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Calls {
    pub open: Vec<(String, bool)>,
    pub close: Vec<bool>,
    pub sort: Vec<(Vec<SortKey>, Vec<SearchKey>)>,
    pub fetch: Vec<(Vec<u32>, Option<bool>)>,
    pub end: usize,
}

/// Operation that never completes, for timeout and cancellation tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hang {
    Open,
    Sort,
    Fetch,
}

#[derive(Debug)]
pub struct MockTransport {
    /// Mailbox name to message count.
    pub boxes: HashMap<String, u32>,
    /// What SORT answers.
    pub sorted: Vec<u32>,
    /// Raw message per UID.
    pub messages: HashMap<u32, String>,
    /// Order in which FETCH delivers messages; requested order reversed when unset.
    pub delivery: Option<Vec<u32>>,
    /// Error FETCH fails with.
    pub fetch_error: Option<String>,
    pub hang: Option<Hang>,
    pub calls: Arc<Mutex<Calls>>,
    state: ConnectionState,
    open: Option<String>,
}

impl MockTransport {
    /// `INBOX` with UIDs 1..=count, sorted newest first.
    pub fn inbox(count: u32) -> Self {
        let messages = (1..=count).map(|uid| (uid, sample_message(uid))).collect();
        Self {
            boxes: HashMap::from([
                ("INBOX".to_string(), count),
                ("Sent".to_string(), 0),
                ("Junk".to_string(), 0),
            ]),
            sorted: (1..=count).rev().collect(),
            messages,
            delivery: None,
            fetch_error: None,
            hang: None,
            calls: Arc::default(),
            state: ConnectionState::Authenticated,
            open: None,
        }
    }

    /// Handle to the call log that outlives the transport.
    pub fn calls(&self) -> Arc<Mutex<Calls>> {
        Arc::clone(&self.calls)
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Calls> {
        self.calls.lock().unwrap()
    }

    async fn maybe_hang(&self, op: Hang) {
        if self.hang == Some(op) {
            std::future::pending::<()>().await;
        }
    }
}

/// A small RFC 5322 message whose subject names its UID.
pub fn sample_message(uid: u32) -> String {
    format!(
        "Message-ID: <{uid}@example.com>\r\n\
         Date: Tue, 5 Mar 2024 0{h}:00:00 +0000\r\n\
         From: Sender {uid} <sender{uid}@example.com>\r\n\
         To: me@example.com\r\n\
         Subject: message {uid}\r\n\
         \r\n\
         body of {uid}\r\n",
        h = uid % 10
    )
}

impl Transport for MockTransport {
    async fn open_box(&mut self, name: &str, read_only: bool) -> Result<SelectedBox> {
        self.log().open.push((name.to_string(), read_only));
        self.maybe_hang(Hang::Open).await;
        if self.open.is_some() {
            return Err(ImapError::InvalidState("a mailbox is already open".into()).into());
        }
        let total = *self
            .boxes
            .get(name)
            .ok_or_else(|| ImapError::No("[NONEXISTENT] Unknown Mailbox".into()))?;
        self.open = Some(name.to_string());
        Ok(SelectedBox {
            name: name.to_string(),
            total,
            flags: vec!["\\Seen".to_string(), "\\Deleted".to_string()],
            uid_validity: Some(1),
            highest_mod_seq: None,
            read_only,
        })
    }

    async fn close_box(&mut self, auto_expunge: bool) -> Result<()> {
        self.log().close.push(auto_expunge);
        if self.open.take().is_none() {
            return Err(ImapError::InvalidState("no mailbox is open".into()).into());
        }
        Ok(())
    }

    async fn sort(&mut self, sort: &[SortKey], search: &[SearchKey]) -> Result<Vec<Uid>> {
        self.log().sort.push((sort.to_vec(), search.to_vec()));
        self.maybe_hang(Hang::Sort).await;
        Ok(self.sorted.iter().filter_map(|&n| Uid::new(n)).collect())
    }

    async fn fetch(&mut self, uids: &[Uid], mark_seen: Option<bool>) -> Result<Vec<FetchedMessage>> {
        let requested: Vec<u32> = uids.iter().map(|u| u.get()).collect();
        self.log().fetch.push((requested.clone(), mark_seen));
        self.maybe_hang(Hang::Fetch).await;
        if let Some(text) = &self.fetch_error {
            return Err(ImapError::No(text.clone()).into());
        }

        let order = self
            .delivery
            .clone()
            .unwrap_or_else(|| requested.iter().rev().copied().collect());
        Ok(order
            .into_iter()
            .filter(|uid| requested.contains(uid))
            .filter_map(|uid| {
                let raw = self.messages.get(&uid)?;
                let mut message = FetchedMessage::new(SeqNum::new(uid)?, Uid::new(uid)?);
                message.internal_date = Some("05-Mar-2024 10:15:00 +0000".to_string());
                message.body = Some(raw.as_bytes().to_vec());
                Some(message)
            })
            .collect())
    }

    async fn end(&mut self) -> Result<()> {
        self.log().end += 1;
        self.open = None;
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    fn connection_state(&self) -> ConnectionState {
        self.state
    }
}
