//! Integration tests for the IMAP client.
//!
//! These tests use a mock stream to simulate IMAP server responses
//! without requiring a real server connection.

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailfetch_imap::sasl::xoauth2_response;
use mailfetch_imap::{
    Capability, Client, Error, Flag, Mailbox, Response, ResponseParser, SearchKey, SortCriterion,
    SortKey, Uid, UntaggedResponse,
};

/// Mock stream that returns predefined responses.
struct MockStream {
    /// Responses to return (in order).
    responses: Cursor<Vec<u8>>,
    /// Commands written by the client, shared with the test.
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.responses.get_ref();
        let pos = self.responses.position() as usize;

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn sent_lines(sent: &Arc<Mutex<Vec<u8>>>) -> Vec<String> {
    String::from_utf8(sent.lock().unwrap().clone())
        .unwrap()
        .split("\r\n")
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn uids(values: &[u32]) -> Vec<Uid> {
    values.iter().map(|&v| Uid::new(v).unwrap()).collect()
}

const GREETING: &[u8] =
    b"* OK [CAPABILITY IMAP4rev1 SASL-IR AUTH=XOAUTH2 SORT UNSELECT] Gimap ready\r\n";

#[tokio::test]
async fn test_page_of_newest_messages() {
    let message = b"From: a@example.com\r\nSubject: hi\r\n\r\nbody\r\n";
    let mut server = Vec::new();
    server.extend_from_slice(GREETING);
    server.extend_from_slice(
        b"A0000 OK [CAPABILITY IMAP4rev1 SORT UNSELECT] user authenticated (Success)\r\n",
    );
    server.extend_from_slice(
        b"* FLAGS (\\Answered \\Flagged \\Draft \\Deleted \\Seen)\r\n\
          * OK [PERMANENTFLAGS ()] Flags permitted.\r\n\
          * OK [UIDVALIDITY 3] UIDs valid.\r\n\
          * 4 EXISTS\r\n\
          * 0 RECENT\r\n\
          * OK [UIDNEXT 12] Predicted next UID.\r\n\
          A0001 OK [READ-ONLY] INBOX selected. (Success)\r\n",
    );
    server.extend_from_slice(b"* SORT 11 9 4 2\r\nA0002 OK SORT completed\r\n");
    for (seq, uid) in [(3u32, 9u32), (4, 11)] {
        server.extend_from_slice(
            format!(
                "* {seq} FETCH (UID {uid} FLAGS () INTERNALDATE \"05-Mar-2024 10:15:00 +0000\" \
                 RFC822.SIZE {} BODY[] {{{}}}\r\n",
                message.len(),
                message.len()
            )
            .as_bytes(),
        );
        server.extend_from_slice(message);
        server.extend_from_slice(b")\r\n");
    }
    server.extend_from_slice(b"A0003 OK Success\r\n");
    server.extend_from_slice(b"A0004 OK Returned to authenticated state. (Success)\r\n");
    server.extend_from_slice(b"* BYE LOGOUT Requested\r\nA0005 OK 73 good day (Success)\r\n");

    let (stream, sent) = MockStream::new(&server);
    let client = Client::from_stream(stream).await.unwrap();
    assert!(client.supports_sasl_ir());

    let client = client
        .authenticate_xoauth2("user@example.com", "ya29.token")
        .await
        .unwrap();
    assert!(client.has_capability(&Capability::Sort));

    let mut client = client.examine(Mailbox::inbox()).await.unwrap();
    assert_eq!(client.state().exists(), 4);
    assert!(client.state().is_read_only());
    assert_eq!(client.state().uid_validity().map(|v| v.get()), Some(3));

    let sorted = client
        .uid_sort(&[SortKey::desc(SortCriterion::Arrival)], &[])
        .await
        .unwrap();
    assert_eq!(sorted, uids(&[11, 9, 4, 2]));

    let messages = client.uid_fetch(&sorted[..2], false).await.unwrap();
    let fetched: Vec<u32> = messages.iter().map(|m| m.uid.get()).collect();
    assert_eq!(fetched, vec![9, 11]);
    assert_eq!(messages[0].body.as_deref(), Some(&message[..]));
    assert_eq!(
        messages[0].internal_date.as_deref(),
        Some("05-Mar-2024 10:15:00 +0000")
    );

    let client = client.close_keep_deleted().await.unwrap();
    client.logout().await.unwrap();

    let blob = xoauth2_response("user@example.com", "ya29.token");
    assert_eq!(
        sent_lines(&sent),
        vec![
            format!("A0000 AUTHENTICATE XOAUTH2 {blob}"),
            "A0001 EXAMINE INBOX".to_string(),
            "A0002 UID SORT (REVERSE ARRIVAL) UTF-8 ALL".to_string(),
            "A0003 UID FETCH 9,11 (UID FLAGS INTERNALDATE RFC822.SIZE BODYSTRUCTURE BODY.PEEK[])"
                .to_string(),
            "A0004 UNSELECT".to_string(),
            "A0005 LOGOUT".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_search_criteria_reach_the_sort_command() {
    let mut server = Vec::new();
    server.extend_from_slice(GREETING);
    server.extend_from_slice(b"A0000 OK authenticated\r\n");
    server.extend_from_slice(b"* 2 EXISTS\r\nA0001 OK [READ-WRITE] selected\r\n");
    server.extend_from_slice(b"* SORT\r\nA0002 OK SORT completed\r\n");

    let (stream, sent) = MockStream::new(&server);
    let client = Client::from_stream(stream)
        .await
        .unwrap()
        .authenticate_xoauth2("u", "t")
        .await
        .unwrap();
    let mut client = client.select(Mailbox::inbox()).await.unwrap();
    assert!(!client.state().is_read_only());

    let sorted = client
        .uid_sort(
            &[SortKey::asc(SortCriterion::Date)],
            &[SearchKey::Unseen, SearchKey::From("boss".into())],
        )
        .await
        .unwrap();
    assert!(sorted.is_empty());
    assert_eq!(
        sent_lines(&sent)[2],
        "A0002 UID SORT (DATE) UTF-8 UNSEEN FROM boss"
    );
}

#[tokio::test]
async fn test_rejected_token_surfaces_as_auth_error() {
    let mut server = Vec::new();
    server.extend_from_slice(GREETING);
    server.extend_from_slice(b"+ eyJzdGF0dXMiOiI0MDAiLCJzY2hlbWVzIjoiQmVhcmVyIn0=\r\n");
    server.extend_from_slice(b"A0000 NO [AUTHENTICATIONFAILED] Invalid credentials (Failure)\r\n");

    let (stream, sent) = MockStream::new(&server);
    let client = Client::from_stream(stream).await.unwrap();
    let err = client
        .authenticate_xoauth2("user@example.com", "expired")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Auth(ref text) if text.contains("Invalid credentials")));
    // The error challenge is answered with an empty line.
    assert!(sent.lock().unwrap().ends_with(b"\r\n\r\n"));
}

#[tokio::test]
async fn test_greeting_bye() {
    let (stream, _) = MockStream::new(b"* BYE too many connections\r\n");
    let err = Client::from_stream(stream).await.unwrap_err();
    assert!(matches!(err, Error::Bye(_)));
}

#[test]
fn test_parser_fetch_with_flags() {
    let response = b"* 12 FETCH (UID 42 FLAGS (\\Seen $Important))\r\n";
    let Response::Untagged(UntaggedResponse::Fetch { seq, items }) =
        ResponseParser::parse(response).unwrap()
    else {
        panic!("expected FETCH");
    };
    assert_eq!(seq.get(), 12);
    assert_eq!(items.len(), 2);
    assert!(matches!(
        &items[1],
        mailfetch_imap::FetchItem::Flags(flags)
            if flags == &vec![Flag::Seen, Flag::Keyword("$Important".to_string())]
    ));
}

#[test]
fn test_capability_parsing() {
    assert!(matches!(Capability::parse("IMAP4rev1"), Capability::Imap4Rev1));
    assert!(matches!(Capability::parse("SASL-IR"), Capability::SaslIr));
    assert!(matches!(Capability::parse("SORT"), Capability::Sort));

    match Capability::parse("AUTH=XOAUTH2") {
        Capability::Auth(mech) => assert_eq!(mech, "XOAUTH2"),
        _ => panic!("Expected AUTH capability"),
    }
}
