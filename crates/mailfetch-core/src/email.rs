//! Turning a fetched message into a [`ReceivedEmail`].

use chrono::DateTime;
use mailfetch_imap::FetchedMessage;
use mailfetch_mime::{Address, Attachment, Message, Priority, text_to_html};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::mailbox::MailBox;
use crate::{Error, Result};

/// `INTERNALDATE` layout, e.g. `05-Mar-2024 10:15:00 +0000`.
const INTERNAL_DATE_FORMAT: &str = "%d-%b-%Y %H:%M:%S %z";

/// Kind of body carried in [`Content`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Plain text.
    Text,
    /// HTML, either from the message or rendered from its text.
    Html,
}

/// The one body shown for a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// `text` or `html`.
    #[serde(rename = "type")]
    pub kind: ContentKind,
    /// The body itself.
    pub source: String,
}

impl Content {
    /// HTML when the message has any, else its text rendered as HTML,
    /// else empty text. Whitespace-only bodies count as absent.
    #[must_use]
    pub fn select(html: Option<String>, text: Option<String>) -> Self {
        let present = |body: &String| !body.trim().is_empty();
        match (html.filter(present), text.filter(present)) {
            (Some(source), _) => Self {
                kind: ContentKind::Html,
                source,
            },
            (None, Some(text)) => Self {
                kind: ContentKind::Html,
                source: text_to_html(&text),
            },
            (None, None) => Self {
                kind: ContentKind::Text,
                source: String::new(),
            },
        }
    }
}

/// A parsed message, ready to hand to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedEmail {
    /// Message UID in its mailbox.
    pub uid: u32,
    /// Mailbox it was fetched from.
    pub mail_box: MailBox,
    /// Flags after the fetch.
    pub flags: Vec<String>,
    /// `Message-ID` as written, empty when absent.
    pub message_id: String,
    /// Decoded subject, empty when absent.
    pub subject: String,
    /// First `From` address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// `To` addresses.
    pub to: Vec<Address>,
    /// `Cc` addresses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<Address>,
    /// `Bcc` addresses; servers usually strip these.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<Address>,
    /// First `Reply-To` address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Address>,
    /// `In-Reply-To` message id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    /// `References` message ids, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    /// Importance from the priority headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Attachment metadata.
    pub attachments: Vec<Attachment>,
    /// Body to display.
    pub content: Content,
    /// Unix epoch milliseconds: the `Date` header, else `INTERNALDATE`.
    pub timestamp: i64,
}

/// Parses a fetched message.
///
/// # Errors
///
/// Returns [`Error::Parse`] when the body is missing or is not a message.
pub fn parse_email(mail_box: MailBox, fetched: FetchedMessage) -> Result<ReceivedEmail> {
    let uid = fetched.uid.get();
    let parse_error = |source| Error::Parse { uid, source };

    let raw = fetched.body.unwrap_or_default();
    let message = Message::parse(&raw).map_err(parse_error)?;
    let contents = message.contents();

    let timestamp = message
        .date()
        .map(|date| date.timestamp_millis())
        .or_else(|| fetched.internal_date.as_deref().and_then(internal_date_millis))
        .unwrap_or_else(|| {
            warn!(uid, mailbox = %mail_box, "message has no usable date");
            0
        });

    Ok(ReceivedEmail {
        uid,
        mail_box,
        flags: fetched.flags.iter().map(|f| f.as_str().to_string()).collect(),
        message_id: message.message_id().unwrap_or_default().to_string(),
        subject: message.subject().unwrap_or_default(),
        from: message.from().into_iter().next(),
        to: message.to(),
        cc: message.addresses("Cc"),
        bcc: message.addresses("Bcc"),
        reply_to: message.addresses("Reply-To").into_iter().next(),
        in_reply_to: message.in_reply_to().map(str::to_string),
        references: message.references(),
        priority: message.priority(),
        attachments: contents.attachments,
        content: Content::select(contents.html, contents.text),
        timestamp,
    })
}

fn internal_date_millis(value: &str) -> Option<i64> {
    DateTime::parse_from_str(value.trim(), INTERNAL_DATE_FORMAT)
        .ok()
        .map(|date| date.timestamp_millis())
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
    use mailfetch_imap::{Flag, SeqNum, Uid};

    use super::*;

    fn fetched(uid: u32, raw: &str) -> FetchedMessage {
        let mut message = FetchedMessage::new(SeqNum::new(uid).unwrap(), Uid::new(uid).unwrap());
        message.flags = vec![Flag::Seen];
        message.internal_date = Some("05-Mar-2024 10:15:00 +0000".to_string());
        message.body = Some(raw.as_bytes().to_vec());
        message
    }

    const PLAIN: &str = "Message-ID: <abc@example.com>\r\n\
        Date: Tue, 5 Mar 2024 01:15:00 +0000\r\n\
        From: \"Alice Example\" <alice@example.com>\r\n\
        To: bob@example.com, Carol <carol@example.com>\r\n\
        Cc: dave@example.com\r\n\
        Reply-To: replies@example.com\r\n\
        In-Reply-To: <parent@example.com>\r\n\
        References: <root@example.com> <parent@example.com>\r\n\
        X-Priority: 1 (Highest)\r\n\
        Subject: =?UTF-8?Q?Caf=C3=A9?= plans\r\n\
        \r\n\
        See https://example.com/menu.\r\n";

    #[test]
    fn test_parse_plain_message() {
        let email = parse_email(MailBox::Inbox, fetched(4, PLAIN)).unwrap();

        assert_eq!(email.uid, 4);
        assert_eq!(email.mail_box, MailBox::Inbox);
        assert_eq!(email.flags, vec!["\\Seen"]);
        assert_eq!(email.message_id, "<abc@example.com>");
        assert_eq!(email.subject, "Café plans");
        assert_eq!(
            email.from,
            Some(Address::new("alice@example.com").with_name("Alice Example"))
        );
        assert_eq!(email.to.len(), 2);
        assert_eq!(email.cc, vec![Address::new("dave@example.com")]);
        assert!(email.bcc.is_empty());
        assert_eq!(email.reply_to, Some(Address::new("replies@example.com")));
        assert_eq!(email.in_reply_to.as_deref(), Some("<parent@example.com>"));
        assert_eq!(email.references.len(), 2);
        assert_eq!(email.priority, Some(Priority::High));
        assert_eq!(email.timestamp, 1_709_601_300_000);
    }

    #[test]
    fn test_text_only_is_rendered_as_html() {
        let email = parse_email(MailBox::Inbox, fetched(4, PLAIN)).unwrap();
        assert_eq!(email.content.kind, ContentKind::Html);
        assert!(email.content.source.contains("<a href=\"https://example.com/menu\">"));
    }

    #[test]
    fn test_html_is_preferred() {
        let raw = "From: a@example.com\r\n\
            Content-Type: multipart/alternative; boundary=\"b\"\r\n\
            \r\n\
            --b\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            plain body\r\n\
            --b\r\n\
            Content-Type: text/html\r\n\
            \r\n\
            <p>html body</p>\r\n\
            --b--\r\n";
        let email = parse_email(MailBox::Inbox, fetched(2, raw)).unwrap();
        assert_eq!(email.content.kind, ContentKind::Html);
        assert_eq!(email.content.source, "<p>html body</p>");
    }

    #[test]
    fn test_no_body_is_empty_text() {
        assert_eq!(
            Content::select(None, None),
            Content {
                kind: ContentKind::Text,
                source: String::new()
            }
        );
    }

    #[test]
    fn test_blank_bodies_are_absent() {
        let empty = Content {
            kind: ContentKind::Text,
            source: String::new(),
        };
        assert_eq!(Content::select(None, Some(String::new())), empty);
        assert_eq!(Content::select(Some(" \r\n".into()), Some("\r\n".into())), empty);
        assert_eq!(
            Content::select(Some(String::new()), Some("hi".into())).kind,
            ContentKind::Html
        );
    }

    #[test]
    fn test_malformed_base64_body_still_parses() {
        let raw = "From: a@example.com\r\n\
            Content-Type: text/plain; charset=utf-8\r\n\
            Content-Transfer-Encoding: base64\r\n\
            \r\n\
            aGVsbG8!gd29ybGQ=\r\n";
        let email = parse_email(MailBox::Inbox, fetched(5, raw)).unwrap();
        assert_eq!(email.content.source, "<p>hello world</p>");
    }

    #[test]
    fn test_missing_headers_use_defaults() {
        let email = parse_email(MailBox::Sent, fetched(7, "X-Mailer: test\r\n\r\nhello\r\n")).unwrap();
        assert_eq!(email.message_id, "");
        assert_eq!(email.subject, "");
        assert_eq!(email.from, None);
        assert!(email.to.is_empty());
        assert_eq!(email.priority, None);
    }

    #[test]
    fn test_timestamp_falls_back_to_internal_date() {
        let email = parse_email(MailBox::Inbox, fetched(3, "Subject: undated\r\n\r\nx\r\n")).unwrap();
        assert_eq!(email.timestamp, 1_709_633_700_000);
    }

    #[test]
    fn test_internal_date_with_padded_day() {
        assert_eq!(
            internal_date_millis(" 5-Mar-2024 10:15:00 +0000"),
            Some(1_709_633_700_000)
        );
        assert_eq!(internal_date_millis("yesterday"), None);
    }

    #[test]
    fn test_missing_body_is_a_parse_error() {
        let mut message = fetched(9, "");
        message.body = None;
        let err = parse_email(MailBox::Inbox, message).unwrap_err();
        assert!(matches!(err, Error::Parse { uid: 9, .. }));
    }

    #[test]
    fn test_json_shape() {
        let email = parse_email(MailBox::Inbox, fetched(4, PLAIN)).unwrap();
        let json = serde_json::to_value(&email).unwrap();
        assert_eq!(json["mailBox"], "INBOX");
        assert_eq!(json["messageId"], "<abc@example.com>");
        assert_eq!(json["from"]["name"], "Alice Example");
        assert_eq!(json["replyTo"]["address"], "replies@example.com");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["content"]["type"], "html");
        assert_eq!(json["timestamp"], 1_709_601_300_000_i64);
        assert!(json.get("bcc").is_none());
    }
}
