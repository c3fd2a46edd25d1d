//! MIME message structure and handling.

use std::fmt;

use chrono::{DateTime, FixedOffset};

use crate::address::{Address, parse_address_list};
use crate::content_type::{ContentDisposition, ContentType};
use crate::date::parse_date;
use crate::encoding::{decode_base64, decode_charset, decode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;

/// Multipart nesting deeper than this is rejected.
const MAX_DEPTH: usize = 32;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// One node of the MIME tree.
///
/// Multipart nodes have `parts`; leaves carry their still-encoded `body`.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body as transmitted (raw bytes).
    pub body: Vec<u8>,
    /// Child parts of a multipart node.
    pub parts: Vec<Part>,
}

impl Part {
    /// Creates a leaf part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self {
            headers,
            body,
            parts: Vec::new(),
        }
    }

    fn parse_nested(raw: &[u8], depth: usize) -> Result<Self> {
        let (head, body) = split_head(raw);
        let headers = Headers::parse(&String::from_utf8_lossy(head));
        let mut part = Self::new(headers, body.to_vec());

        let content_type = part.content_type();
        if content_type.is_multipart()
            && let Some(boundary) = content_type.boundary()
        {
            if depth >= MAX_DEPTH {
                return Err(Error::TooDeep { limit: MAX_DEPTH });
            }
            part.parts = split_multipart(body, boundary)
                .into_iter()
                .map(|child| Self::parse_nested(child, depth + 1))
                .collect::<Result<_>>()?;
        }
        Ok(part)
    }

    /// Gets the content type.
    ///
    /// A missing or unparseable header means `text/plain; charset=us-ascii`.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.headers
            .get("content-type")
            .and_then(|value| ContentType::parse(value).ok())
            .unwrap_or_else(ContentType::text_plain)
    }

    /// Gets the content disposition, if the header is present.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.headers
            .get("content-disposition")
            .map(ContentDisposition::parse)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// True for a multipart node.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        !self.parts.is_empty()
    }

    /// Filename from `Content-Disposition`, else the `name` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.disposition()
            .and_then(|d| d.filename().map(str::to_string))
            .or_else(|| self.content_type().name().map(str::to_string))
            .filter(|name| !name.is_empty())
    }

    /// Decodes the body according to the transfer encoding.
    #[must_use]
    pub fn decode_body(&self) -> Vec<u8> {
        match self.transfer_encoding() {
            TransferEncoding::Base64 => decode_base64(&self.body),
            TransferEncoding::QuotedPrintable => decode_quoted_printable(&self.body),
            _ => self.body.clone(),
        }
    }

    /// Gets the decoded body as a string in the part's charset.
    #[must_use]
    pub fn body_text(&self) -> String {
        let content_type = self.content_type();
        decode_charset(&self.decode_body(), content_type.charset().unwrap_or("utf-8"))
    }

    /// A text leaf that belongs to the message body rather than being
    /// attached: `text/plain` or `text/html`, not marked as attachment,
    /// without a filename.
    fn is_body_text(&self, content_type: &ContentType) -> bool {
        (content_type.is("text", "plain") || content_type.is("text", "html"))
            && !self.disposition().is_some_and(|d| d.is_attachment())
            && self.filename().is_none()
    }
}

/// Splits a raw entity at the first empty line.
fn split_head(raw: &[u8]) -> (&[u8], &[u8]) {
    let mut pos = 0;
    while pos < raw.len() {
        let end = raw[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(raw.len(), |i| pos + i);
        let line = &raw[pos..end];
        if line.is_empty() || line == b"\r" {
            return (&raw[..pos], &raw[(end + 1).min(raw.len())..]);
        }
        pos = end + 1;
    }
    (raw, &[])
}

/// Returns the bodies between `--boundary` delimiter lines, stopping at
/// the closing `--boundary--`. The preamble and epilogue are dropped; an
/// unterminated last part runs to the end of the input.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let mut parts = Vec::new();
    let mut current: Option<usize> = None;
    let mut line_start = 0;

    while line_start < body.len() {
        let line_end = body[line_start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(body.len(), |i| line_start + i);
        let line = &body[line_start..line_end];
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        if let Some(tail) = line.strip_prefix(delimiter) {
            let closing = tail.starts_with(b"--");
            if closing || tail.iter().all(u8::is_ascii_whitespace) {
                if let Some(start) = current {
                    // The line break before a delimiter belongs to it.
                    let mut end = line_start;
                    if end > start && body[end - 1] == b'\n' {
                        end -= 1;
                        if end > start && body[end - 1] == b'\r' {
                            end -= 1;
                        }
                    }
                    parts.push(&body[start..end]);
                }
                if closing {
                    return parts;
                }
                current = Some((line_end + 1).min(body.len()));
            }
        }
        line_start = line_end + 1;
    }

    if let Some(start) = current
        && start < body.len()
    {
        parts.push(&body[start..]);
    }
    parts
}

/// Message importance derived from priority headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Priority {
    /// X-Priority 1-2, `Importance: high`, `Priority: urgent`.
    High,
    /// X-Priority 3.
    Normal,
    /// X-Priority 4-5, `Importance: low`, `Priority: non-urgent`.
    Low,
}

impl Priority {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

/// Metadata of one attached part. The content itself is not retained.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Attachment {
    /// Decoded filename, if any.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub filename: Option<String>,
    /// `type/subtype`
    pub content_type: String,
    /// `attachment` or `inline`.
    pub content_disposition: String,
    /// `Content-ID` without angle brackets.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub content_id: Option<String>,
    /// Decoded size in bytes.
    pub size: usize,
    /// Part of a `multipart/related` tree (e.g. an embedded image).
    pub related: bool,
}

/// Body text and attachments collected from the whole tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contents {
    /// All `text/plain` body parts, joined by newlines.
    pub text: Option<String>,
    /// All `text/html` body parts, joined by newlines.
    pub html: Option<String>,
    /// Everything else.
    pub attachments: Vec<Attachment>,
}

/// A parsed RFC 5322 message.
#[derive(Debug, Clone)]
pub struct Message {
    root: Part,
}

impl Message {
    /// Parses a complete message.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, has no header fields, or
    /// nests multiparts too deeply.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::NotAMessage("empty input"));
        }
        let root = Part::parse_nested(raw, 0)?;
        if root.headers.is_empty() {
            return Err(Error::NotAMessage("no header fields"));
        }
        Ok(Self { root })
    }

    /// The top-level entity.
    #[must_use]
    pub const fn root(&self) -> &Part {
        &self.root
    }

    /// Top-level headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.root.headers
    }

    /// Decoded Subject.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.headers().get_decoded("subject")
    }

    /// Message-ID as written, angle brackets included.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers().get("message-id").filter(|v| !v.is_empty())
    }

    /// In-Reply-To as written.
    #[must_use]
    pub fn in_reply_to(&self) -> Option<&str> {
        self.headers().get("in-reply-to").filter(|v| !v.is_empty())
    }

    /// Message IDs listed in References.
    #[must_use]
    pub fn references(&self) -> Vec<String> {
        self.headers()
            .get_all("references")
            .into_iter()
            .flat_map(str::split_whitespace)
            .map(str::to_string)
            .collect()
    }

    /// Parsed Date header.
    #[must_use]
    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        self.headers().get("date").and_then(parse_date)
    }

    /// Addresses in every instance of header `name`.
    #[must_use]
    pub fn addresses(&self, name: &str) -> Vec<Address> {
        self.headers()
            .get_all(name)
            .into_iter()
            .flat_map(parse_address_list)
            .collect()
    }

    /// From addresses.
    #[must_use]
    pub fn from(&self) -> Vec<Address> {
        self.addresses("from")
    }

    /// To addresses.
    #[must_use]
    pub fn to(&self) -> Vec<Address> {
        self.addresses("to")
    }

    /// Priority from `X-Priority`, then `Importance`, then `Priority`.
    #[must_use]
    pub fn priority(&self) -> Option<Priority> {
        let headers = self.headers();
        if let Some(value) = headers.get("x-priority") {
            match value.trim_start().chars().next() {
                Some('1' | '2') => return Some(Priority::High),
                Some('3') => return Some(Priority::Normal),
                Some('4' | '5') => return Some(Priority::Low),
                _ => {}
            }
        }
        if let Some(value) = headers.get("importance") {
            match value.trim().to_ascii_lowercase().as_str() {
                "high" => return Some(Priority::High),
                "normal" => return Some(Priority::Normal),
                "low" => return Some(Priority::Low),
                _ => {}
            }
        }
        headers
            .get("priority")
            .and_then(|value| match value.trim().to_ascii_lowercase().as_str() {
                "urgent" => Some(Priority::High),
                "normal" => Some(Priority::Normal),
                "non-urgent" => Some(Priority::Low),
                _ => None,
            })
    }

    /// Walks the tree and separates body text from attachments.
    #[must_use]
    pub fn contents(&self) -> Contents {
        let mut text = Vec::new();
        let mut html = Vec::new();
        let mut attachments = Vec::new();
        collect(&self.root, false, &mut text, &mut html, &mut attachments);

        let join = |parts: Vec<String>| (!parts.is_empty()).then(|| parts.join("\n"));
        Contents {
            text: join(text),
            html: join(html),
            attachments,
        }
    }
}

fn collect(
    part: &Part,
    related: bool,
    text: &mut Vec<String>,
    html: &mut Vec<String>,
    attachments: &mut Vec<Attachment>,
) {
    let content_type = part.content_type();

    if part.is_multipart() {
        let related = related || content_type.is("multipart", "related");
        for child in &part.parts {
            collect(child, related, text, html, attachments);
        }
        return;
    }

    if part.is_body_text(&content_type) {
        let body = part.body_text();
        if content_type.sub_type == "html" {
            html.push(body);
        } else {
            text.push(body);
        }
        return;
    }

    let disposition = part.disposition();
    attachments.push(Attachment {
        filename: part.filename(),
        content_type: content_type.essence(),
        content_disposition: disposition.map_or_else(|| "attachment".to_string(), |d| d.kind),
        content_id: part.headers.get("content-id").map(|id| {
            id.trim()
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string()
        }),
        size: part.decode_body().len(),
        related,
    });
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

    const SIMPLE: &[u8] = b"From: Alice <alice@example.com>\r\n\
To: bob@example.com, \"Carol\" <carol@example.com>\r\n\
Subject: =?utf-8?Q?Caf=C3=A9?= plans\r\n\
Date: Tue, 05 Mar 2024 10:15:00 +0900\r\n\
Message-ID: <abc@example.com>\r\n\
References: <r1@example.com>\r\n <r2@example.com>\r\n\
X-Priority: 1 (Highest)\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
Caf=C3=A9 at noon?=\r\n\
 Bring the map.\r\n";

    const MIXED: &[u8] = b"From: a@example.com\r\n\
Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
\r\n\
This is the preamble.\r\n\
--outer\r\n\
Content-Type: multipart/alternative; boundary=inner\r\n\
\r\n\
--inner\r\n\
Content-Type: text/plain\r\n\
\r\n\
Plain body\r\n\
--inner\r\n\
Content-Type: text/html\r\n\
\r\n\
<b>HTML body</b>\r\n\
--inner--\r\n\
--outer\r\n\
Content-Type: application/pdf; name=report.pdf\r\n\
Content-Disposition: attachment; filename=\"q1 report.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0xLjQK\r\n\
--outer--\r\n\
Epilogue\r\n";

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("BASE64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_simple_message_headers() {
        let message = Message::parse(SIMPLE).unwrap();
        assert_eq!(message.subject().unwrap(), "Café plans");
        assert_eq!(message.message_id(), Some("<abc@example.com>"));
        assert_eq!(
            message.references(),
            vec!["<r1@example.com>", "<r2@example.com>"]
        );
        assert_eq!(message.priority(), Some(Priority::High));
        assert_eq!(
            message.date().unwrap().timestamp_millis(),
            1_709_601_300_000
        );
        assert_eq!(
            message.from(),
            vec![Address::new("alice@example.com").with_name("Alice")]
        );
        assert_eq!(message.to().len(), 2);
    }

    #[test]
    fn test_simple_message_body() {
        let contents = Message::parse(SIMPLE).unwrap().contents();
        assert_eq!(contents.text.as_deref(), Some("Café at noon? Bring the map.\r\n"));
        assert!(contents.html.is_none());
        assert!(contents.attachments.is_empty());
    }

    #[test]
    fn test_multipart_tree() {
        let message = Message::parse(MIXED).unwrap();
        let root = message.root();
        assert_eq!(root.parts.len(), 2);
        assert_eq!(root.parts[0].parts.len(), 2);
        assert_eq!(root.parts[0].parts[1].body, b"<b>HTML body</b>");
    }

    #[test]
    fn test_multipart_contents() {
        let contents = Message::parse(MIXED).unwrap().contents();
        assert_eq!(contents.text.as_deref(), Some("Plain body"));
        assert_eq!(contents.html.as_deref(), Some("<b>HTML body</b>"));
        assert_eq!(
            contents.attachments,
            vec![Attachment {
                filename: Some("q1 report.pdf".to_string()),
                content_type: "application/pdf".to_string(),
                content_disposition: "attachment".to_string(),
                content_id: None,
                size: 9,
                related: false,
            }]
        );
    }

    #[test]
    fn test_related_inline_image() {
        let raw = b"From: a@example.com\r\n\
Content-Type: multipart/related; boundary=r\r\n\
\r\n\
--r\r\n\
Content-Type: text/html\r\n\
\r\n\
<img src=\"cid:logo\">\r\n\
--r\r\n\
Content-Type: image/png\r\n\
Content-Disposition: inline\r\n\
Content-ID: <logo>\r\n\
\r\n\
PNG\r\n\
--r--\r\n";
        let contents = Message::parse(raw).unwrap().contents();
        assert_eq!(contents.html.as_deref(), Some("<img src=\"cid:logo\">"));
        let image = &contents.attachments[0];
        assert!(image.related);
        assert_eq!(image.content_disposition, "inline");
        assert_eq!(image.content_id.as_deref(), Some("logo"));
        assert_eq!(image.size, 3);
    }

    #[test]
    fn test_text_attachment_is_not_body() {
        let raw = b"From: a@example.com\r\n\
Content-Type: multipart/mixed; boundary=b\r\n\
\r\n\
--b\r\n\
\r\n\
Body without headers\r\n\
--b\r\n\
Content-Type: text/plain; name=notes.txt\r\n\
\r\n\
notes\r\n\
--b--\r\n";
        let contents = Message::parse(raw).unwrap().contents();
        assert_eq!(contents.text.as_deref(), Some("Body without headers"));
        assert_eq!(contents.attachments.len(), 1);
        assert_eq!(contents.attachments[0].filename.as_deref(), Some("notes.txt"));
    }

    #[test]
    fn test_unterminated_multipart() {
        let raw = b"From: a@example.com\r\n\
Content-Type: multipart/mixed; boundary=b\r\n\
\r\n\
--b\r\n\
Content-Type: text/plain\r\n\
\r\n\
cut off";
        let contents = Message::parse(raw).unwrap().contents();
        assert_eq!(contents.text.as_deref(), Some("cut off"));
    }

    #[test]
    fn test_latin1_body() {
        let raw = b"From: a@example.com\r\nContent-Type: text/plain; charset=iso-8859-1\r\n\r\ncaf\xe9";
        let contents = Message::parse(raw).unwrap().contents();
        assert_eq!(contents.text.as_deref(), Some("café"));
    }

    #[test]
    fn test_stray_bytes_in_base64_body_are_skipped() {
        let raw = b"From: a@example.com\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
aGVsbG8!gd29ybGQ=\r\n";
        let contents = Message::parse(raw).unwrap().contents();
        assert_eq!(contents.text.as_deref(), Some("hello world"));
    }

    #[test]
    fn test_undecodable_base64_body_keeps_message() {
        let raw = b"From: a@example.com\r\nContent-Transfer-Encoding: base64\r\n\r\n!!!";
        let contents = Message::parse(raw).unwrap().contents();
        assert_eq!(contents.text.as_deref(), Some(""));
    }

    #[test]
    fn test_windows_1252_body() {
        let raw = b"From: a@example.com\r\n\
Subject: =?windows-1252?Q?=93Quarterly=94_=80?=\r\n\
Content-Type: text/plain; charset=windows-1252\r\n\
\r\n\
\x93hi\x94 \x80";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.subject().as_deref(), Some("\u{201c}Quarterly\u{201d} \u{20ac}"));
        assert_eq!(message.contents().text.as_deref(), Some("\u{201c}hi\u{201d} \u{20ac}"));
    }

    #[test]
    fn test_koi8_r_body() {
        let raw = b"From: a@example.com\r\n\
Subject: =?koi8-r?B?8NLJ18XU?=\r\n\
Content-Type: text/plain; charset=\"KOI8-R\"\r\n\
Content-Transfer-Encoding: 8bit\r\n\
\r\n\
\xf0\xd2\xc9\xd7\xc5\xd4";
        let message = Message::parse(raw).unwrap();
        assert_eq!(message.subject().as_deref(), Some("Привет"));
        assert_eq!(message.contents().text.as_deref(), Some("Привет"));
    }

    #[test]
    fn test_empty_and_headerless_input() {
        assert!(matches!(Message::parse(b""), Err(Error::NotAMessage(_))));
        assert!(matches!(Message::parse(b"\r\n\r\n"), Err(Error::NotAMessage(_))));
        assert!(matches!(
            Message::parse(b"\r\njust a body"),
            Err(Error::NotAMessage(_))
        ));
    }

    #[test]
    fn test_priority_fallbacks() {
        let low = Message::parse(b"Importance: Low\r\n\r\n").unwrap();
        assert_eq!(low.priority(), Some(Priority::Low));
        let urgent = Message::parse(b"Priority: urgent\r\n\r\n").unwrap();
        assert_eq!(urgent.priority(), Some(Priority::High));
        let none = Message::parse(b"Subject: x\r\n\r\n").unwrap();
        assert_eq!(none.priority(), None);
    }

    #[test]
    fn test_nesting_limit() {
        let mut raw = Vec::new();
        for level in 0..=MAX_DEPTH {
            raw.extend_from_slice(
                format!("Content-Type: multipart/mixed; boundary=b{level}\r\n\r\n--b{level}\r\n")
                    .as_bytes(),
            );
        }
        let mut raw_with_from = b"From: a@example.com\r\n".to_vec();
        raw_with_from.extend_from_slice(&raw);
        assert!(matches!(
            Message::parse(&raw_with_from),
            Err(Error::TooDeep { limit: MAX_DEPTH })
        ));
    }
}
