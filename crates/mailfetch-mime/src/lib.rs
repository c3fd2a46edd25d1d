//! # mailfetch-mime
//!
//! Parsing for messages fetched over IMAP: RFC 5322 headers, MIME trees
//! and the bits a mail listing needs from them.
//!
//! ## Features
//!
//! - **Message parsing**: recursive multipart trees with preamble/epilogue
//!   handling and a nesting limit
//! - **Decoding**: Base64, Quoted-Printable, RFC 2047 encoded words,
//!   RFC 2231 parameters, UTF-8 and Latin-1 charsets
//! - **Addresses**: display names, quoted names, comments and groups
//! - **Body selection**: text and HTML bodies separated from attachments
//! - **Rendering**: plain text to linkified HTML
//!
//! ## Quick Start
//!
//! ```
//! use mailfetch_mime::{Message, text_to_html};
//!
//! let raw = b"From: Alice <alice@example.com>\r\n\
//!             Subject: =?utf-8?Q?Caf=C3=A9?=\r\n\
//!             \r\n\
//!             See https://example.com\r\n";
//!
//! let message = Message::parse(raw)?;
//! assert_eq!(message.subject().as_deref(), Some("Café"));
//! assert_eq!(message.from()[0].name.as_deref(), Some("Alice"));
//!
//! let contents = message.contents();
//! let html = text_to_html(contents.text.as_deref().unwrap_or_default());
//! assert!(html.contains("<a href=\"https://example.com\">"));
//! # Ok::<(), mailfetch_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod content_type;
mod date;
mod error;
mod header;
mod html;
mod message;

pub mod encoding;

pub use address::{Address, parse_address_list};
pub use content_type::{ContentDisposition, ContentType};
pub use date::parse_date;
pub use error::{Error, Result};
pub use header::Headers;
pub use html::text_to_html;
pub use message::{Attachment, Contents, Message, Part, Priority, TransferEncoding};
