//! # mailfetch-imap
//!
//! The IMAP4rev1 subset a read-only mail fetcher needs: implicit TLS or
//! opportunistic STARTTLS, XOAUTH2 authentication, SELECT/EXAMINE,
//! `UID SORT` (RFC 5256) with a `UID SEARCH` fallback, `UID FETCH` of whole
//! messages, CLOSE/UNSELECT and LOGOUT.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailfetch_imap::{Config, Mailbox, Session, SortKey, SortCriterion};
//!
//! #[tokio::main]
//! async fn main() -> mailfetch_imap::Result<()> {
//!     let mut session = Session::new(Config::new("imap.gmail.com", 993));
//!     session.connect("user@example.com", "ya29.token").await?;
//!
//!     let status = session.open_mailbox(Mailbox::inbox(), true).await?;
//!     println!("{} messages", status.exists());
//!
//!     let uids = session
//!         .uid_sort(&[SortKey::desc(SortCriterion::Arrival)], &[])
//!         .await?;
//!     let page = &uids[..uids.len().min(10)];
//!     for message in session.uid_fetch(page, false).await? {
//!         println!("{} {} bytes", message.uid, message.body.map_or(0, |b| b.len()));
//!     }
//!
//!     session.close_mailbox(false).await?;
//!     session.logout().await
//! }
//! ```
//!
//! ## Connection States
//!
//! [`Client`] enforces valid transitions at compile time:
//!
//! ```text
//! NotAuthenticated ── authenticate_xoauth2() ──→ Authenticated
//! Authenticated    ── select()/examine() ──────→ Selected
//! Selected         ── close()/unselect() ──────→ Authenticated
//! ```
//!
//! [`Session`] wraps the same client for callers that need to hold a
//! connection in a struct and query its state at runtime.
//!
//! ## Modules
//!
//! - [`command`]: command builders and argument types
//! - [`connection`]: streams, framing, the type-state client and sessions
//! - [`parser`]: sans-I/O response parser
//! - [`sasl`]: XOAUTH2 initial response
//! - [`types`]: protocol value types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod sasl;
pub mod types;

pub use command::{
    Command, FetchAttribute, FetchItems, SearchKey, SortCriterion, SortKey, TagGenerator,
    UnknownSortKey,
};
pub use connection::{
    Authenticated, Client, Config, ConfigBuilder, ConnectionState, FetchedMessage, FramedStream,
    IMAP_PORT, IMAPS_PORT, ImapStream, NotAuthenticated, ResponseAccumulator, Security, Selected,
    Session,
};
pub use error::{Error, Result};
pub use parser::{BodyStructure, FetchItem, Response, ResponseParser, UntaggedResponse};
pub use types::{
    Capability, Flag, Flags, Mailbox, MailboxStatus, ResponseCode, SeqNum, Status, Uid, UidSet,
    UidValidity,
};

/// IMAP protocol revision spoken.
pub const IMAP_VERSION: &str = "IMAP4rev1";
