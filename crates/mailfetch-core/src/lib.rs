//! # mailfetch-core
//!
//! Paginated, ordered mailbox retrieval over one authenticated IMAP
//! connection.
//!
//! This crate provides:
//! - [`MailClient`]: select, sort, fetch and parse in one request/response API
//! - Pagination over the server-sorted UID list
//! - [`ReceivedEmail`], the parsed form handed to callers
//! - Startup configuration from the environment
//! - [`scoped`] / [`scoped_until`], which close the connection on exit
//!
//! ```no_run
//! use mailfetch_core::{Credential, GetMailsOptions, ImapConfig, MailBox, MailClient, scoped};
//!
//! # async fn run() -> mailfetch_core::Result<()> {
//! let config = ImapConfig::from_env()?;
//! let credential = Credential::new("me@example.com", "ya29.access-token");
//! let client = MailClient::connect(&credential, &config).await?;
//! let page = scoped(client, async |c: &mut MailClient<_>| {
//!     c.get_mails(MailBox::Inbox, GetMailsOptions::default()).await
//! })
//! .await?;
//! println!("{} of {}", page.mails.len(), page.pagination.total);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod config;
mod credential;
mod email;
mod error;
mod mailbox;
pub mod pagination;
mod scope;
mod transport;

#[cfg(test)]
mod mock;

pub use client::{
    Criteria, FetchRequest, GetMailsOptions, MailClient, MailPage, NEWEST_FIRST, SelectOptions,
};
pub use config::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT, ImapConfig};
pub use credential::Credential;
pub use email::{Content, ContentKind, ReceivedEmail, parse_email};
pub use error::{Error, Result};
pub use mailbox::MailBox;
pub use pagination::{PageQuery, PageRange, Pagination, range, slice_page};
pub use scope::{scoped, scoped_until};
pub use transport::{ImapTransport, SelectedBox, Transport};

pub use mailfetch_imap::{ConnectionState, FetchedMessage, SearchKey, SortCriterion, SortKey, Uid};
