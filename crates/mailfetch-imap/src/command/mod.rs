//! Commands this client sends and their wire encoding.

mod serialize;
mod tag_generator;
mod types;

use crate::types::{Mailbox, UidSet};

pub use tag_generator::TagGenerator;
pub use types::{FetchAttribute, FetchItems, SearchKey, SortCriterion, SortKey, UnknownSortKey};

use serialize::{write_astring, write_fetch_items, write_mailbox, write_search_keys, write_sort_keys};

/// An IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `CAPABILITY`
    Capability,
    /// `NOOP`
    Noop,
    /// `LOGOUT`
    Logout,
    /// `STARTTLS`
    StartTls,
    /// `AUTHENTICATE <mechanism> [<initial response>]`
    Authenticate {
        /// SASL mechanism name.
        mechanism: String,
        /// Base64 initial response, sent inline when the server has SASL-IR.
        initial_response: Option<String>,
    },
    /// `SELECT <mailbox>`
    Select {
        /// Mailbox to open read-write.
        mailbox: Mailbox,
        /// Append `(CONDSTORE)` to receive `HIGHESTMODSEQ`.
        condstore: bool,
    },
    /// `EXAMINE <mailbox>`
    Examine {
        /// Mailbox to open read-only.
        mailbox: Mailbox,
    },
    /// `CLOSE`: leave the mailbox, expunging `\Deleted` messages.
    Close,
    /// `UNSELECT`: leave the mailbox without expunging.
    Unselect,
    /// `[UID] SEARCH <keys>`
    Search {
        /// AND-ed keys; empty means ALL.
        criteria: Vec<SearchKey>,
        /// Return UIDs instead of sequence numbers.
        uid: bool,
    },
    /// `[UID] SORT (<keys>) UTF-8 <search keys>`
    Sort {
        /// Sort program, most significant first.
        keys: Vec<SortKey>,
        /// Search restricting the set to sort.
        criteria: Vec<SearchKey>,
        /// Return UIDs instead of sequence numbers.
        uid: bool,
    },
    /// `UID FETCH <uids> <items>`
    UidFetch {
        /// Messages to fetch.
        uids: UidSet,
        /// Data items to return.
        items: FetchItems,
    },
}

impl Command {
    /// Serializes the command with the given tag, CRLF included.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Noop => buf.extend_from_slice(b"NOOP"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::StartTls => buf.extend_from_slice(b"STARTTLS"),

            Self::Authenticate {
                mechanism,
                initial_response,
            } => {
                buf.extend_from_slice(b"AUTHENTICATE ");
                write_astring(&mut buf, mechanism);
                if let Some(response) = initial_response {
                    buf.push(b' ');
                    buf.extend_from_slice(response.as_bytes());
                }
            }

            Self::Select { mailbox, condstore } => {
                buf.extend_from_slice(b"SELECT ");
                write_mailbox(&mut buf, mailbox);
                if *condstore {
                    buf.extend_from_slice(b" (CONDSTORE)");
                }
            }

            Self::Examine { mailbox } => {
                buf.extend_from_slice(b"EXAMINE ");
                write_mailbox(&mut buf, mailbox);
            }

            Self::Close => buf.extend_from_slice(b"CLOSE"),
            Self::Unselect => buf.extend_from_slice(b"UNSELECT"),

            Self::Search { criteria, uid } => {
                if *uid {
                    buf.extend_from_slice(b"UID ");
                }
                buf.extend_from_slice(b"SEARCH CHARSET UTF-8 ");
                write_search_keys(&mut buf, criteria);
            }

            Self::Sort {
                keys,
                criteria,
                uid,
            } => {
                if *uid {
                    buf.extend_from_slice(b"UID ");
                }
                buf.extend_from_slice(b"SORT ");
                write_sort_keys(&mut buf, keys);
                buf.extend_from_slice(b" UTF-8 ");
                write_search_keys(&mut buf, criteria);
            }

            Self::UidFetch { uids, items } => {
                buf.extend_from_slice(b"UID FETCH ");
                buf.extend_from_slice(uids.to_string().as_bytes());
                buf.push(b' ');
                write_fetch_items(&mut buf, items);
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Command name for logs; never includes arguments, so secrets stay out.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::StartTls => "STARTTLS",
            Self::Authenticate { .. } => "AUTHENTICATE",
            Self::Select { .. } => "SELECT",
            Self::Examine { .. } => "EXAMINE",
            Self::Close => "CLOSE",
            Self::Unselect => "UNSELECT",
            Self::Search { .. } => "SEARCH",
            Self::Sort { .. } => "SORT",
            Self::UidFetch { .. } => "UID FETCH",
        }
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
    use super::*;
    use crate::types::Uid;

    fn uid(n: u32) -> Uid {
        Uid::new(n).unwrap()
    }

    #[test]
    fn test_capability_command() {
        assert_eq!(Command::Capability.serialize("A0000"), b"A0000 CAPABILITY\r\n");
    }

    #[test]
    fn test_authenticate_with_initial_response() {
        let cmd = Command::Authenticate {
            mechanism: "XOAUTH2".to_string(),
            initial_response: Some("dXNlcj0=".to_string()),
        };
        assert_eq!(cmd.serialize("A0001"), b"A0001 AUTHENTICATE XOAUTH2 dXNlcj0=\r\n");
    }

    #[test]
    fn test_authenticate_without_initial_response() {
        let cmd = Command::Authenticate {
            mechanism: "XOAUTH2".to_string(),
            initial_response: None,
        };
        assert_eq!(cmd.serialize("A0001"), b"A0001 AUTHENTICATE XOAUTH2\r\n");
    }

    #[test]
    fn test_select_and_examine() {
        let select = Command::Select {
            mailbox: Mailbox::inbox(),
            condstore: false,
        };
        assert_eq!(select.serialize("A0002"), b"A0002 SELECT INBOX\r\n");

        let select = Command::Select {
            mailbox: Mailbox::new("Sent Items"),
            condstore: true,
        };
        assert_eq!(
            select.serialize("A0002"),
            b"A0002 SELECT \"Sent Items\" (CONDSTORE)\r\n"
        );

        let examine = Command::Examine {
            mailbox: Mailbox::new("Junk"),
        };
        assert_eq!(examine.serialize("A0003"), b"A0003 EXAMINE Junk\r\n");
    }

    #[test]
    fn test_uid_sort_newest_first() {
        let cmd = Command::Sort {
            keys: vec![SortKey::desc(SortCriterion::Arrival)],
            criteria: vec![SearchKey::All],
            uid: true,
        };
        assert_eq!(
            cmd.serialize("A0004"),
            b"A0004 UID SORT (REVERSE ARRIVAL) UTF-8 ALL\r\n"
        );
    }

    #[test]
    fn test_uid_search() {
        let cmd = Command::Search {
            criteria: vec![SearchKey::Unseen, SearchKey::From("news".into())],
            uid: true,
        };
        assert_eq!(
            cmd.serialize("A0005"),
            b"A0005 UID SEARCH CHARSET UTF-8 UNSEEN FROM news\r\n"
        );
    }

    #[test]
    fn test_uid_fetch_full_message() {
        let cmd = Command::UidFetch {
            uids: UidSet::from_uids(&[uid(4), uid(3), uid(2), uid(1)]).unwrap(),
            items: FetchItems::full_message(false),
        };
        assert_eq!(
            cmd.serialize("A0006"),
            b"A0006 UID FETCH 1:4 (UID FLAGS INTERNALDATE RFC822.SIZE BODYSTRUCTURE BODY[])\r\n"
        );
    }

    #[test]
    fn test_close_unselect_logout() {
        assert_eq!(Command::Close.serialize("A0007"), b"A0007 CLOSE\r\n");
        assert_eq!(Command::Unselect.serialize("A0008"), b"A0008 UNSELECT\r\n");
        assert_eq!(Command::Logout.serialize("A0009"), b"A0009 LOGOUT\r\n");
    }

    #[test]
    fn test_name_hides_arguments() {
        let cmd = Command::Authenticate {
            mechanism: "XOAUTH2".to_string(),
            initial_response: Some("secret".to_string()),
        };
        assert_eq!(cmd.name(), "AUTHENTICATE");
    }
}
