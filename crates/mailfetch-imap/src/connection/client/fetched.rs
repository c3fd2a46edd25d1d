//! One message as returned by `UID FETCH`.

use crate::parser::{BodyStructure, FetchItem};
use crate::types::{Flag, SeqNum, Uid};

/// Raw message plus the attributes fetched with it.
///
/// Transient: it lives only between the fetch and parsing the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    /// Sequence number at fetch time.
    pub seq: SeqNum,
    /// Message UID.
    pub uid: Uid,
    /// Flags after the fetch (includes `\Seen` if the fetch set it).
    pub flags: Vec<Flag>,
    /// `INTERNALDATE` as sent, e.g. `05-Mar-2024 10:15:00 +0000`.
    pub internal_date: Option<String>,
    /// `RFC822.SIZE`
    pub size: Option<u32>,
    /// MIME structure as seen by the server.
    pub structure: Option<BodyStructure>,
    /// Full RFC 5322 message; `None` if the server sent none.
    pub body: Option<Vec<u8>>,
}

impl FetchedMessage {
    /// Starts an empty record for `uid`.
    #[must_use]
    pub const fn new(seq: SeqNum, uid: Uid) -> Self {
        Self {
            seq,
            uid,
            flags: Vec::new(),
            internal_date: None,
            size: None,
            structure: None,
            body: None,
        }
    }

    /// Returns the UID carried by a FETCH response, if any.
    #[must_use]
    pub fn uid_of(items: &[FetchItem]) -> Option<Uid> {
        items.iter().find_map(|item| match item {
            FetchItem::Uid(uid) => Some(*uid),
            _ => None,
        })
    }

    /// Folds FETCH items into the record.
    ///
    /// Servers may split one message over several FETCH responses, so
    /// later items only overwrite what they carry.
    pub fn merge(&mut self, items: Vec<FetchItem>) {
        for item in items {
            match item {
                FetchItem::Flags(flags) => self.flags = flags,
                FetchItem::InternalDate(date) => self.internal_date = Some(date),
                FetchItem::Rfc822Size(size) => self.size = Some(size),
                FetchItem::BodyStructure(structure) => self.structure = Some(structure),
                FetchItem::Body {
                    section: None,
                    data: Some(data),
                    ..
                } => self.body = Some(data),
                FetchItem::Uid(_) | FetchItem::Body { .. } | FetchItem::ModSeq(_) => {}
            }
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

    #[test]
    fn test_merge_split_responses() {
        let uid = Uid::new(9).unwrap();
        let mut message = FetchedMessage::new(SeqNum::new(3).unwrap(), uid);

        message.merge(vec![
            FetchItem::Uid(uid),
            FetchItem::Body {
                section: None,
                origin: None,
                data: Some(b"Subject: a\r\n\r\nbody".to_vec()),
            },
        ]);
        message.merge(vec![
            FetchItem::Uid(uid),
            FetchItem::Flags(vec![Flag::Seen]),
        ]);

        assert_eq!(message.flags, vec![Flag::Seen]);
        assert_eq!(message.body.as_deref(), Some(&b"Subject: a\r\n\r\nbody"[..]));
    }

    #[test]
    fn test_uid_of() {
        let uid = Uid::new(4).unwrap();
        assert_eq!(
            FetchedMessage::uid_of(&[FetchItem::Rfc822Size(10), FetchItem::Uid(uid)]),
            Some(uid)
        );
        assert_eq!(FetchedMessage::uid_of(&[FetchItem::Rfc822Size(10)]), None);
    }
}
