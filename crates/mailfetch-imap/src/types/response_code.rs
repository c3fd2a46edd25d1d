//! Bracketed response codes (`[UIDVALIDITY 42]`, `[READ-ONLY]`, ...).

use super::{Capability, Flag, SeqNum, Uid, UidValidity};

/// A response code attached to a status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// Text must be shown to the user.
    Alert,
    /// Capabilities sent inline with the greeting or AUTHENTICATE result.
    Capability(Vec<Capability>),
    /// Flags the client may store permanently.
    PermanentFlags(Vec<Flag>),
    /// Mailbox opened read-only.
    ReadOnly,
    /// Mailbox opened read-write.
    ReadWrite,
    /// Mailbox does not exist but could be created.
    TryCreate,
    /// Predicted next UID.
    UidNext(Uid),
    /// UID epoch of the mailbox.
    UidValidity(UidValidity),
    /// First unseen message.
    Unseen(SeqNum),
    /// CONDSTORE high-water mark.
    HighestModSeq(u64),
    /// Mailbox does not track mod-sequences.
    NoModSeq,
    /// Any other code, with its name.
    Unknown(String),
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
    fn test_codes_compare_by_value() {
        let validity = UidValidity::new(7).unwrap();
        assert_eq!(
            ResponseCode::UidValidity(validity),
            ResponseCode::UidValidity(UidValidity::new(7).unwrap())
        );
        assert_ne!(ResponseCode::ReadOnly, ResponseCode::ReadWrite);
    }
}
