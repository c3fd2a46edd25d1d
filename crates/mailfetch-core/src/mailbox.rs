//! The mailboxes a caller may ask for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Well-known mailbox, serialized as its server name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MailBox {
    /// `INBOX`
    #[default]
    #[serde(rename = "INBOX")]
    Inbox,
    /// `Sent`
    Sent,
    /// `Drafts`
    Drafts,
    /// `Junk`, also accepted as `Spam`.
    #[serde(alias = "Spam")]
    Junk,
    /// `Trash`
    Trash,
}

impl MailBox {
    /// All variants, in display order.
    pub const ALL: [Self; 5] = [Self::Inbox, Self::Sent, Self::Drafts, Self::Junk, Self::Trash];

    /// Name sent to the server.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "INBOX",
            Self::Sent => "Sent",
            Self::Drafts => "Drafts",
            Self::Junk => "Junk",
            Self::Trash => "Trash",
        }
    }
}

impl fmt::Display for MailBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MailBox {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.eq_ignore_ascii_case("spam") {
            return Ok(Self::Junk);
        }
        Self::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::InvalidQuery(format!("unknown mailbox: {s}")))
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
    fn test_parse_case_insensitive() {
        assert_eq!("inbox".parse::<MailBox>().unwrap(), MailBox::Inbox);
        assert_eq!("SENT".parse::<MailBox>().unwrap(), MailBox::Sent);
        assert_eq!("Spam".parse::<MailBox>().unwrap(), MailBox::Junk);
        assert_eq!("junk".parse::<MailBox>().unwrap(), MailBox::Junk);
        assert!("Archive".parse::<MailBox>().is_err());
    }

    #[test]
    fn test_serde_uses_server_name() {
        assert_eq!(serde_json::to_string(&MailBox::Inbox).unwrap(), "\"INBOX\"");
        assert_eq!(serde_json::to_string(&MailBox::Trash).unwrap(), "\"Trash\"");
        let junk: MailBox = serde_json::from_str("\"Spam\"").unwrap();
        assert_eq!(junk, MailBox::Junk);
    }

    #[test]
    fn test_display() {
        assert_eq!(MailBox::Drafts.to_string(), "Drafts");
        assert_eq!(MailBox::default(), MailBox::Inbox);
    }
}
