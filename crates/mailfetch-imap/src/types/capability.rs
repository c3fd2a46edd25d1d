//! Server capabilities and completion status.

/// Completion status of a tagged or untagged status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Success.
    Ok,
    /// Operational failure.
    No,
    /// Protocol or syntax error.
    Bad,
    /// Greeting for an already-authenticated connection.
    PreAuth,
    /// Server is closing the connection.
    Bye,
}

impl Status {
    /// Returns true for `OK` and `PREAUTH`.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::PreAuth)
    }
}

/// A capability the client cares about; everything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `IMAP4rev1`
    Imap4Rev1,
    /// `IMAP4rev2`
    Imap4Rev2,
    /// `STARTTLS`
    StartTls,
    /// `LOGINDISABLED`
    LoginDisabled,
    /// `SASL-IR` (RFC 4959): initial response allowed on AUTHENTICATE.
    SaslIr,
    /// `SORT` (RFC 5256)
    Sort,
    /// `UNSELECT` (RFC 3691)
    Unselect,
    /// `CONDSTORE` (RFC 7162)
    CondStore,
    /// `AUTH=<mechanism>`
    Auth(String),
    /// Anything else.
    Unknown(String),
}

impl Capability {
    /// Parses one capability atom, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "IMAP4REV1" => Self::Imap4Rev1,
            "IMAP4REV2" => Self::Imap4Rev2,
            "STARTTLS" => Self::StartTls,
            "LOGINDISABLED" => Self::LoginDisabled,
            "SASL-IR" => Self::SaslIr,
            "SORT" => Self::Sort,
            "UNSELECT" => Self::Unselect,
            "CONDSTORE" => Self::CondStore,
            _ => match upper.strip_prefix("AUTH=") {
                Some(mechanism) => Self::Auth(mechanism.to_string()),
                None => Self::Unknown(s.to_string()),
            },
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imap4Rev1 => f.write_str("IMAP4rev1"),
            Self::Imap4Rev2 => f.write_str("IMAP4rev2"),
            Self::StartTls => f.write_str("STARTTLS"),
            Self::LoginDisabled => f.write_str("LOGINDISABLED"),
            Self::SaslIr => f.write_str("SASL-IR"),
            Self::Sort => f.write_str("SORT"),
            Self::Unselect => f.write_str("UNSELECT"),
            Self::CondStore => f.write_str("CONDSTORE"),
            Self::Auth(mechanism) => write!(f, "AUTH={mechanism}"),
            Self::Unknown(s) => f.write_str(s),
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
    fn test_status_is_ok() {
        assert!(Status::Ok.is_ok());
        assert!(Status::PreAuth.is_ok());
        assert!(!Status::No.is_ok());
        assert!(!Status::Bye.is_ok());
    }

    #[test]
    fn test_parse_known() {
        assert_eq!(Capability::parse("sort"), Capability::Sort);
        assert_eq!(Capability::parse("SASL-IR"), Capability::SaslIr);
        assert_eq!(Capability::parse("StartTLS"), Capability::StartTls);
        assert_eq!(
            Capability::parse("AUTH=xoauth2"),
            Capability::Auth("XOAUTH2".into())
        );
    }

    #[test]
    fn test_parse_unknown_keeps_text() {
        assert_eq!(
            Capability::parse("X-GM-EXT-1"),
            Capability::Unknown("X-GM-EXT-1".into())
        );
        assert_eq!(Capability::parse("SORT=DISPLAY").to_string(), "SORT=DISPLAY");
    }
}
