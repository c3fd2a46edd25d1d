//! Command argument types: search keys, sort keys and fetch items.

use std::str::FromStr;

use chrono::NaiveDate;

use crate::types::UidSet;

/// One search predicate. A list of keys is AND-ed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKey {
    /// Every message.
    All,
    /// `\Answered` set.
    Answered,
    /// `\Deleted` set.
    Deleted,
    /// `\Draft` set.
    Draft,
    /// `\Flagged` set.
    Flagged,
    /// `\Recent` set and `\Seen` unset.
    New,
    /// `\Recent` unset.
    Old,
    /// `\Recent` set.
    Recent,
    /// `\Seen` set.
    Seen,
    /// `\Answered` unset.
    Unanswered,
    /// `\Deleted` unset.
    Undeleted,
    /// `\Draft` unset.
    Undraft,
    /// `\Flagged` unset.
    Unflagged,
    /// `\Seen` unset.
    Unseen,
    /// Bcc header contains the string.
    Bcc(String),
    /// Cc header contains the string.
    Cc(String),
    /// From header contains the string.
    From(String),
    /// Subject header contains the string.
    Subject(String),
    /// To header contains the string.
    To(String),
    /// Body contains the string.
    Body(String),
    /// Header or body contains the string.
    Text(String),
    /// Keyword flag is set.
    Keyword(String),
    /// Named header contains the value.
    Header(String, String),
    /// Internal date earlier than the day.
    Before(NaiveDate),
    /// Internal date within the day.
    On(NaiveDate),
    /// Internal date within or later than the day.
    Since(NaiveDate),
    /// Date header earlier than the day.
    SentBefore(NaiveDate),
    /// Date header within the day.
    SentOn(NaiveDate),
    /// Date header within or later than the day.
    SentSince(NaiveDate),
    /// Size larger than n octets.
    Larger(u32),
    /// Size smaller than n octets.
    Smaller(u32),
    /// UID within the set.
    Uid(UidSet),
    /// Either key matches.
    Or(Box<Self>, Box<Self>),
    /// Key does not match.
    Not(Box<Self>),
}

impl SearchKey {
    /// Shorthand for `OR a b`.
    #[must_use]
    pub fn or(a: Self, b: Self) -> Self {
        Self::Or(Box::new(a), Box::new(b))
    }

    /// Negates the key.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }
}

/// Fields `SORT` can order by (RFC 5256).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortCriterion {
    /// Internal date.
    Arrival,
    /// First Cc mailbox.
    Cc,
    /// Date header.
    Date,
    /// First From mailbox.
    From,
    /// Size.
    Size,
    /// Base subject.
    Subject,
    /// First To mailbox.
    To,
}

impl SortCriterion {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Arrival => "ARRIVAL",
            Self::Cc => "CC",
            Self::Date => "DATE",
            Self::From => "FROM",
            Self::Size => "SIZE",
            Self::Subject => "SUBJECT",
            Self::To => "TO",
        }
    }
}

/// A sort criterion with direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortKey {
    /// Field to order by.
    pub criterion: SortCriterion,
    /// Descending when true.
    pub reverse: bool,
}

impl SortKey {
    /// Ascending order.
    #[must_use]
    pub const fn asc(criterion: SortCriterion) -> Self {
        Self {
            criterion,
            reverse: false,
        }
    }

    /// Descending order.
    #[must_use]
    pub const fn desc(criterion: SortCriterion) -> Self {
        Self {
            criterion,
            reverse: true,
        }
    }
}

/// Error returned when a sort key string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort criterion: {0}")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    /// Parses `ARRIVAL`, `-ARRIVAL` (reverse) and friends, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (reverse, name) = s
            .strip_prefix('-')
            .map_or((false, s), |rest| (true, rest));
        let criterion = match name.to_ascii_uppercase().as_str() {
            "ARRIVAL" => SortCriterion::Arrival,
            "CC" => SortCriterion::Cc,
            "DATE" => SortCriterion::Date,
            "FROM" => SortCriterion::From,
            "SIZE" => SortCriterion::Size,
            "SUBJECT" => SortCriterion::Subject,
            "TO" => SortCriterion::To,
            _ => return Err(UnknownSortKey(s.to_string())),
        };
        Ok(Self { criterion, reverse })
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.reverse {
            f.write_str("-")?;
        }
        f.write_str(self.criterion.as_str())
    }
}

/// FETCH items to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItems {
    /// `FAST` macro: FLAGS INTERNALDATE RFC822.SIZE.
    Fast,
    /// Explicit attribute list.
    Items(Vec<FetchAttribute>),
}

impl FetchItems {
    /// Everything needed to rebuild a message: attributes plus the full body.
    ///
    /// `peek` selects `BODY.PEEK[]`, which leaves `\Seen` untouched.
    #[must_use]
    pub fn full_message(peek: bool) -> Self {
        Self::Items(vec![
            FetchAttribute::Uid,
            FetchAttribute::Flags,
            FetchAttribute::InternalDate,
            FetchAttribute::Rfc822Size,
            FetchAttribute::BodyStructure,
            FetchAttribute::Body {
                section: None,
                peek,
            },
        ])
    }
}

/// Individual FETCH attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// `FLAGS`
    Flags,
    /// `INTERNALDATE`
    InternalDate,
    /// `RFC822.SIZE`
    Rfc822Size,
    /// `BODYSTRUCTURE`
    BodyStructure,
    /// `UID`
    Uid,
    /// `BODY[section]` or `BODY.PEEK[section]`.
    Body {
        /// Section specifier; `None` is the whole message.
        section: Option<String>,
        /// Do not set `\Seen`.
        peek: bool,
    },
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
    fn test_sort_key_parse() {
        assert_eq!(
            "-ARRIVAL".parse::<SortKey>().unwrap(),
            SortKey::desc(SortCriterion::Arrival)
        );
        assert_eq!(
            "subject".parse::<SortKey>().unwrap(),
            SortKey::asc(SortCriterion::Subject)
        );
        assert!("-REVERSE".parse::<SortKey>().is_err());
        assert!("".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_sort_key_display_roundtrips() {
        let key = SortKey::desc(SortCriterion::Date);
        assert_eq!(key.to_string(), "-DATE");
        assert_eq!(key.to_string().parse::<SortKey>().unwrap(), key);
    }

    #[test]
    fn test_search_key_helpers() {
        let key = SearchKey::or(SearchKey::Seen, SearchKey::Flagged).negate();
        assert!(matches!(key, SearchKey::Not(inner) if matches!(*inner, SearchKey::Or(_, _))));
    }

    #[test]
    fn test_full_message_items() {
        let FetchItems::Items(items) = FetchItems::full_message(true) else {
            panic!("expected item list");
        };
        assert!(items.contains(&FetchAttribute::Uid));
        assert!(items.contains(&FetchAttribute::Body {
            section: None,
            peek: true
        }));
    }
}
