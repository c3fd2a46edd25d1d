//! Command serialization helpers.

use chrono::NaiveDate;

use crate::types::Mailbox;

use super::types::{FetchAttribute, FetchItems, SearchKey, SortKey};

/// Writes an atom, a quoted string, or a `{n}` literal for 8-bit text.
///
/// CR and LF are replaced by spaces, so user-supplied search text can never
/// terminate the command line. The only line breaks in a serialized command
/// are therefore literal announcements and the final CRLF.
pub fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if !s.is_empty() && !s.bytes().any(needs_quoting) {
        buf.extend_from_slice(s.as_bytes());
        return;
    }

    if !s.is_ascii() {
        buf.extend_from_slice(format!("{{{}}}\r\n", s.len()).as_bytes());
        buf.extend(s.bytes().map(|b| match b {
            b'\r' | b'\n' | 0 => b' ',
            _ => b,
        }));
        return;
    }

    buf.push(b'"');
    for b in s.bytes() {
        match b {
            b'"' | b'\\' => {
                buf.push(b'\\');
                buf.push(b);
            }
            b'\r' | b'\n' | 0 => buf.push(b' '),
            _ => buf.push(b),
        }
    }
    buf.push(b'"');
}

/// Writes a mailbox name.
pub fn write_mailbox(buf: &mut Vec<u8>, mailbox: &Mailbox) {
    write_astring(buf, mailbox.as_str());
}

const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']')
        || b < 0x20
        || b >= 0x7F
}

/// Writes a date as `d-Mon-yyyy`.
fn write_date(buf: &mut Vec<u8>, date: NaiveDate) {
    buf.extend_from_slice(date.format("%-d-%b-%Y").to_string().as_bytes());
}

/// Writes FETCH items.
pub fn write_fetch_items(buf: &mut Vec<u8>, items: &FetchItems) {
    match items {
        FetchItems::Fast => buf.extend_from_slice(b"FAST"),
        FetchItems::Items(attrs) => {
            buf.push(b'(');
            for (i, attr) in attrs.iter().enumerate() {
                if i > 0 {
                    buf.push(b' ');
                }
                write_fetch_attribute(buf, attr);
            }
            buf.push(b')');
        }
    }
}

fn write_fetch_attribute(buf: &mut Vec<u8>, attr: &FetchAttribute) {
    match attr {
        FetchAttribute::Flags => buf.extend_from_slice(b"FLAGS"),
        FetchAttribute::InternalDate => buf.extend_from_slice(b"INTERNALDATE"),
        FetchAttribute::Rfc822Size => buf.extend_from_slice(b"RFC822.SIZE"),
        FetchAttribute::BodyStructure => buf.extend_from_slice(b"BODYSTRUCTURE"),
        FetchAttribute::Uid => buf.extend_from_slice(b"UID"),
        FetchAttribute::Body { section, peek } => {
            if *peek {
                buf.extend_from_slice(b"BODY.PEEK[");
            } else {
                buf.extend_from_slice(b"BODY[");
            }
            if let Some(section) = section {
                buf.extend_from_slice(section.as_bytes());
            }
            buf.push(b']');
        }
    }
}

/// Writes an AND-ed list of search keys; an empty list means `ALL`.
pub fn write_search_keys(buf: &mut Vec<u8>, keys: &[SearchKey]) {
    if keys.is_empty() {
        buf.extend_from_slice(b"ALL");
        return;
    }
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        write_search_key(buf, key);
    }
}

fn write_search_key(buf: &mut Vec<u8>, key: &SearchKey) {
    match key {
        SearchKey::All => buf.extend_from_slice(b"ALL"),
        SearchKey::Answered => buf.extend_from_slice(b"ANSWERED"),
        SearchKey::Deleted => buf.extend_from_slice(b"DELETED"),
        SearchKey::Draft => buf.extend_from_slice(b"DRAFT"),
        SearchKey::Flagged => buf.extend_from_slice(b"FLAGGED"),
        SearchKey::New => buf.extend_from_slice(b"NEW"),
        SearchKey::Old => buf.extend_from_slice(b"OLD"),
        SearchKey::Recent => buf.extend_from_slice(b"RECENT"),
        SearchKey::Seen => buf.extend_from_slice(b"SEEN"),
        SearchKey::Unanswered => buf.extend_from_slice(b"UNANSWERED"),
        SearchKey::Undeleted => buf.extend_from_slice(b"UNDELETED"),
        SearchKey::Undraft => buf.extend_from_slice(b"UNDRAFT"),
        SearchKey::Unflagged => buf.extend_from_slice(b"UNFLAGGED"),
        SearchKey::Unseen => buf.extend_from_slice(b"UNSEEN"),
        SearchKey::Bcc(s) => write_labeled(buf, b"BCC", s),
        SearchKey::Cc(s) => write_labeled(buf, b"CC", s),
        SearchKey::From(s) => write_labeled(buf, b"FROM", s),
        SearchKey::Subject(s) => write_labeled(buf, b"SUBJECT", s),
        SearchKey::To(s) => write_labeled(buf, b"TO", s),
        SearchKey::Body(s) => write_labeled(buf, b"BODY", s),
        SearchKey::Text(s) => write_labeled(buf, b"TEXT", s),
        SearchKey::Keyword(s) => write_labeled(buf, b"KEYWORD", s),
        SearchKey::Header(name, value) => {
            write_labeled(buf, b"HEADER", name);
            buf.push(b' ');
            write_astring(buf, value);
        }
        SearchKey::Before(d) => write_dated(buf, b"BEFORE", *d),
        SearchKey::On(d) => write_dated(buf, b"ON", *d),
        SearchKey::Since(d) => write_dated(buf, b"SINCE", *d),
        SearchKey::SentBefore(d) => write_dated(buf, b"SENTBEFORE", *d),
        SearchKey::SentOn(d) => write_dated(buf, b"SENTON", *d),
        SearchKey::SentSince(d) => write_dated(buf, b"SENTSINCE", *d),
        SearchKey::Larger(n) => buf.extend_from_slice(format!("LARGER {n}").as_bytes()),
        SearchKey::Smaller(n) => buf.extend_from_slice(format!("SMALLER {n}").as_bytes()),
        SearchKey::Uid(set) => buf.extend_from_slice(format!("UID {set}").as_bytes()),
        SearchKey::Or(a, b) => {
            buf.extend_from_slice(b"OR ");
            write_search_key(buf, a);
            buf.push(b' ');
            write_search_key(buf, b);
        }
        SearchKey::Not(inner) => {
            buf.extend_from_slice(b"NOT ");
            write_search_key(buf, inner);
        }
    }
}

fn write_labeled(buf: &mut Vec<u8>, label: &[u8], value: &str) {
    buf.extend_from_slice(label);
    buf.push(b' ');
    write_astring(buf, value);
}

fn write_dated(buf: &mut Vec<u8>, label: &[u8], date: NaiveDate) {
    buf.extend_from_slice(label);
    buf.push(b' ');
    write_date(buf, date);
}

/// Writes a parenthesized sort program, e.g. `(REVERSE ARRIVAL SUBJECT)`.
pub fn write_sort_keys(buf: &mut Vec<u8>, keys: &[SortKey]) {
    buf.push(b'(');
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        if key.reverse {
            buf.extend_from_slice(b"REVERSE ");
        }
        buf.extend_from_slice(key.criterion.as_str().as_bytes());
    }
    buf.push(b')');
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
    use crate::command::SortCriterion;

    fn search(keys: &[SearchKey]) -> String {
        let mut buf = Vec::new();
        write_search_keys(&mut buf, keys);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_astring_atom_and_quoted() {
        let mut buf = Vec::new();
        write_astring(&mut buf, "INBOX");
        buf.push(b' ');
        write_astring(&mut buf, "Sent Items");
        buf.push(b' ');
        write_astring(&mut buf, "");
        assert_eq!(buf, b"INBOX \"Sent Items\" \"\"");
    }

    #[test]
    fn test_astring_escapes_and_neutralizes_newlines() {
        let mut buf = Vec::new();
        write_astring(&mut buf, "a\"b\\c\r\nA1 LOGOUT");
        assert_eq!(buf, b"\"a\\\"b\\\\c  A1 LOGOUT\"");
    }

    #[test]
    fn test_astring_8bit_is_a_literal() {
        let mut buf = Vec::new();
        write_astring(&mut buf, "Café\r\nmenu");
        let mut expected = b"{11}\r\n".to_vec();
        expected.extend_from_slice("Café  menu".as_bytes());
        assert_eq!(buf, expected);

        assert_eq!(search(&[SearchKey::Subject("Привет".into())]), "SUBJECT {12}\r\nПривет");
    }

    #[test]
    fn test_empty_search_is_all() {
        assert_eq!(search(&[]), "ALL");
    }

    #[test]
    fn test_search_keys_are_anded() {
        let keys = [
            SearchKey::Unseen,
            SearchKey::From("boss@example.com".into()),
            SearchKey::Since(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()),
        ];
        assert_eq!(search(&keys), "UNSEEN FROM boss@example.com SINCE 5-Mar-2024");
    }

    #[test]
    fn test_search_or_not() {
        let key = SearchKey::or(
            SearchKey::Subject("quarterly report".into()),
            SearchKey::Flagged.negate(),
        );
        assert_eq!(search(&[key]), "OR SUBJECT \"quarterly report\" NOT FLAGGED");
    }

    #[test]
    fn test_search_header_and_sizes() {
        let keys = [
            SearchKey::Header("X-Mailer".into(), "Thunderbird".into()),
            SearchKey::Larger(1024),
            SearchKey::SentBefore(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()),
        ];
        assert_eq!(
            search(&keys),
            "HEADER X-Mailer Thunderbird LARGER 1024 SENTBEFORE 31-Dec-2023"
        );
    }

    #[test]
    fn test_sort_keys() {
        let mut buf = Vec::new();
        write_sort_keys(
            &mut buf,
            &[
                SortKey::desc(SortCriterion::Arrival),
                SortKey::asc(SortCriterion::Subject),
            ],
        );
        assert_eq!(buf, b"(REVERSE ARRIVAL SUBJECT)");
    }

    #[test]
    fn test_fetch_items() {
        let mut buf = Vec::new();
        write_fetch_items(&mut buf, &FetchItems::full_message(true));
        assert_eq!(
            buf,
            b"(UID FLAGS INTERNALDATE RFC822.SIZE BODYSTRUCTURE BODY.PEEK[])"
        );
    }
}
