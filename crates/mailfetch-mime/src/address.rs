//! RFC 5322 address lists.

use crate::encoding::decode_rfc2047;

/// One mailbox: optional display name plus address.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    /// Display name, RFC 2047 decoded.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub name: Option<String>,
    /// `local@domain`
    pub address: String,
}

impl Address {
    /// Creates an address without a display name.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Parses an address-list header value.
///
/// Groups (`Team: a@x, b@x;`) are flattened into their members and empty
/// groups such as `undisclosed-recipients:;` contribute nothing.
#[must_use]
pub fn parse_address_list(value: &str) -> Vec<Address> {
    let mut addresses = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    let mut escaped = false;
    let mut angle = 0u32;
    let mut comment = 0u32;

    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quote || comment > 0 => escaped = true,
            '"' if comment == 0 => in_quote = !in_quote,
            _ if in_quote => {}
            '(' => comment += 1,
            ')' => comment = comment.saturating_sub(1),
            _ if comment > 0 => {}
            '<' => angle += 1,
            '>' => angle = angle.saturating_sub(1),
            // Group display name ends; members follow.
            ':' if angle == 0 => start = i + 1,
            ',' | ';' if angle == 0 => {
                addresses.extend(parse_mailbox(&value[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    addresses.extend(parse_mailbox(&value[start..]));
    addresses
}

/// Parses `Name <addr>`, `"Quoted" <addr>`, `addr (Comment)` or `addr`.
fn parse_mailbox(item: &str) -> Option<Address> {
    let item = item.trim();
    if item.is_empty() {
        return None;
    }

    if let Some(open) = find_unquoted(item, '<') {
        let rest = &item[open + 1..];
        let address = rest.split('>').next().unwrap_or(rest).trim();
        if address.is_empty() {
            return None;
        }
        let name = display_name(&item[..open]);
        return Some(Address {
            name,
            address: address.to_string(),
        });
    }

    // addr (Comment): the comment doubles as display name.
    let (address, name) = match (item.find('('), item.rfind(')')) {
        (Some(open), Some(close)) if open < close => (
            format!("{}{}", &item[..open], &item[close + 1..]),
            display_name(&item[open + 1..close]),
        ),
        _ => (item.to_string(), None),
    };
    let address = address.trim();
    if address.is_empty() {
        return None;
    }
    Some(Address {
        name,
        address: address.to_string(),
    })
}

fn find_unquoted(s: &str, needle: char) -> Option<usize> {
    let mut in_quote = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quote => escaped = true,
            '"' => in_quote = !in_quote,
            c if c == needle && !in_quote => return Some(i),
            _ => {}
        }
    }
    None
}

fn display_name(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let unquoted = match raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    out.extend(chars.next());
                } else {
                    out.push(c);
                }
            }
            out
        }
        None => raw.to_string(),
    };
    let decoded = decode_rfc2047(&unquoted);
    let decoded = decoded.trim();
    (!decoded.is_empty()).then(|| decoded.to_string())
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
    fn test_bare_address() {
        assert_eq!(
            parse_address_list("alice@example.com"),
            vec![Address::new("alice@example.com")]
        );
    }

    #[test]
    fn test_named_addresses() {
        let list = parse_address_list("Alice <alice@example.com>, \"Smith, Bob\" <bob@example.com>");
        assert_eq!(
            list,
            vec![
                Address::new("alice@example.com").with_name("Alice"),
                Address::new("bob@example.com").with_name("Smith, Bob"),
            ]
        );
    }

    #[test]
    fn test_encoded_display_name() {
        let list = parse_address_list("=?UTF-8?B?7JWI64WV?= <hi@example.kr>");
        assert_eq!(list[0].name.as_deref(), Some("안녕"));
    }

    #[test]
    fn test_comment_as_name() {
        let list = parse_address_list("carol@example.com (Carol C.)");
        assert_eq!(
            list,
            vec![Address::new("carol@example.com").with_name("Carol C.")]
        );
    }

    #[test]
    fn test_groups_are_flattened() {
        let list = parse_address_list("Team: a@example.com, B <b@example.com>;, c@example.com");
        let addresses: Vec<&str> = list.iter().map(|a| a.address.as_str()).collect();
        assert_eq!(addresses, vec!["a@example.com", "b@example.com", "c@example.com"]);
    }

    #[test]
    fn test_empty_group() {
        assert!(parse_address_list("undisclosed-recipients:;").is_empty());
        assert!(parse_address_list("").is_empty());
        assert!(parse_address_list("<>").is_empty());
    }

    #[test]
    fn test_quoted_name_with_angle_bracket() {
        let list = parse_address_list("\"a <b>\" <c@example.com>");
        assert_eq!(list[0].address, "c@example.com");
        assert_eq!(list[0].name.as_deref(), Some("a <b>"));
    }
}
