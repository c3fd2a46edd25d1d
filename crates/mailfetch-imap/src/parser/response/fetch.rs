//! FETCH response parsing.

use crate::parser::lexer::{Lexer, Token};
use crate::types::Uid;
use crate::Result;

use super::helpers::parse_flag_list;
use super::types::{BodyStructure, FetchItem};

/// Parses the parenthesized item list of `* n FETCH (...)`.
pub fn parse_fetch_response(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::LParen)?;
    let mut items = Vec::new();

    loop {
        let name = match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => continue,
            Token::Atom(name) => name,
            token => return Err(lexer.error(&format!("unexpected {token:?} in FETCH"))),
        };

        match name.to_ascii_uppercase().as_str() {
            "FLAGS" => {
                lexer.expect_space()?;
                items.push(FetchItem::Flags(parse_flag_list(lexer)?));
            }
            "UID" => {
                lexer.expect_space()?;
                let n = lexer.read_number()?;
                let uid = Uid::new(n).ok_or_else(|| lexer.error("UID 0 in FETCH"))?;
                items.push(FetchItem::Uid(uid));
            }
            "RFC822.SIZE" => {
                lexer.expect_space()?;
                items.push(FetchItem::Rfc822Size(lexer.read_number()?));
            }
            "INTERNALDATE" => {
                lexer.expect_space()?;
                match lexer.next_token()? {
                    Token::QuotedString(date) => items.push(FetchItem::InternalDate(date)),
                    Token::Nil => {}
                    token => return Err(lexer.error(&format!("bad INTERNALDATE {token:?}"))),
                }
            }
            "BODYSTRUCTURE" => {
                lexer.expect_space()?;
                items.push(FetchItem::BodyStructure(parse_body_structure(lexer)?));
            }
            // Non-extensible BODY structure, never requested.
            "BODY" if lexer.peek() == Some(b' ') => skip_fetch_item(lexer)?,
            "BODY" | "BINARY" | "RFC822" | "RFC822.HEADER" | "RFC822.TEXT" => {
                let (section, origin) = parse_section_and_origin(lexer)?;
                lexer.expect_space()?;
                let data = match lexer.next_token()? {
                    Token::Literal(data) => Some(data.to_vec()),
                    Token::QuotedString(s) => Some(s.into_bytes()),
                    Token::Nil => None,
                    token => return Err(lexer.error(&format!("bad body data {token:?}"))),
                };
                items.push(FetchItem::Body {
                    section,
                    origin,
                    data,
                });
            }
            "MODSEQ" => {
                lexer.expect_space()?;
                lexer.expect(Token::LParen)?;
                let n = lexer.read_number64()?;
                lexer.expect(Token::RParen)?;
                items.push(FetchItem::ModSeq(n));
            }
            _ => skip_fetch_item(lexer)?,
        }
    }

    Ok(items)
}

/// Reads an optional `[section]` and `<origin>` following `BODY`.
fn parse_section_and_origin(lexer: &mut Lexer<'_>) -> Result<(Option<String>, Option<u32>)> {
    let mut section = None;
    if lexer.eat(b'[') {
        let rest = lexer.remaining();
        let end = rest
            .iter()
            .position(|&b| b == b']')
            .ok_or_else(|| lexer.error("unterminated section"))?;
        let text = String::from_utf8_lossy(&rest[..end]).into_owned();
        lexer.skip(end + 1);
        if !text.is_empty() {
            section = Some(text);
        }
    }

    let mut origin = None;
    if lexer.eat(b'<') {
        origin = Some(lexer.read_number()?);
        if !lexer.eat(b'>') {
            return Err(lexer.error("unterminated origin"));
        }
    }

    Ok((section, origin))
}

/// Parses a `BODYSTRUCTURE` value; the lexer sits on its `(`.
///
/// Only the basic fields are kept. Extension data, and the envelope and
/// nested structure of `message/rfc822` parts, are skipped.
pub fn parse_body_structure(lexer: &mut Lexer<'_>) -> Result<BodyStructure> {
    lexer.expect(Token::LParen)?;

    if lexer.peek() == Some(b'(') {
        let mut parts = Vec::new();
        while lexer.peek() == Some(b'(') {
            parts.push(parse_body_structure(lexer)?);
        }
        lexer.expect_space()?;
        let subtype = lexer.read_astring()?;
        if !lexer.eat(b')') {
            lexer.skip_group()?;
        }
        return Ok(BodyStructure::Multipart { parts, subtype });
    }

    let media_type = lexer.read_astring()?;
    lexer.expect_space()?;
    let subtype = lexer.read_astring()?;
    lexer.expect_space()?;
    let params = parse_body_params(lexer)?;
    lexer.expect_space()?;
    let id = lexer.read_nstring()?;
    lexer.expect_space()?;
    let description = lexer.read_nstring()?;
    lexer.expect_space()?;
    let encoding = lexer.read_nstring()?.unwrap_or_else(|| "7BIT".to_string());
    lexer.expect_space()?;
    let size = lexer.read_number()?;

    if !lexer.eat(b')') {
        lexer.skip_group()?;
    }

    Ok(BodyStructure::Single {
        media_type,
        subtype,
        params,
        id,
        description,
        encoding,
        size,
    })
}

fn parse_body_params(lexer: &mut Lexer<'_>) -> Result<Vec<(String, String)>> {
    match lexer.next_token()? {
        Token::Nil => return Ok(Vec::new()),
        Token::LParen => {}
        token => return Err(lexer.error(&format!("bad body parameters {token:?}"))),
    }

    let mut params = Vec::new();
    loop {
        if lexer.eat(b')') {
            break;
        }
        lexer.eat(b' ');
        let key = lexer.read_astring()?;
        lexer.expect_space()?;
        let value = lexer.read_nstring()?.unwrap_or_default();
        params.push((key, value));
    }

    Ok(params)
}

/// Skips an item this parser does not model, including its value.
fn skip_fetch_item(lexer: &mut Lexer<'_>) -> Result<()> {
    if lexer.eat(b'[') {
        let end = lexer
            .remaining()
            .iter()
            .position(|&b| b == b']')
            .ok_or_else(|| lexer.error("unterminated section"))?;
        lexer.skip(end + 1);
    }
    lexer.expect_space()?;
    if lexer.next_token()? == Token::LParen {
        lexer.skip_group()?;
    }
    Ok(())
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
    use crate::types::Flag;

    fn parse(input: &[u8]) -> Result<Vec<FetchItem>> {
        parse_fetch_response(&mut Lexer::new(input))
    }

    #[test]
    fn test_uid_flags_size_date() {
        let items = parse(
            b"(UID 42 FLAGS (\\Seen $Important) RFC822.SIZE 2048 INTERNALDATE \"05-Mar-2024 10:15:00 +0000\")",
        )
        .unwrap();

        assert_eq!(items[0], FetchItem::Uid(Uid::new(42).unwrap()));
        assert_eq!(
            items[1],
            FetchItem::Flags(vec![Flag::Seen, Flag::Keyword("$Important".into())])
        );
        assert_eq!(items[2], FetchItem::Rfc822Size(2048));
        assert_eq!(
            items[3],
            FetchItem::InternalDate("05-Mar-2024 10:15:00 +0000".into())
        );
    }

    #[test]
    fn test_uid_zero_rejected() {
        assert!(parse(b"(UID 0)").is_err());
    }

    #[test]
    fn test_body_literal() {
        let items = parse(b"(UID 7 BODY[] {15}\r\nSubject: hi\r\n\r\n)").unwrap();
        assert_eq!(
            items[1],
            FetchItem::Body {
                section: None,
                origin: None,
                data: Some(b"Subject: hi\r\n\r\n".to_vec()),
            }
        );
    }

    #[test]
    fn test_body_section_and_origin() {
        let items = parse(b"(BODY[HEADER.FIELDS (SUBJECT)]<0> NIL)").unwrap();
        assert_eq!(
            items[0],
            FetchItem::Body {
                section: Some("HEADER.FIELDS (SUBJECT)".into()),
                origin: Some(0),
                data: None,
            }
        );
    }

    #[test]
    fn test_modseq_is_64_bit() {
        let items = parse(b"(MODSEQ (90000000000))").unwrap();
        assert_eq!(items[0], FetchItem::ModSeq(90_000_000_000));
    }

    #[test]
    fn test_single_part_body_structure() {
        let items = parse(
            b"(BODYSTRUCTURE (\"TEXT\" \"PLAIN\" (\"CHARSET\" \"utf-8\") NIL NIL \"7BIT\" 120 4 NIL NIL NIL))",
        )
        .unwrap();

        let FetchItem::BodyStructure(BodyStructure::Single {
            media_type,
            subtype,
            params,
            size,
            ..
        }) = &items[0]
        else {
            panic!("expected single part");
        };
        assert_eq!(media_type, "TEXT");
        assert_eq!(subtype, "PLAIN");
        assert_eq!(params, &vec![("CHARSET".to_string(), "utf-8".to_string())]);
        assert_eq!(*size, 120);
    }

    #[test]
    fn test_multipart_with_attachment() {
        let items = parse(
            b"(BODYSTRUCTURE ((\"TEXT\" \"HTML\" NIL NIL NIL \"QUOTED-PRINTABLE\" 300 10)(\"APPLICATION\" \"PDF\" (\"NAME\" \"a (1).pdf\") NIL NIL \"BASE64\" 4096 NIL (\"ATTACHMENT\" (\"FILENAME\" \"a (1).pdf\")) NIL) \"MIXED\" (\"BOUNDARY\" \"xyz\") NIL NIL) UID 3)",
        )
        .unwrap();

        let FetchItem::BodyStructure(structure) = &items[0] else {
            panic!("expected body structure");
        };
        assert_eq!(structure.leaf_count(), 2);
        assert!(structure.has_non_text_part());
        assert!(matches!(structure, BodyStructure::Multipart { subtype, .. } if subtype == "MIXED"));
        assert_eq!(items[1], FetchItem::Uid(Uid::new(3).unwrap()));
    }

    #[test]
    fn test_embedded_message_skipped() {
        let items = parse(
            b"(BODYSTRUCTURE (\"MESSAGE\" \"RFC822\" NIL NIL NIL \"7BIT\" 500 (NIL \"Re: (urgent)\" NIL NIL NIL NIL NIL NIL NIL NIL) (\"TEXT\" \"PLAIN\" NIL NIL NIL \"7BIT\" 10 1) 20) UID 9)",
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1], FetchItem::Uid(Uid::new(9).unwrap()));
    }

    #[test]
    fn test_unknown_items_skipped() {
        let items = parse(b"(X-GM-LABELS (\\Inbox \"My (label)\") ENVELOPE (NIL NIL) UID 5)").unwrap();
        assert_eq!(items, vec![FetchItem::Uid(Uid::new(5).unwrap())]);
    }
}
