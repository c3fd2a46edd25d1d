//! Response parser.
//!
//! Parses one framed server response following the RFC 3501 grammar for
//! the responses this client relies on.

#![allow(clippy::missing_errors_doc)]

mod fetch;
mod helpers;
mod types;

pub use types::{BodyStructure, FetchItem, UntaggedResponse};

use crate::parser::lexer::{Lexer, Token};
use crate::types::{ResponseCode, SeqNum, Status};
use crate::Result;

use helpers::{parse_capability_data, parse_flag_list, parse_number_list, parse_response_code};

/// A parsed server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Command completion.
    Tagged {
        /// Tag of the completed command.
        tag: String,
        /// Completion status.
        status: Status,
        /// Bracketed response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Server data.
    Untagged(UntaggedResponse),
    /// `+` continuation request.
    Continuation {
        /// Text after the `+`, e.g. a base64 SASL challenge.
        text: Option<String>,
    },
}

/// Stateless response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response, literals included.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.next_token()? {
            Token::Asterisk => Self::parse_untagged(&mut lexer),
            Token::Plus => Ok(Self::parse_continuation(&mut lexer)),
            Token::Atom(tag) => Self::parse_tagged(&mut lexer, tag),
            token => Err(lexer.error(&format!("expected *, + or tag, got {token:?}"))),
        }
    }

    fn parse_tagged(lexer: &mut Lexer<'_>, tag: &str) -> Result<Response> {
        lexer.expect_space()?;
        let status = Self::parse_status(lexer)?;
        let (code, text) = Self::parse_resp_text(lexer)?;

        Ok(Response::Tagged {
            tag: tag.to_string(),
            status,
            code,
            text,
        })
    }

    fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<Response> {
        lexer.expect_space()?;

        let untagged = match lexer.next_token()? {
            Token::Atom(name) => match name.to_ascii_uppercase().as_str() {
                "OK" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::Ok { code, text }
                }
                "NO" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::No { code, text }
                }
                "BAD" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::Bad { code, text }
                }
                "PREAUTH" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::PreAuth { code, text }
                }
                "BYE" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::Bye { code, text }
                }
                "CAPABILITY" => UntaggedResponse::Capability(parse_capability_data(lexer)?),
                "FLAGS" => {
                    lexer.expect_space()?;
                    UntaggedResponse::Flags(parse_flag_list(lexer)?)
                }
                "SEARCH" => UntaggedResponse::Search(parse_number_list(lexer)?),
                "SORT" => UntaggedResponse::Sort(parse_number_list(lexer)?),
                other => UntaggedResponse::Other(other.to_string()),
            },
            Token::Number(n) => {
                let n = u32::try_from(n).map_err(|_| lexer.error("message number overflow"))?;
                lexer.expect_space()?;
                let keyword = lexer.read_atom_string()?;

                match keyword.to_ascii_uppercase().as_str() {
                    "EXISTS" => UntaggedResponse::Exists(n),
                    "RECENT" => UntaggedResponse::Recent(n),
                    "EXPUNGE" => UntaggedResponse::Expunge(
                        SeqNum::new(n).ok_or_else(|| lexer.error("EXPUNGE 0"))?,
                    ),
                    "FETCH" => {
                        let seq = SeqNum::new(n).ok_or_else(|| lexer.error("FETCH 0"))?;
                        lexer.expect_space()?;
                        let items = fetch::parse_fetch_response(lexer)?;
                        UntaggedResponse::Fetch { seq, items }
                    }
                    other => UntaggedResponse::Other(other.to_string()),
                }
            }
            token => return Err(lexer.error(&format!("unexpected {token:?} after *"))),
        };

        Ok(Response::Untagged(untagged))
    }

    fn parse_continuation(lexer: &mut Lexer<'_>) -> Response {
        lexer.eat(b' ');
        let text = lexer.read_text_until_crlf();
        Response::Continuation {
            text: (!text.is_empty()).then_some(text),
        }
    }

    fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
        let s = lexer.read_atom_string()?;
        match s.to_ascii_uppercase().as_str() {
            "OK" => Ok(Status::Ok),
            "NO" => Ok(Status::No),
            "BAD" => Ok(Status::Bad),
            "PREAUTH" => Ok(Status::PreAuth),
            "BYE" => Ok(Status::Bye),
            _ => Err(lexer.error(&format!("invalid status {s}"))),
        }
    }

    /// Parses `[SP [code] SP] text` up to CRLF. Text may be empty.
    fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
        lexer.eat(b' ');
        let code = if lexer.peek() == Some(b'[') {
            Some(parse_response_code(lexer)?)
        } else {
            None
        };
        lexer.eat(b' ');

        Ok((code, lexer.read_text_until_crlf()))
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
    use crate::types::{Capability, Flag, Uid};

    #[test]
    fn test_greeting() {
        let response = ResponseParser::parse(b"* OK IMAP4rev1 server ready\r\n").unwrap();
        assert_eq!(
            response,
            Response::Untagged(UntaggedResponse::Ok {
                code: None,
                text: "IMAP4rev1 server ready".into(),
            })
        );
    }

    #[test]
    fn test_greeting_with_capabilities() {
        let response =
            ResponseParser::parse(b"* OK [CAPABILITY IMAP4rev1 SASL-IR AUTH=XOAUTH2] hi\r\n")
                .unwrap();
        let Response::Untagged(UntaggedResponse::Ok {
            code: Some(ResponseCode::Capability(caps)),
            ..
        }) = response
        else {
            panic!("expected capability code");
        };
        assert!(caps.contains(&Capability::SaslIr));
        assert!(caps.contains(&Capability::Auth("XOAUTH2".into())));
    }

    #[test]
    fn test_tagged_ok() {
        let response = ResponseParser::parse(b"A0001 OK LOGIN completed\r\n").unwrap();
        assert_eq!(
            response,
            Response::Tagged {
                tag: "A0001".into(),
                status: Status::Ok,
                code: None,
                text: "LOGIN completed".into(),
            }
        );
    }

    #[test]
    fn test_tagged_select_read_only() {
        let response = ResponseParser::parse(b"A0002 OK [READ-ONLY] EXAMINE done\r\n").unwrap();
        let Response::Tagged { code, status, .. } = response else {
            panic!("expected tagged");
        };
        assert_eq!(status, Status::Ok);
        assert_eq!(code, Some(ResponseCode::ReadOnly));
    }

    #[test]
    fn test_tagged_no_without_text() {
        let response = ResponseParser::parse(b"A0003 NO\r\n").unwrap();
        assert!(matches!(response, Response::Tagged { status: Status::No, .. }));
    }

    #[test]
    fn test_capability() {
        let response =
            ResponseParser::parse(b"* CAPABILITY IMAP4rev1 STARTTLS SORT UNSELECT\r\n").unwrap();
        let Response::Untagged(UntaggedResponse::Capability(caps)) = response else {
            panic!("expected capability");
        };
        assert_eq!(
            caps,
            vec![
                Capability::Imap4Rev1,
                Capability::StartTls,
                Capability::Sort,
                Capability::Unselect
            ]
        );
    }

    #[test]
    fn test_exists_and_expunge() {
        assert_eq!(
            ResponseParser::parse(b"* 23 EXISTS\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Exists(23))
        );
        assert_eq!(
            ResponseParser::parse(b"* 4 EXPUNGE\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Expunge(SeqNum::new(4).unwrap()))
        );
    }

    #[test]
    fn test_flags_with_wildcard() {
        let response =
            ResponseParser::parse(b"* OK [PERMANENTFLAGS (\\Seen \\Deleted \\*)] Limited\r\n")
                .unwrap();
        let Response::Untagged(UntaggedResponse::Ok {
            code: Some(ResponseCode::PermanentFlags(flags)),
            text,
        }) = response
        else {
            panic!("expected permanent flags");
        };
        assert_eq!(flags, vec![Flag::Seen, Flag::Deleted, Flag::Wildcard]);
        assert_eq!(text, "Limited");
    }

    #[test]
    fn test_sort_preserves_server_order() {
        assert_eq!(
            ResponseParser::parse(b"* SORT 4 3 2 1\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Sort(vec![4, 3, 2, 1]))
        );
    }

    #[test]
    fn test_empty_sort_and_search() {
        assert_eq!(
            ResponseParser::parse(b"* SORT\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Sort(vec![]))
        );
        assert_eq!(
            ResponseParser::parse(b"* SEARCH\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Search(vec![]))
        );
    }

    #[test]
    fn test_search_with_modseq_suffix() {
        assert_eq!(
            ResponseParser::parse(b"* SEARCH 2 5 (MODSEQ 917162500)\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Search(vec![2, 5]))
        );
    }

    #[test]
    fn test_fetch() {
        let response = ResponseParser::parse(b"* 1 FETCH (FLAGS (\\Seen) UID 12345)\r\n").unwrap();
        let Response::Untagged(UntaggedResponse::Fetch { seq, items }) = response else {
            panic!("expected fetch");
        };
        assert_eq!(seq.get(), 1);
        assert_eq!(
            items,
            vec![
                FetchItem::Flags(vec![Flag::Seen]),
                FetchItem::Uid(Uid::new(12345).unwrap())
            ]
        );
    }

    #[test]
    fn test_continuation() {
        assert_eq!(
            ResponseParser::parse(b"+ \r\n").unwrap(),
            Response::Continuation { text: None }
        );
        assert_eq!(
            ResponseParser::parse(b"+ eyJzdGF0dXMiOiI0MDEifQ==\r\n").unwrap(),
            Response::Continuation {
                text: Some("eyJzdGF0dXMiOiI0MDEifQ==".into())
            }
        );
    }

    #[test]
    fn test_unknown_untagged_is_tolerated() {
        assert_eq!(
            ResponseParser::parse(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Other("LIST".into()))
        );
        assert_eq!(
            ResponseParser::parse(b"* 3 VANISHED\r\n").unwrap(),
            Response::Untagged(UntaggedResponse::Other("VANISHED".into()))
        );
    }
}
