//! Shared pieces of response grammar.

use crate::parser::lexer::{Lexer, Token};
use crate::types::{Capability, Flag, ResponseCode, SeqNum, Uid, UidValidity};
use crate::Result;

/// Parses a bracketed response code; the lexer sits on `[`.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;
    let atom = lexer.read_atom_string()?;

    let code = match atom.to_ascii_uppercase().as_str() {
        "ALERT" => ResponseCode::Alert,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "NOMODSEQ" => ResponseCode::NoModSeq,
        "UIDNEXT" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::UidNext(Uid::new(n).ok_or_else(|| lexer.error("UIDNEXT 0"))?)
        }
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::UidValidity(
                UidValidity::new(n).ok_or_else(|| lexer.error("UIDVALIDITY 0"))?,
            )
        }
        "UNSEEN" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::Unseen(SeqNum::new(n).ok_or_else(|| lexer.error("UNSEEN 0"))?)
        }
        "HIGHESTMODSEQ" => {
            lexer.expect_space()?;
            ResponseCode::HighestModSeq(lexer.read_number64()?)
        }
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)?),
        "PERMANENTFLAGS" => {
            lexer.expect_space()?;
            ResponseCode::PermanentFlags(parse_flag_list(lexer)?)
        }
        _ => ResponseCode::Unknown(atom.to_string()),
    };

    while lexer.peek().is_some_and(|b| b != b']' && b != b'\r') {
        lexer.advance();
    }
    lexer.expect(Token::RBracket)?;

    Ok(code)
}

/// Parses space-separated capability atoms up to `]` or end of line.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();

    while lexer.eat(b' ') {
        match lexer.next_token()? {
            Token::Atom(s) => caps.push(Capability::parse(s)),
            Token::Number(n) => caps.push(Capability::parse(&n.to_string())),
            _ => break,
        }
    }

    Ok(caps)
}

/// Parses `(flag flag ...)`, including the `\*` wildcard.
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Vec<Flag>> {
    lexer.expect(Token::LParen)?;
    let mut flags = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom("\\") if lexer.eat(b'*') => flags.push(Flag::Wildcard),
            Token::Atom(s) => flags.push(Flag::parse(s)),
            token => return Err(lexer.error(&format!("unexpected {token:?} in flag list"))),
        }
    }

    Ok(flags)
}

/// Parses the numbers of a SEARCH or SORT response.
///
/// Stops at the first non-number, so a trailing `(MODSEQ n)` is ignored.
pub fn parse_number_list(lexer: &mut Lexer<'_>) -> Result<Vec<u32>> {
    let mut numbers = Vec::new();

    while lexer.eat(b' ') {
        if !lexer.peek().is_some_and(|b| b.is_ascii_digit()) {
            break;
        }
        numbers.push(lexer.read_number()?);
    }

    Ok(numbers)
}
