//! Tokenizer for server responses.
//!
//! Works on one complete response as assembled by the framed reader, so a
//! literal's payload is always present in the input slice.

#![allow(clippy::missing_errors_doc)]

mod token;

pub use token::Token;

use crate::{Error, Result};

/// Cursor over one response.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer positioned at the start of `input`.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Current byte offset.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Unconsumed input.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Returns true once all input is consumed.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Looks at the next byte.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Consumes one byte.
    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Consumes up to `n` bytes.
    pub fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Consumes `byte` if it is next; reports whether it did.
    pub fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Reads the next token.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        let single = match byte {
            b' ' => Some(Token::Space),
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b'[' => Some(Token::LBracket),
            b']' => Some(Token::RBracket),
            b'*' => Some(Token::Asterisk),
            b'+' => Some(Token::Plus),
            _ => None,
        };
        if let Some(token) = single {
            self.pos += 1;
            return Ok(token);
        }

        match byte {
            b'\r' if self.input.get(self.pos + 1) == Some(&b'\n') => {
                self.pos += 2;
                Ok(Token::Crlf)
            }
            b'"' => self.read_quoted(),
            b'{' => self.read_literal(),
            _ if is_atom_char(byte) => self.read_atom(),
            _ => Err(self.error(&format!("unexpected byte {byte:#04x}"))),
        }
    }

    fn read_quoted(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let mut out = Vec::new();

        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(c @ (b'"' | b'\\')) => out.push(c),
                    Some(c) => return Err(self.error(&format!("invalid escape \\{}", c as char))),
                    None => return Err(self.error("unterminated quoted string")),
                },
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated quoted string")),
            }
        }

        Ok(Token::QuotedString(String::from_utf8_lossy(&out).into_owned()))
    }

    fn read_literal(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits = &self.input[start..self.pos];
        self.eat(b'+');

        if !self.eat(b'}') {
            return Err(self.error("malformed literal size"));
        }
        if !(self.eat(b'\r') && self.eat(b'\n')) {
            return Err(self.error("expected CRLF after literal size"));
        }

        let size: usize = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.error("invalid literal size"))?;
        let end = self
            .pos
            .checked_add(size)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.error("incomplete literal data"))?;

        let data = &self.input[self.pos..end];
        self.pos = end;
        Ok(Token::Literal(data))
    }

    fn read_atom(&mut self) -> Result<Token<'a>> {
        let start = self.pos;
        while self.peek().is_some_and(is_atom_char) {
            self.pos += 1;
        }

        let atom = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("atom is not valid UTF-8"))?;

        if atom.bytes().all(|b| b.is_ascii_digit()) {
            return atom
                .parse()
                .map(Token::Number)
                .map_err(|_| self.error("number out of range"));
        }
        if atom.eq_ignore_ascii_case("NIL") {
            return Ok(Token::Nil);
        }
        Ok(Token::Atom(atom))
    }

    /// Builds a parse error at the current offset.
    pub(crate) fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_string(),
        }
    }

    /// Consumes a token of the same kind as `expected`.
    #[allow(clippy::needless_pass_by_value)]
    pub fn expect(&mut self, expected: Token<'_>) -> Result<()> {
        let token = self.next_token()?;
        if std::mem::discriminant(&token) == std::mem::discriminant(&expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {expected:?}, got {token:?}")))
        }
    }

    /// Consumes a single space.
    pub fn expect_space(&mut self) -> Result<()> {
        self.expect(Token::Space)
    }

    /// Reads an atom, quoted string or literal as text.
    pub fn read_astring(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s.to_string()),
            Token::Number(n) => Ok(n.to_string()),
            Token::QuotedString(s) => Ok(s),
            Token::Literal(data) => Ok(String::from_utf8_lossy(data).into_owned()),
            token => Err(self.error(&format!("expected astring, got {token:?}"))),
        }
    }

    /// Reads `NIL` or a string.
    pub fn read_nstring(&mut self) -> Result<Option<String>> {
        match self.next_token()? {
            Token::Nil => Ok(None),
            Token::QuotedString(s) => Ok(Some(s)),
            Token::Literal(data) => Ok(Some(String::from_utf8_lossy(data).into_owned())),
            token => Err(self.error(&format!("expected nstring, got {token:?}"))),
        }
    }

    /// Reads a number that fits in 32 bits.
    pub fn read_number(&mut self) -> Result<u32> {
        let n = self.read_number64()?;
        u32::try_from(n).map_err(|_| self.error(&format!("number {n} exceeds 32 bits")))
    }

    /// Reads a 63-bit number such as a mod-sequence.
    pub fn read_number64(&mut self) -> Result<u64> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            token => Err(self.error(&format!("expected number, got {token:?}"))),
        }
    }

    /// Reads an atom.
    pub fn read_atom_string(&mut self) -> Result<&'a str> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s),
            token => Err(self.error(&format!("expected atom, got {token:?}"))),
        }
    }

    /// Consumes the rest of the current line, returning it without CRLF.
    pub fn read_text_until_crlf(&mut self) -> String {
        let remaining = self.remaining();
        let end = remaining
            .windows(2)
            .position(|w| w == b"\r\n")
            .unwrap_or(remaining.len());
        self.skip(end + 2);
        String::from_utf8_lossy(&remaining[..end]).into_owned()
    }

    /// Skips a balanced parenthesized group whose `(` was already consumed.
    ///
    /// Works token by token so parentheses inside quoted strings and
    /// literals do not affect the nesting count.
    pub fn skip_group(&mut self) -> Result<()> {
        let mut depth = 1usize;
        while depth > 0 {
            match self.next_token()? {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Eof | Token::Crlf => return Err(self.error("unbalanced parentheses")),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Returns true for bytes allowed in an atom.
///
/// `\` is accepted so system flags lex as one atom. `%`, `*`, `"`, `(`, `)`,
/// `{`, `[`, `]`, space and controls are excluded.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    matches!(b,
        0x21 | 0x23..=0x24 | 0x26..=0x27 |
        0x2B..=0x5A |
        0x5C |
        0x5E..=0x7A |
        0x7C |
        0x7E
    )
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
    fn test_tagged_line() {
        let mut lexer = Lexer::new(b"A0003 OK SORT completed\r\n");
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("A0003"));
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("OK"));
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("SORT"));
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("completed"));
        assert_eq!(lexer.next_token().unwrap(), Token::Crlf);
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn test_numbers_beyond_u32() {
        let mut lexer = Lexer::new(b"4 90000000000");
        assert_eq!(lexer.next_token().unwrap(), Token::Number(4));
        lexer.expect_space().unwrap();
        assert_eq!(lexer.read_number64().unwrap(), 90_000_000_000);

        let mut lexer = Lexer::new(b"90000000000");
        assert!(lexer.read_number().is_err());
    }

    #[test]
    fn test_quoted_string_escapes() {
        let mut lexer = Lexer::new(b"\"say \\\"hi\\\" (now)\"");
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::QuotedString("say \"hi\" (now)".to_string())
        );
    }

    #[test]
    fn test_nil_any_case() {
        let mut lexer = Lexer::new(b"nil");
        assert_eq!(lexer.next_token().unwrap(), Token::Nil);
    }

    #[test]
    fn test_flag_atoms() {
        let mut lexer = Lexer::new(b"(\\Seen $Forwarded)");
        assert_eq!(lexer.next_token().unwrap(), Token::LParen);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("\\Seen"));
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("$Forwarded"));
        assert_eq!(lexer.next_token().unwrap(), Token::RParen);
    }

    #[test]
    fn test_literal_borrows_payload() {
        let mut lexer = Lexer::new(b"{5}\r\nhello)");
        assert_eq!(lexer.next_token().unwrap(), Token::Literal(b"hello"));
        assert_eq!(lexer.next_token().unwrap(), Token::RParen);
    }

    #[test]
    fn test_incomplete_literal() {
        let mut lexer = Lexer::new(b"{10}\r\nshort");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_skip_group_ignores_quoted_parens() {
        let mut lexer = Lexer::new(b"(\"a)\" (b) {3}\r\n)))) NEXT");
        lexer.expect(Token::LParen).unwrap();
        lexer.skip_group().unwrap();
        assert_eq!(lexer.next_token().unwrap(), Token::Space);
        assert_eq!(lexer.next_token().unwrap(), Token::Atom("NEXT"));
    }

    #[test]
    fn test_read_text_until_crlf() {
        let mut lexer = Lexer::new(b"Logged in\r\n");
        assert_eq!(lexer.read_text_until_crlf(), "Logged in");
        assert!(lexer.is_eof());
    }

    #[test]
    fn test_atom_chars() {
        assert!(is_atom_char(b'A'));
        assert!(is_atom_char(b'\\'));
        assert!(is_atom_char(b'.'));
        assert!(!is_atom_char(b'*'));
        assert!(!is_atom_char(b'%'));
        assert!(!is_atom_char(b'"'));
        assert!(!is_atom_char(b'['));
        assert!(!is_atom_char(b']'));
        assert!(!is_atom_char(b'{'));
    }
}
