//! Lexical tokens of IMAP server responses.

/// One token of a server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Bare atom, including flags such as `\Seen`.
    Atom(&'a str),
    /// Quoted string with escapes resolved.
    QuotedString(String),
    /// Literal payload (`{n}\r\n` followed by `n` bytes).
    Literal(&'a [u8]),
    /// All-digit atom.
    Number(u64),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// ` `
    Space,
    /// `*`
    Asterisk,
    /// `+`
    Plus,
    /// `NIL`, case-insensitive.
    Nil,
    /// `\r\n`
    Crlf,
    /// End of input.
    Eof,
}
