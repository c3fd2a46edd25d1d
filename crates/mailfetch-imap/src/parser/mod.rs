//! Sans-I/O parser for server responses.
//!
//! The [`Lexer`] turns one framed response into tokens; [`ResponseParser`]
//! builds a [`Response`] from them. Only the responses this client acts on
//! are modelled in detail. Anything else parses as
//! [`UntaggedResponse::Other`] and is ignored by the caller.
//!
//! ```
//! use mailfetch_imap::parser::{Response, ResponseParser, UntaggedResponse};
//!
//! let response = ResponseParser::parse(b"* SORT 4 3 2 1\r\n").unwrap();
//! assert_eq!(
//!     response,
//!     Response::Untagged(UntaggedResponse::Sort(vec![4, 3, 2, 1]))
//! );
//! ```

pub mod lexer;
pub mod response;

pub use lexer::{Lexer, Token};
pub use response::{BodyStructure, FetchItem, Response, ResponseParser, UntaggedResponse};
