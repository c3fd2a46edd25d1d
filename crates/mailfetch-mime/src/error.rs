//! Failures when reading a fetched message.
//!
//! Decoding is lossy rather than fallible: broken transfer encodings,
//! unknown charsets and malformed encoded words degrade to replacement
//! text. What remains are inputs that are not a message at all.

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a raw message could not be read.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `Content-Type` value without a `type/subtype` pair.
    #[error("invalid content type: {0:?}")]
    InvalidContentType(String),

    /// Multipart nesting beyond the supported depth.
    #[error("multipart nested deeper than {limit} levels")]
    TooDeep {
        /// Deepest nesting accepted.
        limit: usize,
    },

    /// Input that cannot be a message, such as an empty body or one
    /// without a header section.
    #[error("not a message: {0}")]
    NotAMessage(&'static str),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::TooDeep { limit: 32 }.to_string(),
            "multipart nested deeper than 32 levels"
        );
        assert_eq!(
            Error::NotAMessage("empty input").to_string(),
            "not a message: empty input"
        );
        assert_eq!(
            Error::InvalidContentType("text".into()).to_string(),
            "invalid content type: \"text\""
        );
    }
}
