//! Command tags.
//!
//! Each command carries a tag that its tagged completion echoes back.

/// Produces `A0000`, `A0001`, ... for one connection.
///
/// Tags only need to be unique among commands in flight, and this client
/// never has more than one, so the counter simply wraps.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    counter: u32,
    prefix: char,
}

impl TagGenerator {
    /// Creates a generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { counter: 0, prefix }
    }

    /// Returns the next tag.
    #[must_use]
    pub fn next(&mut self) -> String {
        let n = self.counter;
        self.counter = self.counter.wrapping_add(1);
        format!("{}{:04}", self.prefix, n)
    }

    /// Number of tags issued so far (modulo 2^32).
    #[must_use]
    pub const fn issued(&self) -> u32 {
        self.counter
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
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

    #[test]
    fn test_sequential_tags() {
        let mut tags = TagGenerator::default();
        assert_eq!(tags.next(), "A0000");
        assert_eq!(tags.next(), "A0001");
        assert_eq!(tags.issued(), 2);
    }

    #[test]
    fn test_custom_prefix_and_padding() {
        let mut tags = TagGenerator::new('M');
        for _ in 0..100 {
            let _ = tags.next();
        }
        assert_eq!(tags.next(), "M0100");
    }

    #[test]
    fn test_wraps_instead_of_panicking() {
        let mut tags = TagGenerator {
            counter: u32::MAX,
            prefix: 'A',
        };
        assert_eq!(tags.next(), format!("A{}", u32::MAX));
        assert_eq!(tags.next(), "A0000");
    }
}
