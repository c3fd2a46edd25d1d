//! OAuth bearer credential for XOAUTH2.

use std::fmt;

use crate::{Error, Result};

/// Principal (usually the mailbox address) plus an OAuth access token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    principal: String,
    bearer_token: String,
}

impl Credential {
    /// Creates a credential. Nothing is checked until [`Credential::validate`].
    pub fn new(principal: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            bearer_token: bearer_token.into(),
        }
    }

    /// Account the token was issued for.
    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// The access token. Never log it.
    #[must_use]
    pub fn bearer_token(&self) -> &str {
        &self.bearer_token
    }

    /// Checks that both parts are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] when either part is empty.
    pub fn validate(&self) -> Result<()> {
        if self.principal.is_empty() {
            return Err(Error::Unauthorized("missing principal"));
        }
        if self.bearer_token.is_empty() {
            return Err(Error::Unauthorized("missing bearer token"));
        }
        Ok(())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("principal", &self.principal)
            .field("bearer_token", &"<redacted>")
            .finish()
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
    fn test_validate() {
        assert!(Credential::new("user@example.com", "ya29.token").validate().is_ok());
        for (principal, token) in [("", "x"), ("x", ""), ("", "")] {
            let err = Credential::new(principal, token).validate().unwrap_err();
            assert!(matches!(err, Error::Unauthorized(_)), "{principal:?}/{token:?}");
        }
    }

    #[test]
    fn test_validate_only_rejects_empty() {
        assert!(Credential::new("  ", "x").validate().is_ok());
        assert!(Credential::new("x", " ").validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_token() {
        let shown = format!("{:?}", Credential::new("user@example.com", "ya29.secret"));
        assert!(shown.contains("user@example.com"));
        assert!(!shown.contains("ya29.secret"));
    }
}
