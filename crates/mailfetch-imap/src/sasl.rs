//! SASL XOAUTH2 initial response.
//!
//! Format: `user=<user>\x01auth=Bearer <token>\x01\x01`, base64 encoded.
//! The result carries the bearer token and must never be logged.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Mechanism name sent with `AUTHENTICATE`.
pub const XOAUTH2: &str = "XOAUTH2";

/// Builds the base64 XOAUTH2 initial client response.
///
/// ```
/// use mailfetch_imap::sasl::xoauth2_response;
///
/// let blob = xoauth2_response("user@example.com", "ya29.token");
/// assert!(!blob.contains("ya29"));
/// ```
#[must_use]
pub fn xoauth2_response(user: &str, token: &str) -> String {
    let auth_string = format!("user={user}\x01auth=Bearer {token}\x01\x01");
    STANDARD.encode(auth_string.as_bytes())
}

/// Decodes a server's base64 error challenge, if it is valid UTF-8.
///
/// Providers send a JSON status document here when the token is rejected.
#[must_use]
pub fn decode_challenge(challenge: &str) -> Option<String> {
    let bytes = STANDARD.decode(challenge.trim()).ok()?;
    String::from_utf8(bytes).ok()
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
    fn test_xoauth2_layout() {
        let blob = xoauth2_response("user@example.com", "ya29.token");
        let decoded = STANDARD.decode(blob).unwrap();
        assert_eq!(
            decoded,
            b"user=user@example.com\x01auth=Bearer ya29.token\x01\x01"
        );
    }

    #[test]
    fn test_xoauth2_known_vector() {
        assert_eq!(
            xoauth2_response("a", "b"),
            "dXNlcj1hAWF1dGg9QmVhcmVyIGIBAQ=="
        );
    }

    #[test]
    fn test_decode_challenge() {
        let challenge = STANDARD.encode(r#"{"status":"401"}"#);
        assert_eq!(
            decode_challenge(&challenge).as_deref(),
            Some(r#"{"status":"401"}"#)
        );
        assert_eq!(decode_challenge("not base64!"), None);
    }
}
