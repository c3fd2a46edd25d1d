//! Transfer and header decoding.
//!
//! Decoders here are lenient: mail in the wild routinely breaks the
//! letter of RFC 2045/2047, and a stray byte should cost one character,
//! not the message.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use mail_parser::decoders::charsets::map::charset_decoder;

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decodes Base64, skipping every byte outside the alphabet.
///
/// A dangling final character that cannot form a byte is dropped.
#[must_use]
pub fn decode_base64(data: &[u8]) -> Vec<u8> {
    let mut cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/')
        .collect();
    if cleaned.len() % 4 == 1 {
        cleaned.pop();
    }
    LENIENT_BASE64.decode(cleaned).unwrap_or_default()
}

/// Decodes Quoted-Printable (RFC 2045 section 6.7).
///
/// Soft line breaks are removed. A malformed escape is kept literally.
#[must_use]
pub fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let b = data[i];
        if b != b'=' {
            out.push(b);
            i += 1;
            continue;
        }

        match (data.get(i + 1), data.get(i + 2)) {
            (Some(b'\r'), Some(b'\n')) => i += 3,
            (Some(b'\n'), _) => i += 2,
            (Some(&hi), Some(&lo)) => match (hex_value(hi), hex_value(lo)) {
                (Some(hi), Some(lo)) => {
                    out.push((hi << 4) | lo);
                    i += 3;
                }
                _ => {
                    out.push(b'=');
                    i += 1;
                }
            },
            _ => {
                out.push(b'=');
                i += 1;
            }
        }
    }

    out
}

const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

/// Converts bytes in `charset` to a string.
///
/// Any charset with a registered name or alias is supported. Unknown
/// charsets are treated as UTF-8; invalid sequences become U+FFFD.
#[must_use]
pub fn decode_charset(bytes: &[u8], charset: &str) -> String {
    let label = charset.trim().trim_matches('"').to_ascii_lowercase();
    match label.as_str() {
        "utf-8" | "utf8" | "us-ascii" | "ascii" | "" => String::from_utf8_lossy(bytes).into_owned(),
        _ => charset_decoder(label.as_bytes()).map_or_else(
            || String::from_utf8_lossy(bytes).into_owned(),
            |decode| decode(bytes),
        ),
    }
}

/// Decodes RFC 2047 encoded words anywhere in a header value.
///
/// Whitespace between two adjacent encoded words is dropped; text that
/// is not a well-formed encoded word passes through untouched.
#[must_use]
pub fn decode_rfc2047(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut after_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);
        if let Some((decoded, consumed)) = decode_word(candidate) {
            if !(after_word && before.chars().all(char::is_whitespace)) {
                out.push_str(before);
            }
            out.push_str(&decoded);
            rest = &candidate[consumed..];
            after_word = true;
        } else {
            out.push_str(before);
            out.push_str("=?");
            rest = &candidate[2..];
            after_word = false;
        }
    }

    out.push_str(rest);
    out
}

/// Decodes one `=?charset?enc?text?=` word at the start of `s`, returning
/// the text and the number of bytes consumed.
fn decode_word(s: &str) -> Option<(String, usize)> {
    let inner = s.strip_prefix("=?")?;
    let (charset, inner) = inner.split_once('?')?;
    let (encoding, inner) = inner.split_once('?')?;
    let end = inner.find("?=")?;
    let payload = &inner[..end];
    if payload.contains(char::is_whitespace) || charset.is_empty() {
        return None;
    }

    let bytes = match encoding {
        "B" | "b" => decode_base64(payload.as_bytes()),
        "Q" | "q" => decode_quoted_printable(payload.replace('_', " ").as_bytes()),
        _ => return None,
    };

    let consumed = s.len() - inner.len() + end + 2;
    // RFC 2231 allows a language suffix: utf-8*en
    let charset = charset.split('*').next().unwrap_or(charset);
    Some((decode_charset(&bytes, charset), consumed))
}

/// Decodes `%XX` escapes (RFC 2231 extended parameter values).
#[must_use]
pub fn decode_percent(value: &str) -> Vec<u8> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).copied().and_then(hex_value),
                bytes.get(i + 2).copied().and_then(hex_value),
            )
        {
            out.push((hi << 4) | lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_decode_ignores_line_breaks() {
        let decoded = decode_base64(b"SGVsbG8s\r\nIFdvcmxkIQ==\r\n");
        assert_eq!(decoded, b"Hello, World!");
    }

    #[test]
    fn test_base64_decode_skips_stray_bytes() {
        assert_eq!(decode_base64(b"aGVsbG8!gd29ybGQ="), b"hello world");
        assert_eq!(decode_base64(b"aGk=\x00\xff*"), b"hi");
        assert_eq!(decode_base64(b"aGkx Z"), b"hi1");
        assert!(decode_base64(b"***").is_empty());
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable(b"Hello, World!"), b"Hello, World!");
        assert_eq!(
            String::from_utf8(decode_quoted_printable(b"H=C3=A9llo")).unwrap(),
            "Héllo"
        );
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        assert_eq!(decode_quoted_printable(b"Hello=\r\nWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"Hello=\nWorld"), b"HelloWorld");
    }

    #[test]
    fn test_quoted_printable_keeps_malformed_escape() {
        assert_eq!(decode_quoted_printable(b"100=%"), b"100=%");
        assert_eq!(decode_quoted_printable(b"a=zz"), b"a=zz");
        assert_eq!(decode_quoted_printable(b"end="), b"end=");
    }

    #[test]
    fn test_rfc2047_plain_text_passes_through() {
        assert_eq!(decode_rfc2047("Hello"), "Hello");
        assert_eq!(decode_rfc2047("a =? b"), "a =? b");
    }

    #[test]
    fn test_rfc2047_base64_word() {
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?="), "Héllo");
    }

    #[test]
    fn test_rfc2047_q_word() {
        assert_eq!(decode_rfc2047("=?utf-8?Q?H=C3=A9llo_there?="), "Héllo there");
        assert_eq!(decode_rfc2047("=?ISO-8859-1?q?caf=E9?="), "café");
    }

    #[test]
    fn test_rfc2047_adjacent_words_join() {
        assert_eq!(
            decode_rfc2047("=?utf-8?Q?Quarterly?=  =?utf-8?Q?_report?="),
            "Quarterly report"
        );
        assert_eq!(decode_rfc2047("Re: =?utf-8?B?SMOpbGxv?= world"), "Re: Héllo world");
    }

    #[test]
    fn test_rfc2047_mixed_case_korean() {
        // "안녕" in UTF-8, base64
        assert_eq!(decode_rfc2047("=?UTF-8?B?7JWI64WV?="), "안녕");
    }

    #[test]
    fn test_decode_charset_latin1() {
        assert_eq!(decode_charset(&[0x63, 0x61, 0x66, 0xE9], "ISO-8859-1"), "café");
        assert_eq!(decode_charset("café".as_bytes(), "utf-8"), "café");
    }

    #[test]
    fn test_decode_charset_windows_1252() {
        assert_eq!(decode_charset(b"\x93hi\x94 \x80", "windows-1252"), "\u{201c}hi\u{201d} \u{20ac}");
        assert_eq!(
            decode_rfc2047("=?windows-1252?Q?=93hi=94_=80?="),
            "\u{201c}hi\u{201d} \u{20ac}"
        );
    }

    #[test]
    fn test_decode_charset_koi8_r() {
        let privet = b"\xf0\xd2\xc9\xd7\xc5\xd4";
        assert_eq!(decode_charset(privet, "koi8-r"), "Привет");
        assert_eq!(decode_charset(privet, "\"KOI8-R\""), "Привет");
        assert_eq!(decode_rfc2047("=?KOI8-R?B?8NLJ18XU?="), "Привет");
    }

    #[test]
    fn test_decode_charset_unknown_falls_back_to_utf8() {
        assert_eq!(decode_charset("naïve".as_bytes(), "x-made-up"), "naïve");
    }

    #[test]
    fn test_decode_percent() {
        assert_eq!(decode_percent("na%C3%AFve%20file"), "naïve file".as_bytes());
        assert_eq!(decode_percent("100%"), b"100%");
    }
}
