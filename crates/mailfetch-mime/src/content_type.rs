//! `Content-Type` and `Content-Disposition` values.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::encoding::{decode_charset, decode_percent, decode_rfc2047};
use crate::error::{Error, Result};

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters with lowercase names (e.g., charset=utf-8, boundary=xxx).
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: HashMap::new(),
        }
    }

    /// `text/plain; charset=us-ascii`, the RFC 2045 default.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "us-ascii")
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary").map(String::as_str)
    }

    /// Returns the legacy `name` parameter, used as a filename fallback.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.parameters.get("name").map(String::as_str)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// True for `text/<sub>`.
    #[must_use]
    pub fn is(&self, main: &str, sub: &str) -> bool {
        self.main_type == main && self.sub_type == sub
    }

    /// `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`. Type,
    /// subtype and parameter names are lowercased.
    ///
    /// # Errors
    ///
    /// Returns an error if the `type/subtype` part is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let mut segments = split_parameters(s).into_iter();
        let type_str = segments.next().unwrap_or_default().trim();

        let (main_type, sub_type) = type_str
            .split_once('/')
            .map(|(main, sub)| (main.trim().to_lowercase(), sub.trim().to_lowercase()))
            .filter(|(main, sub)| !main.is_empty() && !sub.is_empty())
            .ok_or_else(|| Error::InvalidContentType(s.trim().to_string()))?;

        Ok(Self {
            main_type,
            sub_type,
            parameters: parse_parameters(segments),
        })
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)
    }
}

/// `Content-Disposition` header value (RFC 2183).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// `inline`, `attachment` or an extension token, lowercased.
    pub kind: String,
    /// Parameters with lowercase names.
    pub parameters: HashMap<String, String>,
}

impl ContentDisposition {
    /// Parses a disposition value. An empty value yields `attachment`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let mut segments = split_parameters(s).into_iter();
        let kind = segments
            .next()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| "attachment".to_string());
        Self {
            kind,
            parameters: parse_parameters(segments),
        }
    }

    /// True for `attachment`.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == "attachment"
    }

    /// The `filename` parameter, RFC 2047/2231 decoded.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.parameters.get("filename").map(String::as_str)
    }
}

/// Splits on `;` outside quoted strings.
fn split_parameters(s: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quote => escaped = true,
            '"' => in_quote = !in_quote,
            ';' if !in_quote => {
                segments.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&s[start..]);
    segments
}

/// Parses `key=value` segments, joining RFC 2231 continuations
/// (`name*0=`, `name*1*=`) and decoding extended values (`name*=utf-8''..`).
fn parse_parameters<'a>(segments: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
    let mut parameters = HashMap::new();
    let mut continued: BTreeMap<(String, u32), (bool, String)> = BTreeMap::new();

    for segment in segments {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = unquote(value.trim());

        let (name, extended) = key
            .strip_suffix('*')
            .map_or((key.as_str(), false), |name| (name, true));
        if let Some((base, index)) = name.split_once('*')
            && let Ok(index) = index.parse::<u32>()
        {
            continued.insert((base.to_string(), index), (extended, value));
        } else if extended {
            parameters.insert(name.to_string(), decode_extended(&value));
        } else {
            parameters.insert(name.to_string(), decode_rfc2047(&value));
        }
    }

    let mut joined: BTreeMap<String, (Option<String>, Vec<u8>)> = BTreeMap::new();
    for ((name, index), (extended, value)) in continued {
        let entry = joined.entry(name).or_default();
        if extended {
            let encoded = if index == 0 {
                // charset'language'text
                let mut fields = value.splitn(3, '\'');
                match (fields.next(), fields.next(), fields.next()) {
                    (Some(charset), Some(_), Some(text)) => {
                        entry.0 = Some(charset.to_string());
                        text.to_string()
                    }
                    _ => value,
                }
            } else {
                value
            };
            entry.1.extend(decode_percent(&encoded));
        } else {
            entry.1.extend_from_slice(value.as_bytes());
        }
    }
    for (name, (charset, bytes)) in joined {
        let value = decode_charset(&bytes, charset.as_deref().unwrap_or("utf-8"));
        parameters.entry(name).or_insert(value);
    }

    parameters
}

fn decode_extended(value: &str) -> String {
    let mut fields = value.splitn(3, '\'');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(charset), Some(_), Some(text)) => decode_charset(&decode_percent(text), charset),
        _ => value.to_string(),
    }
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
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
    fn test_content_type_new() {
        let ct = ContentType::new("text", "plain");
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert!(ct.parameters.is_empty());
    }

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("Text/HTML; Charset=utf-8").unwrap();
        assert!(ct.is("text", "html"));
        assert_eq!(ct.charset(), Some("utf-8"));
        assert_eq!(ct.essence(), "text/html");
    }

    #[test]
    fn test_content_type_parse_quoted_boundary() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part_1;2\"").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("----=_Part_1;2"));
    }

    #[test]
    fn test_content_type_parse_rejects_missing_subtype() {
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("").is_err());
        assert!(ContentType::parse("/plain").is_err());
    }

    #[test]
    fn test_content_type_name_is_decoded() {
        let ct = ContentType::parse("application/pdf; name=\"=?utf-8?B?7JWI64WV?=.pdf\"").unwrap();
        assert_eq!(ct.name(), Some("안녕.pdf"));
    }

    #[test]
    fn test_disposition_filename() {
        let cd = ContentDisposition::parse("attachment; filename=\"report, final.pdf\"");
        assert!(cd.is_attachment());
        assert_eq!(cd.filename(), Some("report, final.pdf"));
    }

    #[test]
    fn test_disposition_extended_filename() {
        let cd = ContentDisposition::parse("attachment; filename*=UTF-8''na%C3%AFve.txt");
        assert_eq!(cd.filename(), Some("naïve.txt"));
    }

    #[test]
    fn test_disposition_continuations() {
        let cd = ContentDisposition::parse(
            "inline; filename*0*=utf-8''caf%C3%A9; filename*1=\"_menu.png\"",
        );
        assert!(!cd.is_attachment());
        assert_eq!(cd.filename(), Some("café_menu.png"));
    }

    #[test]
    fn test_disposition_empty_defaults_to_attachment() {
        assert!(ContentDisposition::parse("").is_attachment());
    }

    #[test]
    fn test_content_type_display() {
        let ct = ContentType::text_plain();
        assert_eq!(ct.to_string(), "text/plain");
    }
}
