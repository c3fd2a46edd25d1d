//! `Date` header parsing.

use chrono::{DateTime, FixedOffset, NaiveDateTime};

/// Parses an RFC 5322 date, tolerating common deviations: trailing
/// comments such as `(UTC)`, missing weekday, two-digit years and
/// RFC 3339 timestamps.
#[must_use]
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let cleaned = strip_comments(value);
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(date) = DateTime::parse_from_rfc2822(&cleaned) {
        return Some(date);
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(&cleaned) {
        return Some(date);
    }

    // Drop a weekday chrono rejected (e.g. "Thur,") and retry.
    let without_weekday = cleaned
        .split_once(',')
        .map_or(cleaned.as_str(), |(_, rest)| rest.trim());
    for format in ["%d %b %Y %H:%M:%S %z", "%d %b %y %H:%M:%S %z", "%d %b %Y %H:%M %z"] {
        if let Ok(date) = DateTime::parse_from_str(without_weekday, format) {
            return Some(date);
        }
    }

    // No zone at all: assume UTC.
    NaiveDateTime::parse_from_str(without_weekday, "%d %b %Y %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

fn strip_comments(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut depth = 0u32;
    for c in value.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
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
    fn test_rfc2822() {
        let date = parse_date("Tue, 05 Mar 2024 10:15:00 +0900").unwrap();
        assert_eq!(date.timestamp_millis(), 1_709_601_300_000);
    }

    #[test]
    fn test_trailing_comment() {
        let date = parse_date("Tue, 5 Mar 2024 01:15:00 +0000 (UTC)").unwrap();
        assert_eq!(date.timestamp_millis(), 1_709_601_300_000);
    }

    #[test]
    fn test_bad_weekday() {
        let date = parse_date("Thur, 07 Mar 2024 08:00:00 -0500").unwrap();
        assert_eq!(date.to_rfc3339(), "2024-03-07T08:00:00-05:00");
    }

    #[test]
    fn test_missing_zone_is_utc() {
        let date = parse_date("7 Mar 2024 08:00:00").unwrap();
        assert_eq!(date.to_rfc3339(), "2024-03-07T08:00:00+00:00");
    }

    #[test]
    fn test_garbage() {
        assert!(parse_date("").is_none());
        assert!(parse_date("yesterday").is_none());
    }
}
