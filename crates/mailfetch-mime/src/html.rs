//! Plain text to HTML rendering.

/// Renders plain text as HTML.
///
/// Paragraphs (separated by blank lines) become `<p>` elements, remaining
/// line breaks become `<br/>`, `http://` and `https://` URLs become links
/// and everything else is HTML-escaped. Empty input renders as an empty
/// string.
#[must_use]
pub fn text_to_html(text: &str) -> String {
    let mut html = String::with_capacity(text.len() + text.len() / 4);
    let mut paragraph: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            flush_paragraph(&mut html, &mut paragraph);
        } else {
            paragraph.push(line);
        }
    }
    flush_paragraph(&mut html, &mut paragraph);

    html
}

fn flush_paragraph(html: &mut String, lines: &mut Vec<&str>) {
    if lines.is_empty() {
        return;
    }
    html.push_str("<p>");
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            html.push_str("<br/>");
        }
        push_linkified(html, line);
    }
    html.push_str("</p>");
    lines.clear();
}

fn push_linkified(html: &mut String, line: &str) {
    let mut rest = line;
    while let Some(start) = find_url(rest) {
        push_escaped(html, &rest[..start]);

        let tail = &rest[start..];
        let end = tail
            .find(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '"'))
            .unwrap_or(tail.len());
        let url = tail[..end].trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '\'']);

        html.push_str("<a href=\"");
        push_escaped(html, url);
        html.push_str("\">");
        push_escaped(html, url);
        html.push_str("</a>");
        rest = &tail[url.len()..];
    }
    push_escaped(html, rest);
}

fn find_url(s: &str) -> Option<usize> {
    let http = s.find("http://");
    let https = s.find("https://");
    match (http, https) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn push_escaped(html: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => html.push_str("&amp;"),
            '<' => html.push_str("&lt;"),
            '>' => html.push_str("&gt;"),
            '"' => html.push_str("&quot;"),
            '\'' => html.push_str("&#39;"),
            _ => html.push(c),
        }
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
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_paragraphs_and_breaks() {
        assert_eq!(
            text_to_html("Hi Bob,\r\nsee below.\r\n\r\n\r\nThanks"),
            "<p>Hi Bob,<br/>see below.</p><p>Thanks</p>"
        );
    }

    #[test]
    fn test_escapes_markup() {
        assert_eq!(
            text_to_html("1 < 2 & \"x\""),
            "<p>1 &lt; 2 &amp; &quot;x&quot;</p>"
        );
    }

    #[test]
    fn test_links_urls() {
        assert_eq!(
            text_to_html("Docs: https://example.com/a?b=1&c=2."),
            "<p>Docs: <a href=\"https://example.com/a?b=1&amp;c=2\">https://example.com/a?b=1&amp;c=2</a>.</p>"
        );
    }

    #[test]
    fn test_link_inside_parentheses() {
        let html = text_to_html("see (http://x.org)");
        assert!(html.contains("<a href=\"http://x.org\">http://x.org</a>)"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(text_to_html(""), "");
        assert_eq!(text_to_html("\r\n\r\n"), "");
    }

    proptest! {
        #[test]
        fn prop_input_markup_is_always_escaped(text in "[a-z<>&\"' \r\n]{0,64}") {
            let html = text_to_html(&text);
            let stripped = html.replace("<p>", "").replace("</p>", "").replace("<br/>", "");
            prop_assert!(!stripped.contains('<'));
            prop_assert!(!stripped.contains('>'));
        }
    }
}
