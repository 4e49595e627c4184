//! HTML escaping for `{{name}}` tags.

use std::borrow::Cow;

/// Escape `& " ' < >`.
///
/// An `&` that already starts a named entity (`&amp;`, `&copy;`) is kept.
/// Numeric references such as `&#39;` are escaped like any other `&`.
pub fn escape_html(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '"', '\'', '<', '>']) {
        return Cow::Borrowed(input);
    }

    let mut escaped = String::with_capacity(input.len() + input.len() / 4);
    for (i, c) in input.char_indices() {
        match c {
            '&' if starts_entity(&input[i + 1..]) => escaped.push('&'),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// `name;` directly after an ampersand, where the name is word characters.
fn starts_entity(rest: &str) -> bool {
    let len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    len > 0 && rest[len..].starts_with(';')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_special_characters() {
        assert_eq!(escape_html("<a>&'\""), "&lt;a&gt;&amp;&#39;&quot;");
    }

    #[test]
    fn test_keeps_existing_entities() {
        assert_eq!(escape_html("&amp; &copy; &nbsp_x;"), "&amp; &copy; &nbsp_x;");
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html("&;"), "&amp;;");
    }

    #[test]
    fn test_numeric_references_are_escaped() {
        assert_eq!(escape_html("&#39; &#x27;"), "&amp;#39; &amp;#x27;");
        assert_eq!(escape_html("&#;"), "&amp;#;");
    }

    #[test]
    fn test_plain_text_is_borrowed() {
        assert!(matches!(escape_html("plain text"), Cow::Borrowed(_)));
    }
}
