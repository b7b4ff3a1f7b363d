//! iCalendar text escaping utilities.

/// Escapes text for iCalendar TEXT values (RFC 5545 §3.3.11).
///
/// Escapes: backslash, comma, semicolon, and newlines.
#[must_use]
pub fn escape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            ',' => result.push_str("\\,"),
            ';' => result.push_str("\\;"),
            '\n' => result.push_str("\\n"),
            '\r' => {}
            _ => result.push(c),
        }
    }
    result
}

/// Quotes a parameter value when it contains a delimiter, applying RFC 6868
/// caret encoding inside the quotes.
#[must_use]
pub fn escape_param_value(s: &str) -> String {
    if !s.chars().any(|c| matches!(c, ':' | ';' | ',' | '"' | '\n' | '^')) {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len() + 8);
    result.push('"');
    for c in s.chars() {
        match c {
            '^' => result.push_str("^^"),
            '\n' => result.push_str("^n"),
            '"' => result.push_str("^'"),
            _ => result.push(c),
        }
    }
    result.push('"');
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn escape_text_delimiters() {
        assert_eq!(escape_text("hello, world"), "hello\\, world");
        assert_eq!(escape_text("line1\r\nline2"), "line1\\nline2");
        assert_eq!(escape_text("semi;colon\\"), "semi\\;colon\\\\");
    }

    #[test_log::test]
    fn escape_param_value_quotes_only_when_needed() {
        assert_eq!(escape_param_value("Simple"), "Simple");
        assert_eq!(escape_param_value("Doe, Jane"), "\"Doe, Jane\"");
        assert_eq!(escape_param_value("Say \"hi\""), "\"Say ^'hi^'\"");
    }
}
