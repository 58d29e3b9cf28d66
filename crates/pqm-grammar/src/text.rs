//! Identifier classification and text literal escaping.

/// Determines if the given character can start an identifier segment.
fn is_segment_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

/// Determines if the given character can continue an identifier segment.
fn is_segment_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Determines if the given text is a regular identifier such as
/// `Foo` or `Text.From`.
///
/// When `allow_trailing_period` is true, a single trailing period is
/// accepted; editors use this to classify identifiers mid-edit.
pub fn is_regular_identifier(text: &str, allow_trailing_period: bool) -> bool {
    let text = match text.strip_suffix('.') {
        Some(prefix) if allow_trailing_period => prefix,
        Some(_) => return false,
        None => text,
    };

    if text.is_empty() {
        return false;
    }

    text.split('.').all(|segment| {
        let mut chars = segment.chars();
        match chars.next() {
            Some(c) if is_segment_start(c) => chars.all(is_segment_continue),
            _ => false,
        }
    })
}

/// Determines if the given text is a generalized identifier such as
/// `Column Name` or `Today.High`.
///
/// Generalized identifiers admit internal spaces and dotted segments
/// but reject consecutive periods.
pub fn is_generalized_identifier(text: &str) -> bool {
    if text.is_empty() || text.starts_with(' ') || text.ends_with(' ') {
        return false;
    }

    if text.contains("..") {
        return false;
    }

    text.split(' ').all(|word| {
        !word.is_empty()
            && !word.starts_with('.')
            && !word.ends_with('.')
            && word
                .split('.')
                .all(|segment| !segment.is_empty() && segment.chars().all(is_segment_continue))
    })
}

/// Determines if the given text is a quoted identifier such as
/// `#"a name"`, with paired-quote escapes in the content.
pub fn is_quoted_identifier(text: &str) -> bool {
    let content = match text.strip_prefix("#\"") {
        Some(content) => content,
        None => return false,
    };

    // The content must end with a closing quote that is not part of a
    // doubled pair.
    let mut chars = content.chars().peekable();
    loop {
        match chars.next() {
            Some('"') => match chars.peek() {
                Some('"') => {
                    chars.next();
                }
                Some(_) => return false,
                None => return true,
            },
            Some(_) => {}
            None => return false,
        }
    }
}

/// Strips the quoting from a quoted identifier when its content is a
/// regular identifier; otherwise returns the text unchanged.
pub fn normalize_identifier(text: &str) -> &str {
    if !is_quoted_identifier(text) {
        return text;
    }

    let content = &text[2..text.len() - 1];
    if content.contains('"') {
        // A doubled quote can never be part of a regular identifier.
        return text;
    }

    if is_regular_identifier(content, false) {
        content
    } else {
        text
    }
}

/// Quotes the given identifier text as `#"…"`, doubling any quotes in
/// the content.
pub fn quote_identifier(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 4);
    quoted.push_str("#\"");
    for c in text.chars() {
        if c == '"' {
            quoted.push('"');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Escapes raw text into the escape sequences used by M text
/// literals.
///
/// Carriage return / line feed pairs produce the canonical combined
/// sequence `#(cr,lf)`.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '#' => escaped.push_str("#(#)"),
            '\t' => escaped.push_str("#(tab)"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                    escaped.push_str("#(cr,lf)");
                } else {
                    escaped.push_str("#(cr)");
                }
            }
            '\n' => escaped.push_str("#(lf)"),
            '"' => escaped.push_str("\"\""),
            c => escaped.push(c),
        }
    }

    escaped
}

/// Resolves a single escape name from an `#(…)` sequence.
fn resolve_escape_name(name: &str) -> Option<&'static str> {
    match name {
        "cr" => Some("\r"),
        "lf" => Some("\n"),
        "tab" => Some("\t"),
        "#" => Some("#"),
        _ => None,
    }
}

/// Unescapes the escape sequences used by M text literals back into
/// raw text.
///
/// `#(…)` sequences may carry a comma-separated list of escape names
/// (e.g. `#(cr,lf)`). Unrecognized sequences are left verbatim.
pub fn unescape(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if c == '"' && rest.starts_with("\"\"") {
            unescaped.push('"');
            rest = &rest[2..];
            continue;
        }

        if c == '#' {
            if let Some(after) = rest.strip_prefix("#(") {
                if let Some(end) = after.find(')') {
                    let names = &after[..end];
                    let resolved: Option<String> = names
                        .split(',')
                        .map(resolve_escape_name)
                        .collect::<Option<Vec<_>>>()
                        .map(|parts| parts.concat());
                    if let Some(resolved) = resolved {
                        unescaped.push_str(&resolved);
                        rest = &after[end + 1..];
                        continue;
                    }
                }
            }
        }

        unescaped.push(c);
        rest = &rest[c.len_utf8()..];
    }

    unescaped
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn regular_identifiers() {
        assert!(is_regular_identifier("foo", false));
        assert!(is_regular_identifier("_foo1", false));
        assert!(is_regular_identifier("Text.From", false));
        assert!(!is_regular_identifier("", false));
        assert!(!is_regular_identifier("1foo", false));
        assert!(!is_regular_identifier("Text..From", false));
        assert!(!is_regular_identifier("Text.", false));
        assert!(is_regular_identifier("Text.", true));
        assert!(!is_regular_identifier("a b", false));
    }

    #[test]
    fn generalized_identifiers() {
        assert!(is_generalized_identifier("Column Name"));
        assert!(is_generalized_identifier("Today.High"));
        assert!(is_generalized_identifier("Column 1"));
        assert!(!is_generalized_identifier("Today..High"));
        assert!(!is_generalized_identifier(" padded"));
        assert!(!is_generalized_identifier("padded "));
        assert!(!is_generalized_identifier(""));
    }

    #[test]
    fn quoted_identifiers() {
        assert!(is_quoted_identifier(r#"#"a name""#));
        assert!(is_quoted_identifier(r#"#"with ""quotes""""#));
        assert!(!is_quoted_identifier(r#""a name""#));
        assert!(!is_quoted_identifier(r##"#"unterminated"##));
        assert!(!is_quoted_identifier(r#"#"trailing" junk"#));
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_identifier(r##"#"foo""##), "foo");
        assert_eq!(normalize_identifier(r##"#"a b""##), r##"#"a b""##);
        assert_eq!(normalize_identifier("foo"), "foo");

        // Normalization is idempotent.
        let once = normalize_identifier(r##"#"Text.From""##);
        assert_eq!(normalize_identifier(once), once);
    }

    #[test]
    fn quoting() {
        assert_eq!(quote_identifier("a b"), r#"#"a b""#);
        assert_eq!(quote_identifier(r#"a"b"#), r#"#"a""b""#);
    }

    #[test]
    fn escape_sequences() {
        assert_eq!(escape("a\tb"), "a#(tab)b");
        assert_eq!(escape("a\r\nb"), "a#(cr,lf)b");
        assert_eq!(escape("a\rb"), "a#(cr)b");
        assert_eq!(escape("a#b"), "a#(#)b");
        assert_eq!(escape(r#"say "hi""#), r#"say ""hi"""#);
    }

    #[test]
    fn unescape_sequences() {
        assert_eq!(unescape("a#(tab)b"), "a\tb");
        assert_eq!(unescape("a#(cr,lf)b"), "a\r\nb");
        assert_eq!(unescape("a#(#)b"), "a#b");
        assert_eq!(unescape(r#"say ""hi"""#), r#"say "hi""#);
        assert_eq!(unescape("a#(unknown)b"), "a#(unknown)b");
    }

    #[test]
    fn escape_round_trips() {
        for text in ["a\tb", "line1\r\nline2", "#raw", "plain", "\"q\""] {
            assert_eq!(unescape(&escape(text)), text);
        }

        for escaped in ["a#(tab)b", "#(cr,lf)", "#(#)(tab)", "plain"] {
            assert_eq!(escape(&unescape(escaped)), escaped);
        }
    }
}
