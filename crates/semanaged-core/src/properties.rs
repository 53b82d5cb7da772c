//! Parsing of `.properties` text
//!
//! Supports the usual format: `#` and `!` comments, `=`, `:` or whitespace
//! between key and value, backslash line continuations and the escapes
//! `\t \n \r \f \uXXXX`. Any other escaped character stands for itself.
//! Byte input is read as ISO-8859-1, so characters outside Latin-1 need a
//! `\uXXXX` escape.

use std::collections::BTreeMap;
use std::io::Read;

use crate::{Error, Result};

/// Parse ISO-8859-1 encoded properties from a reader
pub fn parse(reader: &mut dyn Read) -> Result<BTreeMap<String, String>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(|e| {
        Error::properties(
            format!("Could not load system properties: {}", e),
            "Check that the system properties resource is readable",
        )
    })?;
    let content: String = bytes.iter().copied().map(char::from).collect();
    parse_str(&content)
}

/// Parse properties from a string
pub fn parse_str(content: &str) -> Result<BTreeMap<String, String>> {
    let mut properties = BTreeMap::new();

    for (line_number, line) in logical_lines(content) {
        let (key, value) = split_key_value(&line);
        let key = unescape(key, line_number)?;
        let value = unescape(value, line_number)?;
        properties.insert(key, value);
    }

    Ok(properties)
}

/// Join continuation lines, skipping blanks and comments.
///
/// Yields the 1-based number of the first physical line with each logical
/// line.
fn logical_lines(content: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut current: Option<(usize, String)> = None;

    for (index, raw) in content.lines().enumerate() {
        let trimmed = raw.trim_start();

        let continuing = current.is_some();
        if !continuing && (trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!'))
        {
            continue;
        }

        let (number, mut text) = current.take().unwrap_or((index + 1, String::new()));
        if ends_with_continuation(trimmed) {
            text.push_str(&trimmed[..trimmed.len() - 1]);
            current = Some((number, text));
        } else {
            text.push_str(trimmed);
            lines.push((number, text));
        }
    }

    if let Some(pending) = current {
        lines.push(pending);
    }

    lines
}

/// An odd number of trailing backslashes continues the line
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Split at the first unescaped `=`, `:` or whitespace
fn split_key_value(line: &str) -> (&str, &str) {
    let mut escaped = false;

    for (index, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..index], line[index + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[index..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return (&line[..index], rest.trim_start());
            }
            _ => {}
        }
    }

    (line, "")
}

fn unescape(text: &str, line_number: usize) -> Result<String> {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }

        match chars.next() {
            Some('t') => result.push('\t'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('f') => result.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = Some(&hex)
                    .filter(|hex| hex.len() == 4 && hex.chars().all(|c| c.is_ascii_hexdigit()))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        Error::properties(
                            format!(
                                "Could not load system properties: malformed \\uXXXX escape on line {}: \\u{}",
                                line_number, hex
                            ),
                            "Use exactly four hexadecimal digits after \\u",
                        )
                    })?;
                result.push(decoded);
            }
            Some(other) => result.push(other),
            None => {}
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators() {
        let properties = parse_str("a=1\nb: 2\nc 3\nd = 4\ne\n").unwrap();

        assert_eq!(properties["a"], "1");
        assert_eq!(properties["b"], "2");
        assert_eq!(properties["c"], "3");
        assert_eq!(properties["d"], "4");
        assert_eq!(properties["e"], "");
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let properties = parse_str("# comment\n! also a comment\n\n   \nkey=value\n").unwrap();
        assert_eq!(properties.len(), 1);
        assert_eq!(properties["key"], "value");
    }

    #[test]
    fn test_continuation_lines() {
        let content = "fruits = apple, banana, \\\n         cherry\nnext=1\n";
        let properties = parse_str(content).unwrap();

        assert_eq!(properties["fruits"], "apple, banana, cherry");
        assert_eq!(properties["next"], "1");
    }

    #[test]
    fn test_escapes() {
        let content = "path\\ with\\ spaces=c:\\\\temp\ntab=a\\tb\nunicode=\\u00e9t\\u00e9\nkey\\=eq=v\n";
        let properties = parse_str(content).unwrap();

        assert_eq!(properties["path with spaces"], "c:\\temp");
        assert_eq!(properties["tab"], "a\tb");
        assert_eq!(properties["unicode"], "été");
        assert_eq!(properties["key=eq"], "v");
    }

    #[test]
    fn test_malformed_unicode_escape() {
        let result = parse_str("bad=\\u12\n");
        assert!(matches!(result, Err(Error::Properties { .. })));
    }

    #[test]
    fn test_later_keys_override() {
        let properties = parse_str("k=1\nk=2\n").unwrap();
        assert_eq!(properties["k"], "2");
    }

    #[test]
    fn test_parse_reader() {
        let mut input: &[u8] = b"greeting=hello\n";
        let properties = parse(&mut input).unwrap();
        assert_eq!(properties["greeting"], "hello");
    }

    #[test]
    fn test_parse_reader_latin1() {
        let mut input: &[u8] = b"name=caf\xe9\n";
        let properties = parse(&mut input).unwrap();
        assert_eq!(properties["name"], "caf\u{e9}");
    }

    #[test]
    fn test_unicode_escape_rejects_sign() {
        let result = parse_str("bad=\\u+123\n");
        assert!(matches!(result, Err(Error::Properties { .. })));
    }
}
