//! Named placeholder lexer.
//!
//! A placeholder is `:` followed by one or more ASCII word characters. Quoted
//! literals, quoted identifiers, comments and dollar quoted blocks are skipped,
//! `::` is always a cast. The scanner never fails, malformed input just yields
//! the placeholders that can be identified.

use crate::util::is_word_byte;

/// One occurrence of a named placeholder, offsets are in bytes and `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedParameter {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

/// Finds every `:name` placeholder of `sql` in order of appearance.
pub fn parse_parameters(sql: &str) -> Vec<ParsedParameter> {
    let bytes = sql.as_bytes();
    let mut result = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        i = match bytes[i] {
            b'\'' => skip_quoted(bytes, i, b'\'', is_escape_string(bytes, i)),
            b'"' => skip_quoted(bytes, i, b'"', false),
            b'-' if bytes.get(i + 1) == Some(&b'-') => skip_line_comment(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => skip_block_comment(bytes, i),
            b'$' => match dollar_tag(bytes, i) {
                Some(tag_end) => {
                    let tag = &bytes[i..tag_end];
                    match find(bytes, tag_end, tag) {
                        Some(close) => close + tag.len(),
                        None => {
                            // Unterminated block, the rest of the input is still code
                            log::debug!(
                                "Dollar quoted block `{}` is never closed",
                                String::from_utf8_lossy(tag)
                            );
                            tag_end
                        }
                    }
                }
                None => i + 1,
            },
            b':' => {
                if bytes.get(i + 1) == Some(&b':') {
                    i + 2
                } else {
                    let end = i + 1 + bytes[i + 1..].iter().take_while(|c| is_word_byte(**c)).count();
                    if end > i + 1 {
                        result.push(ParsedParameter {
                            name: sql[i + 1..end].to_owned(),
                            start: i,
                            end,
                        });
                    }
                    end
                }
            }
            _ => i + 1,
        };
    }
    result
}

/// `E'...'` and `e'...'` literals treat backslash as an escape character.
fn is_escape_string(bytes: &[u8], quote: usize) -> bool {
    quote > 0
        && matches!(bytes[quote - 1], b'E' | b'e')
        && (quote < 2 || !is_word_byte(bytes[quote - 2]))
}

/// Returns the position right after the closing quote, or the end of input.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8, backslash: bool) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        let c = bytes[i];
        if backslash && c == b'\\' {
            i += 2;
        } else if c == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
            } else {
                return i + 1;
            }
        } else {
            i += 1;
        }
    }
    bytes.len()
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|c| *c == b'\n')
        .map_or(bytes.len(), |p| start + p + 1)
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1)) {
            (b'/', Some(b'*')) => {
                depth += 1;
                i += 2;
            }
            (b'*', Some(b'/')) => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Recognizes `$$` or `$tag$` at `start`, returning the position after the marker.
/// Positional parameters like `$1` and identifiers containing `$` are not markers.
fn dollar_tag(bytes: &[u8], start: usize) -> Option<usize> {
    if start > 0 && (is_word_byte(bytes[start - 1]) || bytes[start - 1] == b'$') {
        return None;
    }
    let mut i = start + 1;
    if let Some(c) = bytes.get(i)
        && c.is_ascii_digit()
    {
        return None;
    }
    while let Some(c) = bytes.get(i) {
        match c {
            b'$' => return Some(i + 1),
            c if is_word_byte(*c) => i += 1,
            _ => return None,
        }
    }
    None
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(sql: &str) -> Vec<String> {
        parse_parameters(sql).into_iter().map(|p| p.name).collect()
    }

    #[test]
    fn offsets() {
        let sql = "SELECT * FROM book WHERE id = :id";
        let parsed = parse_parameters(sql);
        assert_eq!(parsed.len(), 1);
        assert_eq!(&sql[parsed[0].start..parsed[0].end], ":id");
    }

    #[test]
    fn dollar_numbers_are_not_tags() {
        assert_eq!(names("SELECT $1, :a, $2"), ["a"]);
    }

    #[test]
    fn block_comment_depth() {
        assert_eq!(skip_block_comment(b"/* /* */ */x", 0), 11);
        assert_eq!(skip_block_comment(b"/* /* */", 0), 8);
    }
}
