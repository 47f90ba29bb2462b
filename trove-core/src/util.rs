use std::fmt::Write;

use crate::Value;

pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Renders positional parameters for diagnostics: `$1 = 5, $2 = 'text'`.
pub fn format_params(params: &[Value]) -> String {
    let mut out = String::new();
    separated_by(
        &mut out,
        params.iter().enumerate(),
        |out, (i, v)| {
            let _ = write!(out, "${} = {}", i + 1, v);
        },
        ", ",
    );
    out
}

/// True for the characters a placeholder name is made of.
pub(crate) fn is_word_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Longest prefix of `text` not exceeding `len` bytes that ends on a char boundary.
pub fn prefix_within(text: &str, len: usize) -> &str {
    if text.len() <= len {
        return text;
    }
    let mut end = len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            $crate::prefix_within(&$query, 497).trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}
