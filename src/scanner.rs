//! Lexical skip primitives for T-SQL text.
//!
//! Every function takes the full text and a byte index pointing at an opening
//! delimiter, and returns the byte index just past the matching close. An
//! unterminated span consumes the rest of the text; none of these fail.
//!
//! All delimiters are ASCII, so the returned indices always fall on `char`
//! boundaries.

/// Characters allowed after `@` in a placeholder or variable name.
pub fn is_placeholder_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'#' | b'$')
}

/// Skip a `'...'` string literal. `''` is an escaped quote.
pub fn skip_single_quoted(text: &str, start: usize) -> usize {
    skip_doubling(text.as_bytes(), start, b'\'')
}

/// Skip a `"..."` quoted identifier. `""` is an escaped quote.
pub fn skip_double_quoted(text: &str, start: usize) -> usize {
    skip_doubling(text.as_bytes(), start, b'"')
}

/// Skip a `[...]` bracket identifier. `]]` is a literal `]`.
pub fn skip_bracketed(text: &str, start: usize) -> usize {
    skip_doubling(text.as_bytes(), start, b']')
}

/// Skip a `--` comment up to (not including) the line break.
pub fn skip_line_comment(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = start + 2;
    while i < bytes.len() && bytes[i] != b'\n' && bytes[i] != b'\r' {
        i += 1;
    }
    i.min(bytes.len())
}

/// Skip a `/* ... */` comment. Block comments do not nest.
pub fn skip_block_comment(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}

/// Skip a `@@name` system variable such as `@@ROWCOUNT`.
pub fn skip_system_variable(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = start + 2;
    while i < bytes.len() && is_placeholder_char(bytes[i]) {
        i += 1;
    }
    i.min(bytes.len())
}

/// End of the placeholder starting at `start`, or `None` when the `@` is
/// not followed by at least one name character.
pub fn placeholder_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() && is_placeholder_char(bytes[i]) {
        i += 1;
    }
    (i > start + 1).then_some(i)
}

/// True when `text` has a `--` or `/* */` comment outside quoted spans.
pub fn contains_comment(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        i = match (bytes[i], bytes.get(i + 1).copied()) {
            (b'-', Some(b'-')) | (b'/', Some(b'*')) => return true,
            (b'\'', _) => skip_single_quoted(text, i),
            (b'"', _) => skip_double_quoted(text, i),
            (b'[', _) => skip_bracketed(text, i),
            _ => i + 1,
        };
    }
    false
}

/// Skip a span closed by `close`, where a doubled `close` is an escape.
fn skip_doubling(bytes: &[u8], start: usize, close: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == close {
            if bytes.get(i + 1) == Some(&close) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}
