//! Char-offset helpers.
//!
//! Block offsets count chars (Unicode scalar values). These helpers convert
//! to byte positions so slicing can never land inside a code point.

/// Length of `s` in chars.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of char `offset`, clamped to `s.len()`.
pub fn byte_index(s: &str, offset: usize) -> usize {
    s.char_indices().nth(offset).map(|(i, _)| i).unwrap_or(s.len())
}

/// Chars `[start, end)` of `s`, clamped.
pub fn slice(s: &str, start: usize, end: usize) -> &str {
    let a = byte_index(s, start);
    let b = byte_index(s, end.max(start));
    &s[a..b]
}

/// Split `s` before char `offset`.
pub fn split_at(s: &str, offset: usize) -> (&str, &str) {
    s.split_at(byte_index(s, offset))
}

/// `s` with chars `[start, end)` replaced by `inserted`.
pub fn replace_range(s: &str, start: usize, end: usize, inserted: &str) -> String {
    let a = byte_index(s, start);
    let b = byte_index(s, end.max(start));
    let mut out = String::with_capacity(s.len() - (b - a) + inserted.len());
    out.push_str(&s[..a]);
    out.push_str(inserted);
    out.push_str(&s[b..]);
    out
}
