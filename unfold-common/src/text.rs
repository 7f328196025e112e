//! Text normalization shared by the browser and fallback paths.

/// Maximum number of characters in any returned `content` string.
pub const CONTENT_CAP: usize = 200_000;

/// Collapse every run of Unicode whitespace (newlines included) into a single space
/// and trim both ends.
///
/// ```
/// use unfold_common::text::normalize_whitespace;
///
/// assert_eq!(normalize_whitespace("  a\n\n b\t c "), "a b c");
/// ```
pub fn normalize_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for word in raw.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Cut `text` to at most `cap` characters. Not sentence-aware.
pub fn truncate_chars(mut text: String, cap: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(cap) {
        text.truncate(idx);
    }
    text
}

/// Normalize and apply [`CONTENT_CAP`].
pub fn normalize_and_cap(raw: &str) -> String {
    truncate_chars(normalize_whitespace(raw), CONTENT_CAP)
}
