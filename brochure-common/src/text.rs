//! Text helpers.

/// Keep at most `max_chars` Unicode scalar values of `s`.
///
/// This is a hard cap: it may cut mid-word or mid-sentence, but never inside
/// a multi-byte character.
///
/// ```
/// use brochure_common::text::truncate_chars;
///
/// assert_eq!(truncate_chars("héllo", 2), "hé");
/// assert_eq!(truncate_chars("short", 100), "short");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Owned variant of [`truncate_chars`] that reuses the allocation.
pub fn truncate_owned(mut s: String, max_chars: usize) -> String {
    if let Some((idx, _)) = s.char_indices().nth(max_chars) {
        s.truncate(idx);
    }
    s
}
