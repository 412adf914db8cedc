//! Result preview text.

/// Default preview length (characters, not bytes)
pub const DEFAULT_PREVIEW_CHARS: usize = 500;

/// First `max_chars` Unicode scalar values of `text`.
///
/// Never splits a multi-byte character.
pub fn text_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_offset, _)) => text[..byte_offset].to_string(),
        None => text.to_string(),
    }
}
