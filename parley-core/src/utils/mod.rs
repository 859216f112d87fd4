//! Utility functions and helpers

/// Encode a name into a filename that is unique per name
///
/// Characters other than ASCII alphanumerics and `-._~` are
/// percent-encoded, so distinct names never share a file.
pub fn encode_filename(name: &str) -> String {
    urlencoding::encode(name).into_owned()
}

/// Truncate a string to a maximum byte length, ensuring valid UTF-8 boundaries
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len.saturating_sub(3);
        while !s.is_char_boundary(end) {
            end = end.saturating_sub(1);
        }
        format!("{}...", &s[..end])
    }
}
