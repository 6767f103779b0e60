//! Payload text encoding rules.

/// Result of decoding one received payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Valid UTF-8 text with NUL padding removed.
    Text(String),
    /// Bytes that are not valid UTF-8, rendered lossily for display.
    Corrupt(String),
}

impl Decoded {
    /// Display text regardless of validity.
    pub fn text(&self) -> &str {
        match self {
            Self::Text(s) | Self::Corrupt(s) => s,
        }
    }
}

/// Strips trailing NUL padding and decodes the rest as UTF-8.
///
/// Malformed payloads are a value, not an error. The lossy rendering of a corrupt payload is cut to
/// `max_width` bytes on a character boundary.
pub fn decode_payload(bytes: &[u8], max_width: usize) -> Decoded {
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    let bytes = &bytes[..end];
    match std::str::from_utf8(bytes) {
        Ok(text) => Decoded::Text(text.to_string()),
        Err(_) => {
            let lossy = String::from_utf8_lossy(bytes);
            Decoded::Corrupt(truncate_utf8(&lossy, max_width).to_string())
        }
    }
}

/// Longest prefix of `text` that fits in `max_bytes` without splitting a character.
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
