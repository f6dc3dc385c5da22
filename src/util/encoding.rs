use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// Decodes raw feed bytes into text.
///
/// A byte-order mark picks the encoding (UTF-8 or UTF-16) and is dropped. Without
/// one the source is read as UTF-8: valid input is borrowed as-is, and each invalid
/// byte run is decoded as windows-1252 in place, so one stray byte does not garble
/// the rest of the document and decoding never drops input. Any `encoding=`
/// declaration in the prolog is ignored.
///
/// # Examples
///
/// ```
/// use feedscan::util::decode_source;
///
/// assert_eq!(decode_source(b"\xEF\xBB\xBF<rss/>"), "<rss/>");
/// assert_eq!(decode_source(b"caf\xE9"), "caf\u{e9}");
/// assert_eq!(decode_source(b"Caf\xC3\xA9 \x93"), "Caf\u{e9} \u{201c}");
/// ```
pub fn decode_source(bytes: &[u8]) -> Cow<'_, str> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let body = &bytes[bom_len..];
        if encoding != UTF_8 {
            tracing::debug!(encoding = encoding.name(), "Decoding source by byte-order mark");
            return encoding.decode_without_bom_handling(body).0;
        }
        return decode_utf8(body);
    }
    decode_utf8(bytes)
}

fn decode_utf8(bytes: &[u8]) -> Cow<'_, str> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(text);
    }

    let mut text = String::with_capacity(bytes.len() + bytes.len() / 4);
    let mut legacy_bytes = 0usize;
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
        let invalid = chunk.invalid();
        if !invalid.is_empty() {
            legacy_bytes += invalid.len();
            text.push_str(&WINDOWS_1252.decode_without_bom_handling(invalid).0);
        }
    }
    tracing::debug!(
        legacy_bytes,
        "Source is not valid UTF-8, decoded stray bytes as windows-1252"
    );
    Cow::Owned(text)
}
