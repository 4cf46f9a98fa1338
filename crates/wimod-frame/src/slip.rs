//! SLIP byte stuffing (RFC 1055 alphabet).
//!
//! The delimiter never appears inside a frame. Delimiter and escape bytes in
//! frame content are replaced by two-byte escape sequences.

use bytes::{BufMut, BytesMut};

/// Frame delimiter.
pub const END: u8 = 0xC0;
/// Escape introducer.
pub const ESC: u8 = 0xDB;
/// Escaped delimiter (follows [`ESC`]).
pub const ESC_END: u8 = 0xDC;
/// Escaped escape (follows [`ESC`]).
pub const ESC_ESC: u8 = 0xDD;

/// Worst-case encoded size of a body: every byte escaped, plus both delimiters.
pub const fn max_encoded_len(body_len: usize) -> usize {
    1 + body_len * 2 + 1
}

/// Wrap `body` in delimiters, escaping reserved bytes, and append it to `dst`.
pub fn encode(body: &[u8], dst: &mut BytesMut) {
    dst.reserve(max_encoded_len(body.len()));
    dst.put_u8(END);
    escape_into(body, dst);
    dst.put_u8(END);
}

/// Escape `src` into `dst` without delimiters.
pub fn escape_into(src: &[u8], dst: &mut BytesMut) {
    // Copy unreserved runs in one go.
    let mut start = 0usize;
    for (i, &byte) in src.iter().enumerate() {
        let escaped = match byte {
            END => ESC_END,
            ESC => ESC_ESC,
            _ => continue,
        };
        dst.put_slice(&src[start..i]);
        dst.put_slice(&[ESC, escaped]);
        start = i + 1;
    }
    dst.put_slice(&src[start..]);
}

/// Translate the byte following an [`ESC`]. Returns `None` for an unknown
/// escape continuation.
pub fn unescape(byte: u8) -> Option<u8> {
    match byte {
        ESC_END => Some(END),
        ESC_ESC => Some(ESC),
        _ => None,
    }
}
