//! Variable-length Integer Encoding (Varint)
//!
//! Each byte carries 7 bits of data and 1 continuation bit, so small numbers
//! take a single byte:
//! - 0-127 use 1 byte
//! - a full `u64` uses at most 10 bytes
//!
//! ## Why This Matters for HistoryDB
//! Daily log objects are a concatenation of framed entries. Every entry is
//! prefixed by its timestamp and its length, both varints. Lengths of typical
//! log records fit in one or two bytes, which keeps the framing overhead
//! negligible next to the payload.
//!
//! Decoding never panics: log objects come from the substrate and may be
//! truncated by a torn append, so the decoder reports `None` instead.
//!
//! ## Usage
//! ```ignore
//! let mut buf = BytesMut::new();
//! encode_varint_u64(&mut buf, 300);
//! let value = try_decode_varint_u64(&mut buf.as_ref());  // Some(300)
//! ```

use bytes::{Buf, BufMut};

/// Maximum number of bytes a `u64` varint can occupy.
pub const MAX_VARINT_LEN: usize = 10;

/// Encode an unsigned integer as a varint
pub fn encode_varint_u64(buf: &mut impl BufMut, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value != 0 {
            byte |= 0x80; // Set continuation bit
        }

        buf.put_u8(byte);

        if value == 0 {
            break;
        }
    }
}

/// Number of bytes `encode_varint_u64` writes for `value`
pub fn varint_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

/// Decode a varint, returning `None` when the buffer ends early or the
/// encoding overflows 64 bits.
pub fn try_decode_varint_u64(buf: &mut impl Buf) -> Option<u64> {
    let mut value: u64 = 0;
    let mut shift = 0;

    loop {
        if !buf.has_remaining() {
            return None;
        }
        let byte = buf.get_u8();
        if shift == 63 && (byte & 0x7F) > 1 {
            return None;
        }
        value |= ((byte & 0x7F) as u64) << shift;

        if (byte & 0x80) == 0 {
            return Some(value);
        }

        shift += 7;

        if shift >= 64 {
            return None;
        }
    }
}
