use kms_error::{InvalidFieldErr, NotEnoughBytesErr};

use crate::{DecodeError, DecodeResult, EncodeError, EncodeResult, ReadCursor, WriteCursor};

/// Reads a length-prefixed UTF-16LE string: a 16-bit count of UTF-16 code
/// units, followed by that many code units (2 bytes each, little-endian).
///
/// Callers that need to cap the code-unit count (e.g. a machine name capped
/// at 64 units) should check `code_units` against their own limit before
/// calling this, or check the returned string's `.encode_utf16().count()`
/// after decoding.
pub fn read_utf16le_string(context: &'static str, src: &mut ReadCursor<'_>) -> DecodeResult<String> {
    let code_units = src
        .try_read_u16()
        .map_err(|e| DecodeError::not_enough_bytes(context, e.received(), e.expected()))? as usize;
    let byte_len = code_units * 2;
    let bytes = src
        .try_read_slice(byte_len)
        .map_err(|e| DecodeError::not_enough_bytes(context, e.received(), e.expected()))?;

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|_| DecodeError::invalid_field(context, "string", "invalid UTF-16 sequence (unpaired surrogate)"))
}

/// Writes a string as a length-prefixed UTF-16LE sequence. `code_units` must
/// fit in a `u16`; callers enforcing a tighter cap should validate before
/// calling this.
pub fn write_utf16le_string(context: &'static str, dst: &mut WriteCursor<'_>, value: &str) -> EncodeResult<()> {
    let code_units: Vec<u16> = value.encode_utf16().collect();
    let count = u16::try_from(code_units.len())
        .map_err(|_| EncodeError::invalid_field(context, "string", "too many UTF-16 code units for a u16 prefix"))?;
    dst.write_u16(count);
    for unit in code_units {
        dst.write_u16(unit);
    }
    Ok(())
}

/// Encoded size in bytes of `value` as a length-prefixed UTF-16LE string:
/// the 2-byte prefix plus 2 bytes per code unit.
#[must_use]
pub fn utf16le_string_size(value: &str) -> usize {
    2 + value.encode_utf16().count() * 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ascii() {
        let mut buf = vec![0u8; utf16le_string_size("hello")];
        write_utf16le_string("test", &mut WriteCursor::new(&mut buf), "hello").unwrap();
        let decoded = read_utf16le_string("test", &mut ReadCursor::new(&buf)).unwrap();
        assert_eq!(decoded, "hello");
    }

    #[test]
    fn round_trips_non_ascii() {
        let text = "WIN-ÀÉÎÕÜ";
        let mut buf = vec![0u8; utf16le_string_size(text)];
        write_utf16le_string("test", &mut WriteCursor::new(&mut buf), text).unwrap();
        let decoded = read_utf16le_string("test", &mut ReadCursor::new(&buf)).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn rejects_truncated_buffer() {
        let mut buf = vec![0u8; utf16le_string_size("hello")];
        write_utf16le_string("test", &mut WriteCursor::new(&mut buf), "hello").unwrap();
        let truncated = &buf[..buf.len() - 1];
        assert!(read_utf16le_string("test", &mut ReadCursor::new(truncated)).is_err());
    }

    #[test]
    fn rejects_unpaired_surrogate() {
        // length prefix 1, followed by a lone high surrogate.
        let buf = [0x01, 0x00, 0x00, 0xD8];
        assert!(read_utf16le_string("test", &mut ReadCursor::new(&buf)).is_err());
    }
}
