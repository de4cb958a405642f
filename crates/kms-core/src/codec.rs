use crate::{DecodeResult, EncodeResult, ReadCursor, WriteCursor};

/// A value that can be parsed from a byte stream.
pub trait Decode<'de>: Sized {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self>;
}

/// A value that can be serialized into its binary wire form.
pub trait Encode {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()>;

    /// Size in bytes of the encoded form, used to pre-size the destination buffer.
    fn size(&self) -> usize;
}

pub fn decode<'de, T: Decode<'de>>(src: &'de [u8]) -> DecodeResult<T> {
    let mut cursor = ReadCursor::new(src);
    T::decode(&mut cursor)
}

pub fn encode_vec<T: Encode + ?Sized>(pdu: &T) -> EncodeResult<Vec<u8>> {
    let mut buf = vec![0u8; pdu.size()];
    let mut cursor = WriteCursor::new(&mut buf);
    pdu.encode(&mut cursor)?;
    debug_assert_eq!(cursor.pos(), buf.len());
    Ok(buf)
}
