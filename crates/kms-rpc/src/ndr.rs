use kms_core::{DecodeResult, EncodeResult, ReadCursor, WriteCursor};
use kms_error::{InvalidFieldErr, NotEnoughBytesErr, OtherErr};

/// Reads a conformant-varying array of bytes: `max_count`, `offset`, and
/// `actual_count` (each a 4-byte NDR integer), followed by `actual_count`
/// bytes of payload, padded to a 4-byte boundary.
///
/// This is the only NDR construct this engine needs to understand — the
/// KMS `ActivationRequest`/`ActivationResponse` stub data is a single
/// byte-array parameter, never a general NDR structure.
pub fn read_conformant_byte_array(src: &mut ReadCursor<'_>) -> DecodeResult<Vec<u8>> {
    let max_count = src.try_read_u32()?;
    let offset = src.try_read_u32()?;
    let actual_count = src.try_read_u32()?;

    if offset != 0 {
        return Err(kms_core::DecodeError::invalid_field(
            "conformant_array",
            "offset",
            "non-zero array offset is not supported",
        ));
    }
    if actual_count > max_count {
        return Err(kms_core::DecodeError::invalid_field(
            "conformant_array",
            "actual_count",
            "actual_count exceeds max_count",
        ));
    }

    let bytes = src.try_read_slice(actual_count as usize)?.to_vec();
    skip_padding(src, actual_count as usize);
    Ok(bytes)
}

/// Writes `payload` as a conformant-varying byte array: `max_count` and
/// `actual_count` both set to `payload.len()`, `offset` fixed at `0`,
/// padded to a 4-byte boundary.
pub fn write_conformant_byte_array(dst: &mut WriteCursor<'_>, payload: &[u8]) -> EncodeResult<()> {
    let count =
        u32::try_from(payload.len()).map_err(|_| kms_core::EncodeError::other("conformant_array", "payload too large"))?;
    dst.write_u32(count);
    dst.write_u32(0); // offset
    dst.write_u32(count);
    dst.write_slice(payload);
    for _ in 0..padding_len(payload.len()) {
        dst.write_u8(0);
    }
    Ok(())
}

#[must_use]
pub const fn conformant_byte_array_size(len: usize) -> usize {
    12 + len + padding_len(len)
}

#[must_use]
const fn padding_len(len: usize) -> usize {
    (4 - len % 4) % 4
}

fn skip_padding(src: &mut ReadCursor<'_>, len: usize) {
    let pad = padding_len(len);
    if pad > 0 && src.len() >= pad {
        src.advance(pad);
    }
}
