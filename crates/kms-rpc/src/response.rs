use kms_core::{Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor};
use kms_error::NotEnoughBytesErr;

use crate::ndr::{conformant_byte_array_size, read_conformant_byte_array, write_conformant_byte_array};

/// A DCE/RPC `Response` PDU body. Outgoing responses are always a single
/// fragment, so this engine never needs to split one across fragments
/// when writing.
#[derive(Clone, Debug)]
pub struct ResponsePdu {
    pub alloc_hint: u32,
    pub context_id: u16,
    pub cancel_count: u8,
    pub stub_data: Vec<u8>,
}

impl ResponsePdu {
    #[must_use]
    pub fn new(context_id: u16, stub_data: Vec<u8>) -> Self {
        Self {
            alloc_hint: u32::try_from(stub_data.len()).unwrap_or(u32::MAX),
            context_id,
            cancel_count: 0,
            stub_data,
        }
    }
}

impl Decode<'_> for ResponsePdu {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        let alloc_hint = src.try_read_u32()?;
        let context_id = src.try_read_u16()?;
        let cancel_count = src.try_read_u8()?;
        src.advance(1); // alignment padding
        let stub_data = read_conformant_byte_array(src)?;

        Ok(Self {
            alloc_hint,
            context_id,
            cancel_count,
            stub_data,
        })
    }
}

impl Encode for ResponsePdu {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        dst.write_u32(self.alloc_hint);
        dst.write_u16(self.context_id);
        dst.write_u8(self.cancel_count);
        dst.write_u8(0); // alignment padding
        write_conformant_byte_array(dst, &self.stub_data)
    }

    fn size(&self) -> usize {
        4 + 2 + 1 + 1 + conformant_byte_array_size(self.stub_data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_envelope_payload() {
        let resp = ResponsePdu::new(0, vec![9, 8, 7, 6]);
        let bytes = kms_core::encode_vec(&resp).unwrap();
        let decoded: ResponsePdu = kms_core::decode(&bytes).unwrap();
        assert_eq!(decoded.stub_data, resp.stub_data);
        assert_eq!(decoded.alloc_hint, 4);
    }
}
