use kms_core::{Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor};
use kms_error::NotEnoughBytesErr;

use crate::ndr::{conformant_byte_array_size, read_conformant_byte_array, write_conformant_byte_array};

/// `opnum = 0` is the only valid call: the KMS `ActivationRequest` method.
pub const ACTIVATION_REQUEST_OPNUM: u16 = 0;

/// A DCE/RPC `Request` PDU body. `stub_data` is the conformant byte array
/// carrying the V4/V5/V6 envelope.
#[derive(Clone, Debug)]
pub struct RequestPdu {
    pub alloc_hint: u32,
    pub context_id: u16,
    pub opnum: u16,
    pub stub_data: Vec<u8>,
}

impl Decode<'_> for RequestPdu {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        let alloc_hint = src.try_read_u32()?;
        let context_id = src.try_read_u16()?;
        let opnum = src.try_read_u16()?;
        let stub_data = read_conformant_byte_array(src)?;

        Ok(Self {
            alloc_hint,
            context_id,
            opnum,
            stub_data,
        })
    }
}

impl Encode for RequestPdu {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        dst.write_u32(self.alloc_hint);
        dst.write_u16(self.context_id);
        dst.write_u16(self.opnum);
        write_conformant_byte_array(dst, &self.stub_data)
    }

    fn size(&self) -> usize {
        4 + 2 + 2 + conformant_byte_array_size(self.stub_data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_envelope_payload() {
        let req = RequestPdu {
            alloc_hint: 42,
            context_id: 0,
            opnum: ACTIVATION_REQUEST_OPNUM,
            stub_data: vec![1, 2, 3, 4, 5, 6, 7],
        };
        let bytes = kms_core::encode_vec(&req).unwrap();
        let decoded: RequestPdu = kms_core::decode(&bytes).unwrap();
        assert_eq!(decoded.stub_data, req.stub_data);
        assert_eq!(decoded.opnum, ACTIVATION_REQUEST_OPNUM);
    }
}
