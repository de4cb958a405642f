use kms_core::{Decode, DecodeResult, Encode, EncodeResult, ReadCursor, Uuid, WriteCursor};
use kms_error::NotEnoughBytesErr;

/// KMS activation interface UUID, version 1.0.
pub const KMS_INTERFACE_UUID: Uuid = Uuid::from_canonical_bytes(kms_interface_bytes());
pub const KMS_INTERFACE_VERSION: (u16, u16) = (1, 0);

/// NDR transfer syntax UUID, version 2.0.
pub const NDR_TRANSFER_SYNTAX_UUID: Uuid = Uuid::from_canonical_bytes(ndr_transfer_syntax_bytes());
pub const NDR_TRANSFER_SYNTAX_VERSION: u32 = 2;

/// Fragment size cap this engine advertises in `BindAck`.
pub const MAX_FRAG_SIZE: u16 = 5840;

const fn kms_interface_bytes() -> [u8; 16] {
    [
        0x51, 0xc8, 0x21, 0x75, 0x84, 0x4e, 0x47, 0x50, 0xb0, 0xd8, 0xec, 0x25, 0x55, 0x55, 0xbc, 0x06,
    ]
}

const fn ndr_transfer_syntax_bytes() -> [u8; 16] {
    [
        0x8a, 0x88, 0x5d, 0x04, 0x1c, 0xeb, 0x11, 0xc9, 0x9f, 0xe8, 0x08, 0x00, 0x2b, 0x10, 0x48, 0x60,
    ]
}

/// A single DCE/RPC `Bind` PDU body. Only the first presentation context's
/// first transfer syntax is inspected — KMS only ever advertises a single
/// abstract syntax, so additional contexts a client offers are accepted
/// but ignored.
#[derive(Clone, Debug)]
pub struct BindPdu {
    pub max_xmit_frag: u16,
    pub max_recv_frag: u16,
    pub assoc_group_id: u32,
    pub context_id: u16,
    pub abstract_syntax: Uuid,
    pub abstract_syntax_version: (u16, u16),
    pub transfer_syntax: Uuid,
    pub transfer_syntax_version: u32,
}

impl Decode<'_> for BindPdu {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        let max_xmit_frag = src.try_read_u16()?;
        let max_recv_frag = src.try_read_u16()?;
        let assoc_group_id = src.try_read_u32()?;

        let _num_ctx_items = src.try_read_u8()?;
        src.advance(3); // alignment padding

        let context_id = src.try_read_u16()?;
        let _num_trans_items = src.try_read_u8()?;
        src.advance(1); // alignment padding

        let abstract_syntax = Uuid::decode(src)?;
        let abstract_major = src.try_read_u16()?;
        let abstract_minor = src.try_read_u16()?;

        let transfer_syntax = Uuid::decode(src)?;
        let transfer_syntax_version = src.try_read_u32()?;

        Ok(Self {
            max_xmit_frag,
            max_recv_frag,
            assoc_group_id,
            context_id,
            abstract_syntax,
            abstract_syntax_version: (abstract_major, abstract_minor),
            transfer_syntax,
            transfer_syntax_version,
        })
    }
}

/// Presentation-context acceptance result codes (`p_cont_def_result_t`).
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[repr(u16)]
pub enum ContextResult {
    Acceptance = 0,
    ProviderRejection = 2,
}

/// A `BindAck` PDU body advertising acceptance of the KMS activation
/// interface with NDR transfer syntax.
#[derive(Clone, Debug)]
pub struct BindAckPdu {
    pub max_xmit_frag: u16,
    pub max_recv_frag: u16,
    pub assoc_group_id: u32,
    pub result: ContextResult,
}

impl BindAckPdu {
    #[must_use]
    pub fn accepting(bind: &BindPdu, assoc_group_id: u32) -> Self {
        Self {
            max_xmit_frag: bind.max_xmit_frag.min(MAX_FRAG_SIZE),
            max_recv_frag: bind.max_recv_frag.min(MAX_FRAG_SIZE),
            assoc_group_id,
            result: ContextResult::Acceptance,
        }
    }
}

impl Encode for BindAckPdu {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        dst.write_u16(self.max_xmit_frag);
        dst.write_u16(self.max_recv_frag);
        dst.write_u32(self.assoc_group_id);

        dst.write_u16(0); // sec_addr_length: no secondary address
        dst.write_u8(1); // num_results
        dst.write_array([0u8; 3]); // alignment padding

        dst.write_u16(self.result as u16);
        dst.write_u16(0); // reason
        NDR_TRANSFER_SYNTAX_UUID.encode(dst)?;
        dst.write_u32(NDR_TRANSFER_SYNTAX_VERSION);
        Ok(())
    }

    fn size(&self) -> usize {
        2 + 2 + 4 + 2 + 1 + 3 + 2 + 2 + NDR_TRANSFER_SYNTAX_UUID.size() + 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bind() -> Vec<u8> {
        let mut buf = vec![0u8; 2 + 2 + 4 + 1 + 3 + 2 + 1 + 1 + 16 + 2 + 2 + 16 + 4];
        let mut cursor = WriteCursor::new(&mut buf);
        cursor.write_u16(5840);
        cursor.write_u16(5840);
        cursor.write_u32(0);
        cursor.write_u8(1);
        cursor.write_array([0u8; 3]);
        cursor.write_u16(0);
        cursor.write_u8(1);
        cursor.write_u8(0);
        KMS_INTERFACE_UUID.encode(&mut cursor).unwrap();
        cursor.write_u16(1);
        cursor.write_u16(0);
        NDR_TRANSFER_SYNTAX_UUID.encode(&mut cursor).unwrap();
        cursor.write_u32(2);
        buf
    }

    #[test]
    fn decodes_client_bind() {
        let buf = sample_bind();
        let bind: BindPdu = kms_core::decode(&buf).unwrap();
        assert_eq!(bind.abstract_syntax, KMS_INTERFACE_UUID);
        assert_eq!(bind.transfer_syntax, NDR_TRANSFER_SYNTAX_UUID);
        assert_eq!(bind.max_xmit_frag, 5840);
    }

    #[test]
    fn bind_ack_caps_fragment_size() {
        let buf = sample_bind();
        let bind: BindPdu = kms_core::decode(&buf).unwrap();
        let mut oversized = bind;
        oversized.max_xmit_frag = 65000;
        let ack = BindAckPdu::accepting(&oversized, 1);
        assert_eq!(ack.max_xmit_frag, MAX_FRAG_SIZE);
        let encoded = kms_core::encode_vec(&ack).unwrap();
        assert_eq!(encoded.len(), ack.size());
    }
}
