use kms_core::{Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor};

/// `nca_s_op_rng_error`: the opnum named in a `Request` is out of the
/// interface's range. The only fault status this engine ever produces —
/// any opnum other than 0 gets this fault.
pub const NCA_S_OP_RNG_ERROR: u32 = 0x1C01_0002;

/// A DCE/RPC `Fault` PDU body, sent once and followed by closing the
/// connection — KMS has no in-band error-recovery handshake.
#[derive(Clone, Debug)]
pub struct FaultPdu {
    pub context_id: u16,
    pub status: u32,
}

impl FaultPdu {
    #[must_use]
    pub const fn unknown_opnum(context_id: u16) -> Self {
        Self {
            context_id,
            status: NCA_S_OP_RNG_ERROR,
        }
    }
}

impl Decode<'_> for FaultPdu {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        let _alloc_hint = src.try_read_u32()?;
        let context_id = src.try_read_u16()?;
        let _cancel_count = src.try_read_u8()?;
        src.advance(1); // alignment padding
        let status = src.try_read_u32()?;
        src.advance(4); // reserved, must be zero

        Ok(Self { context_id, status })
    }
}

impl Encode for FaultPdu {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        dst.write_u32(0); // alloc_hint: faults carry no stub data
        dst.write_u16(self.context_id);
        dst.write_u8(0); // cancel_count
        dst.write_u8(0); // alignment padding
        dst.write_u32(self.status);
        dst.write_u32(0); // reserved
        Ok(())
    }

    fn size(&self) -> usize {
        4 + 2 + 1 + 1 + 4 + 4
    }
}
