use kms_core::{Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor};
use kms_error::{InvalidFieldErr, NotEnoughBytesErr};

/// The fixed-size DCE/RPC 1.0 connection-oriented PDU header: version,
/// packet type, fragmentation flags, data representation, and the lengths
/// needed to size the body that follows.
///
/// Mirrors the fixed-header-then-variable-body pattern of a TPKT header:
/// read this first, learn `frag_length`, then read the rest of the frame.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct CommonHeader {
    pub ptype: PduType,
    pub pfc_flags: PfcFlags,
    pub frag_length: u16,
    pub call_id: u32,
}

impl CommonHeader {
    pub const SIZE: usize = 16;
    pub const RPC_VERS_MAJOR: u8 = 5;
    pub const RPC_VERS_MINOR: u8 = 0;
    /// Little-endian, ASCII character, IEEE float data representation.
    const PACKED_DREP: [u8; 4] = [0x10, 0x00, 0x00, 0x00];

    #[must_use]
    #[allow(clippy::as_conversions)]
    pub const fn body_length(&self) -> usize {
        self.frag_length as usize - Self::SIZE
    }
}

impl Decode<'_> for CommonHeader {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        let rpc_vers = src.try_read_u8()?;
        let rpc_vers_minor = src.try_read_u8()?;
        if rpc_vers != Self::RPC_VERS_MAJOR || rpc_vers_minor != Self::RPC_VERS_MINOR {
            return Err(kms_core::DecodeError::invalid_field(
                "common_header",
                "rpc_vers",
                "unsupported DCE/RPC version",
            ));
        }

        let ptype = PduType::try_from(src.try_read_u8()?)?;
        let pfc_flags = PfcFlags::from_bits(src.try_read_u8()?);
        src.advance(4); // packed_drep, echoed back unchanged, not otherwise used
        let frag_length = src.try_read_u16()?;
        let auth_length = src.try_read_u16()?;
        if auth_length != 0 {
            return Err(kms_core::DecodeError::invalid_field(
                "common_header",
                "auth_length",
                "authenticated binds are not supported",
            ));
        }
        let call_id = src.try_read_u32()?;

        if usize::from(frag_length) < Self::SIZE {
            return Err(kms_core::DecodeError::not_enough_bytes(
                "common_header",
                frag_length as usize,
                Self::SIZE,
            ));
        }

        Ok(Self {
            ptype,
            pfc_flags,
            frag_length,
            call_id,
        })
    }
}

impl Encode for CommonHeader {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        dst.write_u8(Self::RPC_VERS_MAJOR);
        dst.write_u8(Self::RPC_VERS_MINOR);
        dst.write_u8(self.ptype as u8);
        dst.write_u8(self.pfc_flags.bits());
        dst.write_array(Self::PACKED_DREP);
        dst.write_u16(self.frag_length);
        dst.write_u16(0); // auth_length
        dst.write_u32(self.call_id);
        Ok(())
    }

    fn size(&self) -> usize {
        Self::SIZE
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum PduType {
    Request = 0x00,
    Response = 0x02,
    Fault = 0x03,
    Bind = 0x0B,
    BindAck = 0x0C,
}

impl TryFrom<u8> for PduType {
    type Error = kms_core::DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Request),
            0x02 => Ok(Self::Response),
            0x03 => Ok(Self::Fault),
            0x0B => Ok(Self::Bind),
            0x0C => Ok(Self::BindAck),
            _ => Err(kms_core::DecodeError::invalid_field(
                "common_header",
                "ptype",
                "unsupported or unknown PDU type",
            )),
        }
    }
}

/// `pfc_flags` bits relevant to this engine: whether this fragment is the
/// first and/or last of a logical PDU.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
pub struct PfcFlags(u8);

impl PfcFlags {
    pub const FIRST_FRAG: u8 = 0x01;
    pub const LAST_FRAG: u8 = 0x02;

    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn single_fragment() -> Self {
        Self(Self::FIRST_FRAG | Self::LAST_FRAG)
    }

    #[must_use]
    pub const fn is_first_frag(self) -> bool {
        self.0 & Self::FIRST_FRAG != 0
    }

    #[must_use]
    pub const fn is_last_frag(self) -> bool {
        self.0 & Self::LAST_FRAG != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CommonHeader {
        CommonHeader {
            ptype: PduType::Request,
            pfc_flags: PfcFlags::single_fragment(),
            frag_length: 32,
            call_id: 7,
        }
    }

    #[test]
    fn round_trips_through_wire() {
        let header = sample();
        let bytes = kms_core::encode_vec(&header).unwrap();
        assert_eq!(bytes.len(), CommonHeader::SIZE);
        let decoded: CommonHeader = kms_core::decode(&bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn rejects_unknown_ptype() {
        let mut bytes = kms_core::encode_vec(&sample()).unwrap();
        bytes[2] = 0x7F;
        assert!(kms_core::decode::<CommonHeader>(&bytes).is_err());
    }

    #[test]
    fn body_length_excludes_header() {
        assert_eq!(sample().body_length(), 16);
    }
}
