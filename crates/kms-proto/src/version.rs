use kms_core::{Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor};
use kms_error::UnsupportedVersionErr;

/// One of the three KMS protocol versions this engine speaks. Each carries
/// its own envelope (see [`crate::envelope::Envelope`]) but shares the inner
/// request/response layout.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum KmsVersion {
    V4,
    V5,
    V6,
}

impl KmsVersion {
    #[must_use]
    pub const fn major_minor(self) -> (u8, u8) {
        match self {
            Self::V4 => (4, 0),
            Self::V5 => (5, 0),
            Self::V6 => (6, 0),
        }
    }

    pub fn from_major_minor(major: u8, minor: u8) -> DecodeResult<Self> {
        match (major, minor) {
            (4, 0) => Ok(Self::V4),
            (5, 0) => Ok(Self::V5),
            (6, 0) => Ok(Self::V6),
            _ => Err(kms_core::DecodeError::unsupported_version("kms_version", major, minor)),
        }
    }
}

impl Decode<'_> for KmsVersion {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        let major = src.try_read_u8()?;
        let minor = src.try_read_u8()?;
        Self::from_major_minor(major, minor)
    }
}

impl Encode for KmsVersion {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        let (major, minor) = self.major_minor();
        dst.write_u8(major);
        dst.write_u8(minor);
        Ok(())
    }

    fn size(&self) -> usize {
        2
    }
}
