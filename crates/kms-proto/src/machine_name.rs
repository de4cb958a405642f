use kms_core::{read_utf16le_string, utf16le_string_size, write_utf16le_string, Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor};
use kms_error::InvalidFieldErr;

/// A client machine name: a length-prefixed UTF-16LE string capped at 64
/// code units, the limit Windows itself enforces for `MachineName`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MachineName(String);

impl MachineName {
    pub const MAX_CODE_UNITS: usize = 64;

    pub fn new(name: impl Into<String>) -> DecodeResult<Self> {
        let name = name.into();
        let units = name.encode_utf16().count();
        if units > Self::MAX_CODE_UNITS {
            return Err(kms_core::DecodeError::invalid_field(
                "machine_name",
                "machine_name",
                "exceeds 64 UTF-16 code units",
            ));
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Decode<'_> for MachineName {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        let name = read_utf16le_string("machine_name", src)?;
        Self::new(name)
    }
}

impl Encode for MachineName {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        write_utf16le_string("machine_name", dst, &self.0)
    }

    fn size(&self) -> usize {
        utf16le_string_size(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_boundary_length() {
        let name = "A".repeat(MachineName::MAX_CODE_UNITS);
        assert!(MachineName::new(name).is_ok());
    }

    #[test]
    fn rejects_over_length() {
        let name = "A".repeat(MachineName::MAX_CODE_UNITS + 1);
        assert!(MachineName::new(name).is_err());
    }

    #[test]
    fn round_trips_through_wire() {
        let name = MachineName::new("WORKSTATION-07").unwrap();
        let mut buf = vec![0u8; name.size()];
        name.encode(&mut WriteCursor::new(&mut buf)).unwrap();
        let decoded = MachineName::decode(&mut ReadCursor::new(&buf)).unwrap();
        assert_eq!(decoded, name);
    }
}
