use crate::{Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor};

/// A UUID stored in canonical (big-endian, RFC 4122 textual) byte order.
///
/// Microsoft's wire encoding reorders the first three fields to
/// little-endian ("mixed-endian form"); [`Uuid::to_wire`]/[`Uuid::from_wire`]
/// convert between the two. All in-memory comparisons, hashing, and map keys
/// use the canonical form so a `Uuid` read off the wire compares equal to one
/// constructed from a textual literal.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Uuid([u8; 16]);

impl Uuid {
    #[must_use]
    pub const fn from_canonical_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn canonical_bytes(&self) -> [u8; 16] {
        self.0
    }

    #[must_use]
    pub const fn nil() -> Self {
        Self([0; 16])
    }

    #[must_use]
    pub const fn is_nil(&self) -> bool {
        let mut i = 0;
        while i < 16 {
            if self.0[i] != 0 {
                return false;
            }
            i += 1;
        }
        true
    }

    /// Converts to Microsoft's mixed-endian wire form: the first three
    /// fields (4+2+2 bytes) are byte-swapped to little-endian, the last two
    /// fields (2+6 bytes) are left as-is.
    #[must_use]
    pub fn to_wire(self) -> [u8; 16] {
        let c = self.0;
        let mut w = [0u8; 16];
        w[0..4].copy_from_slice(&[c[3], c[2], c[1], c[0]]);
        w[4..6].copy_from_slice(&[c[5], c[4]]);
        w[6..8].copy_from_slice(&[c[7], c[6]]);
        w[8..16].copy_from_slice(&c[8..16]);
        w
    }

    /// Converts from Microsoft's mixed-endian wire form back to canonical.
    #[must_use]
    pub fn from_wire(w: [u8; 16]) -> Self {
        let mut c = [0u8; 16];
        c[0..4].copy_from_slice(&[w[3], w[2], w[1], w[0]]);
        c[4..6].copy_from_slice(&[w[5], w[4]]);
        c[6..8].copy_from_slice(&[w[7], w[6]]);
        c[8..16].copy_from_slice(&w[8..16]);
        Self(c)
    }

    /// Parses the canonical `8-4-4-4-12` hyphenated textual form.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let cleaned: String = text.chars().filter(|c| *c != '-').collect();
        if cleaned.len() != 32 {
            return None;
        }
        let mut bytes = [0u8; 16];
        for (i, chunk) in bytes.iter_mut().enumerate() {
            *chunk = u8::from_str_radix(&cleaned[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl core::fmt::Debug for Uuid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Uuid({self})")
    }
}

impl core::fmt::Display for Uuid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
        )
    }
}

impl Decode<'_> for Uuid {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        let wire = src.try_read_slice(16)?;
        let mut array = [0u8; 16];
        array.copy_from_slice(wire);
        Ok(Self::from_wire(array))
    }
}

impl Encode for Uuid {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        dst.write_slice(&self.to_wire());
        Ok(())
    }

    fn size(&self) -> usize {
        16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip() {
        let u = Uuid::parse("55c92734-d682-4d71-983e-d6ec3f16059f").unwrap();
        assert_eq!(Uuid::from_wire(u.to_wire()), u);
    }

    #[test]
    fn display_matches_canonical_text() {
        let u = Uuid::parse("00112233-4455-6677-8899-aabbccddeeff").unwrap();
        assert_eq!(u.to_string(), "00112233-4455-6677-8899-aabbccddeeff");
    }

    #[test]
    fn decode_then_encode_is_wire_identity() {
        let u = Uuid::parse("2de67392-b7a7-462a-b1ca-108dd189f588").unwrap();
        let wire = u.to_wire();
        let decoded = crate::decode::<Uuid>(&wire).unwrap();
        assert_eq!(decoded, u);
        let encoded = crate::encode_vec(&decoded).unwrap();
        assert_eq!(encoded, wire);
    }
}
