use crate::{Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor};

/// A Windows `FILETIME`: the number of 100-nanosecond ticks since
/// 1601-01-01 00:00:00 UTC, stored exactly as it travels on the wire.
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Filetime(pub u64);

/// Ticks between the `FILETIME` epoch (1601-01-01) and the Unix epoch
/// (1970-01-01).
const UNIX_EPOCH_OFFSET_TICKS: u64 = 116_444_736_000_000_000;

impl Filetime {
    #[must_use]
    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Builds a `FILETIME` from a Unix timestamp in whole seconds.
    #[must_use]
    pub const fn from_unix_seconds(seconds: u64) -> Self {
        Self(seconds.saturating_mul(10_000_000).saturating_add(UNIX_EPOCH_OFFSET_TICKS))
    }

    /// The number of whole seconds since the Unix epoch, saturating to zero
    /// for timestamps that predate it.
    #[must_use]
    pub const fn to_unix_seconds(self) -> u64 {
        self.0.saturating_sub(UNIX_EPOCH_OFFSET_TICKS) / 10_000_000
    }
}

impl Decode<'_> for Filetime {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        Ok(Self(src.try_read_u64()?))
    }
}

impl Encode for Filetime {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        dst.write_u64(self.0);
        Ok(())
    }

    fn size(&self) -> usize {
        8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_epoch_round_trips() {
        let ft = Filetime::from_unix_seconds(0);
        assert_eq!(ft.0, UNIX_EPOCH_OFFSET_TICKS);
        assert_eq!(ft.to_unix_seconds(), 0);
    }

    #[test]
    fn decode_then_encode_is_wire_identity() {
        let wire = 1_000_000_000u64.to_le_bytes();
        let decoded: Filetime = crate::decode(&wire).unwrap();
        assert_eq!(decoded.0, 1_000_000_000);
        assert_eq!(crate::encode_vec(&decoded).unwrap(), wire);
    }
}
