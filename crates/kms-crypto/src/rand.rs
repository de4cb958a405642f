use rand::RngCore as _;

/// Fills and returns `n` cryptographically random bytes.
#[must_use]
pub fn rand_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}

/// Fills and returns a cryptographically random `N`-byte array.
#[must_use]
pub fn rand_array<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}
