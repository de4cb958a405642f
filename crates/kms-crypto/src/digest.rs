use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

/// SHA-256 over `msg`.
#[must_use]
pub fn sha256(msg: &[u8]) -> [u8; 32] {
    Sha256::digest(msg).into()
}

/// HMAC-SHA-256 over `msg`, keyed with `key`.
#[must_use]
pub fn hmac_sha256(key: &[u8], msg: &[u8]) -> [u8; 32] {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(msg);
    mac.finalize().into_bytes().into()
}
