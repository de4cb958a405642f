use aes::Aes128;
use cmac::{Cmac, Mac};

/// Computes AES-CMAC(`key`, `msg`), truncated/expanded to the standard
/// 16-byte tag used by the V6 envelope.
#[must_use]
pub fn aes_cmac(key: &[u8; 16], msg: &[u8]) -> [u8; 16] {
    let mut mac = Cmac::<Aes128>::new_from_slice(key).expect("16-byte key is always valid");
    mac.update(msg);
    mac.finalize().into_bytes().into()
}

/// Constant-time comparison of a computed CMAC against the one received on
/// the wire.
#[must_use]
pub fn verify_aes_cmac(key: &[u8; 16], msg: &[u8], tag: &[u8; 16]) -> bool {
    let mut mac = Cmac::<Aes128>::new_from_slice(key).expect("16-byte key is always valid");
    mac.update(msg);
    mac.verify_slice(tag).is_ok()
}
