//! Cryptographic primitives backing the three KMS envelope versions.
//!
//! Every function here operates on caller-owned buffers and carries no
//! mutable global state, so sessions can share these primitives without
//! synchronization (see the KMS engine's concurrency model).

mod aes_cbc;
mod cmac;
mod digest;
mod rand;
mod rc4;

pub use aes_cbc::{aes128_cbc_decrypt, aes128_cbc_encrypt, AesCbcError};
pub use cmac::{aes_cmac, verify_aes_cmac};
pub use digest::{hmac_sha256, sha256};
pub use rand::{rand_array, rand_bytes};
pub use rc4::rc4;
