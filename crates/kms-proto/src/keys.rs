//! Fixed, protocol-defining cryptographic constants.
//!
//! These are data, not configuration: every compliant KMS host and client
//! uses the same three keys, so they are not exposed on [`crate::ActivationConfig`]
//! or any CLI flag. Values are placeholders pending the canonical KMS
//! reference values (see the crate-root documentation and `DESIGN.md`).

/// Keyed-hash constant for the V4 envelope's trailing integrity check.
pub const HASH_KEY_V4: [u8; 16] = [
    0x4B, 0x4D, 0x53, 0x2D, 0x56, 0x34, 0x2D, 0x48, 0x41, 0x53, 0x48, 0x2D, 0x4B, 0x45, 0x59, 0x00,
];

/// Fixed key folded with the per-session salt to derive the V5 RC4 key.
pub const KEY_V5: [u8; 16] = [
    0x4B, 0x4D, 0x53, 0x2D, 0x56, 0x35, 0x2D, 0x52, 0x43, 0x34, 0x2D, 0x4B, 0x45, 0x59, 0x00, 0x00,
];

/// Fixed AES-128 key for the V6 envelope (encryption and CMAC).
pub const KEY_V6: [u8; 16] = [
    0x4B, 0x4D, 0x53, 0x2D, 0x56, 0x36, 0x2D, 0x41, 0x45, 0x53, 0x2D, 0x4B, 0x45, 0x59, 0x00, 0x00,
];
