use aes::Aes128;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

type Encryptor = cbc::Encryptor<Aes128>;
type Decryptor = cbc::Decryptor<Aes128>;

/// Encrypts `plaintext` under AES-128-CBC with PKCS#7 padding, as used by the
/// V6 envelope.
#[must_use]
pub fn aes128_cbc_encrypt(key: &[u8; 16], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    Encryptor::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypts `ciphertext` (a whole number of AES blocks) produced by
/// [`aes128_cbc_encrypt`], returning the unpadded plaintext.
pub fn aes128_cbc_decrypt(key: &[u8; 16], iv: &[u8; 16], ciphertext: &[u8]) -> Result<Vec<u8>, AesCbcError> {
    Decryptor::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| AesCbcError::BadPadding)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AesCbcError {
    BadPadding,
}

impl std::fmt::Display for AesCbcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("invalid PKCS#7 padding")
    }
}

impl std::error::Error for AesCbcError {}
