use kms_core::{ReadCursor, WriteCursor};
use kms_crypto::{aes128_cbc_decrypt, aes128_cbc_encrypt, aes_cmac, hmac_sha256, rand_array, rc4, sha256, verify_aes_cmac};

use crate::error::{ProtocolError, ProtocolErrorKind, ProtocolResult};
use crate::keys::{HASH_KEY_V4, KEY_V5, KEY_V6};
use crate::request::ClientRequest;
use crate::version::KmsVersion;

const DIGEST_LEN: usize = 16;

/// The per-version wire envelope wrapping the shared inner request/response
/// layout. Opening verifies integrity (V4 hash, V5 digest, V6 CMAC);
/// sealing builds a fresh envelope around an encoded inner payload.
#[derive(Clone, Debug)]
pub enum Envelope {
    V4,
    V5 { salt: [u8; 16] },
    V6 { iv: [u8; 16] },
}

impl Envelope {
    #[must_use]
    pub const fn version(&self) -> KmsVersion {
        match self {
            Self::V4 => KmsVersion::V4,
            Self::V5 { .. } => KmsVersion::V5,
            Self::V6 { .. } => KmsVersion::V6,
        }
    }

    /// Opens a raw `ActivationRequest` payload: reads the 4-byte plaintext
    /// version header, dispatches to the matching envelope, verifies its
    /// integrity check, and decodes the inner [`ClientRequest`].
    pub fn open(raw: &[u8]) -> ProtocolResult<(Self, ClientRequest)> {
        let mut cursor = ReadCursor::new(raw);
        let major = cursor
            .try_read_u16()
            .map_err(|_| ProtocolError::new("envelope", ProtocolErrorKind::MalformedPdu))?;
        let minor = cursor
            .try_read_u16()
            .map_err(|_| ProtocolError::new("envelope", ProtocolErrorKind::MalformedPdu))?;
        let major = u8::try_from(major).unwrap_or(u8::MAX);
        let minor = u8::try_from(minor).unwrap_or(u8::MAX);
        let version = KmsVersion::from_major_minor(major, minor)?;
        let body = cursor.remaining();

        match version {
            KmsVersion::V4 => Self::open_v4(body),
            KmsVersion::V5 => Self::open_v5(body),
            KmsVersion::V6 => Self::open_v6(body),
        }
    }

    fn open_v4(body: &[u8]) -> ProtocolResult<(Self, ClientRequest)> {
        if body.len() < DIGEST_LEN {
            return Err(ProtocolError::new("envelope/v4", ProtocolErrorKind::MalformedPdu));
        }
        let (inner_bytes, hash) = body.split_at(body.len() - DIGEST_LEN);
        let expected = &hmac_sha256(&HASH_KEY_V4, inner_bytes)[..DIGEST_LEN];
        if expected != hash {
            return Err(ProtocolError::new("envelope/v4", ProtocolErrorKind::BadV4Hash));
        }
        let request = kms_core::decode(inner_bytes)?;
        Ok((Self::V4, request))
    }

    fn open_v5(body: &[u8]) -> ProtocolResult<(Self, ClientRequest)> {
        if body.len() < 16 {
            return Err(ProtocolError::new("envelope/v5", ProtocolErrorKind::MalformedPdu));
        }
        let (salt_bytes, ciphertext) = body.split_at(16);
        let mut salt = [0u8; 16];
        salt.copy_from_slice(salt_bytes);

        let key = derive_v5_key(&salt);
        let plaintext = rc4(&key, ciphertext);
        if plaintext.len() < DIGEST_LEN {
            return Err(ProtocolError::new("envelope/v5", ProtocolErrorKind::MalformedPdu));
        }
        let (inner_bytes, digest) = plaintext.split_at(plaintext.len() - DIGEST_LEN);
        let expected = &sha256(inner_bytes)[..DIGEST_LEN];
        if expected != digest {
            return Err(ProtocolError::new("envelope/v5", ProtocolErrorKind::BadV5Digest));
        }
        let request = kms_core::decode(inner_bytes)?;
        Ok((Self::V5 { salt }, request))
    }

    fn open_v6(body: &[u8]) -> ProtocolResult<(Self, ClientRequest)> {
        if body.len() < 16 + DIGEST_LEN {
            return Err(ProtocolError::new("envelope/v6", ProtocolErrorKind::MalformedPdu));
        }
        let (iv_bytes, rest) = body.split_at(16);
        let (ciphertext, cmac_tag) = rest.split_at(rest.len() - DIGEST_LEN);
        let mut iv = [0u8; 16];
        iv.copy_from_slice(iv_bytes);

        let mut mac_input = Vec::with_capacity(16 + ciphertext.len());
        mac_input.extend_from_slice(&iv);
        mac_input.extend_from_slice(ciphertext);
        let mut tag = [0u8; 16];
        tag.copy_from_slice(cmac_tag);
        if !verify_aes_cmac(&KEY_V6, &mac_input, &tag) {
            return Err(ProtocolError::new("envelope/v6", ProtocolErrorKind::BadV6Cmac));
        }

        let plaintext = aes128_cbc_decrypt(&KEY_V6, &iv, ciphertext)
            .map_err(|_| ProtocolError::new("envelope/v6", ProtocolErrorKind::MalformedPdu))?;
        let request = kms_core::decode(&plaintext)?;
        Ok((Self::V6 { iv }, request))
    }

    /// Wraps an encoded inner response in this envelope, producing the final
    /// `ActivationResponse` payload bytes.
    pub fn seal(&self, inner: &[u8]) -> ProtocolResult<Vec<u8>> {
        let (major, minor) = self.version().major_minor();
        let mut out = Vec::new();
        {
            let mut header = [0u8; 4];
            let mut cursor = WriteCursor::new(&mut header);
            cursor.write_u16(u16::from(major));
            cursor.write_u16(u16::from(minor));
            out.extend_from_slice(&header);
        }

        match self {
            Self::V4 => {
                let hash = &hmac_sha256(&HASH_KEY_V4, inner)[..DIGEST_LEN];
                out.extend_from_slice(inner);
                out.extend_from_slice(hash);
            }
            Self::V5 { .. } => {
                // Responses always rebuild a fresh random salt.
                let salt = rand_array::<16>();
                let key = derive_v5_key(&salt);
                let digest = &sha256(inner)[..DIGEST_LEN];
                let mut plaintext = Vec::with_capacity(inner.len() + DIGEST_LEN);
                plaintext.extend_from_slice(inner);
                plaintext.extend_from_slice(digest);
                let ciphertext = rc4(&key, &plaintext);
                out.extend_from_slice(&salt);
                out.extend_from_slice(&ciphertext);
            }
            Self::V6 { .. } => {
                let iv = rand_array::<16>();
                let ciphertext = aes128_cbc_encrypt(&KEY_V6, &iv, inner);
                let mut mac_input = Vec::with_capacity(16 + ciphertext.len());
                mac_input.extend_from_slice(&iv);
                mac_input.extend_from_slice(&ciphertext);
                let tag = aes_cmac(&KEY_V6, &mac_input);
                out.extend_from_slice(&iv);
                out.extend_from_slice(&ciphertext);
                out.extend_from_slice(&tag);
            }
        }

        Ok(out)
    }
}

/// Folds the per-session `salt` with the fixed `KEY_V5` constant into the
/// RC4 key for this session: HMAC-SHA-256(salt, KEY_V5) truncated to 16
/// bytes (see `DESIGN.md` for why a keyed PRF was chosen here).
fn derive_v5_key(salt: &[u8; 16]) -> [u8; 16] {
    let mut key = [0u8; 16];
    key.copy_from_slice(&hmac_sha256(salt, &KEY_V5)[..16]);
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine_name::MachineName;
    use crate::request::LicenseStatus;
    use kms_core::{Filetime, Uuid};

    fn sample_request() -> ClientRequest {
        ClientRequest {
            version: KmsVersion::V4,
            is_client_pid_verified: true,
            license_status: LicenseStatus::Licensed,
            graceful_shutdown: 0,
            activation_request_count: 1,
            application_group: Uuid::parse("55c92734-d682-4d71-983e-d6ec3f16059f").unwrap(),
            activation_id: Uuid::parse("2de67392-b7a7-462a-b1ca-108dd189f588").unwrap(),
            key_management_id: Uuid::nil(),
            client_machine_id: Uuid::parse("00112233-4455-6677-8899-aabbccddeeff").unwrap(),
            required_client_count: 25,
            request_time: Filetime::from_ticks(132_000_000_000_000_000),
            previous_client_machine_id: Uuid::nil(),
            machine_name: MachineName::new("WIN11-HOST").unwrap(),
        }
    }

    fn seal_request(envelope: &Envelope, request: &ClientRequest) -> Vec<u8> {
        let inner = kms_core::encode_vec(request).unwrap();
        envelope.seal(&inner).unwrap()
    }

    #[test]
    fn v4_round_trips() {
        let mut req = sample_request();
        req.version = KmsVersion::V4;
        let raw = seal_request(&Envelope::V4, &req);
        let (envelope, decoded) = Envelope::open(&raw).unwrap();
        assert!(matches!(envelope, Envelope::V4));
        assert_eq!(decoded.client_machine_id, req.client_machine_id);
    }

    #[test]
    fn v4_rejects_tampered_hash() {
        let mut req = sample_request();
        req.version = KmsVersion::V4;
        let mut raw = seal_request(&Envelope::V4, &req);
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        let err = Envelope::open(&raw).unwrap_err();
        assert!(matches!(err.kind(), ProtocolErrorKind::BadV4Hash));
    }

    #[test]
    fn v5_round_trips() {
        let mut req = sample_request();
        req.version = KmsVersion::V5;
        let envelope = Envelope::V5 { salt: [0x11; 16] };
        let raw = seal_request(&envelope, &req);
        let (opened, decoded) = Envelope::open(&raw).unwrap();
        assert!(matches!(opened, Envelope::V5 { .. }));
        assert_eq!(decoded.client_machine_id, req.client_machine_id);
    }

    #[test]
    fn v6_round_trips_and_detects_tamper() {
        let mut req = sample_request();
        req.version = KmsVersion::V6;
        let envelope = Envelope::V6 { iv: [0x22; 16] };
        let mut raw = seal_request(&envelope, &req);
        let (opened, decoded) = Envelope::open(&raw).unwrap();
        assert!(matches!(opened, Envelope::V6 { .. }));
        assert_eq!(decoded.client_machine_id, req.client_machine_id);

        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        let err = Envelope::open(&raw).unwrap_err();
        assert!(matches!(err.kind(), ProtocolErrorKind::BadV6Cmac));
    }
}
