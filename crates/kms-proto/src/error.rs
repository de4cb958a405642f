use core::fmt;

use kms_error::{InvalidFieldErr, OtherErr, UnsupportedVersionErr};

pub type ProtocolResult<T> = Result<T, ProtocolError>;
pub type ProtocolError = kms_error::Error<ProtocolErrorKind>;

/// Every way a KMS exchange can fail, spanning both RPC framing and the
/// KMS message layer — the two are reported through one taxonomy because
/// neither ever surfaces an in-band error frame to the client: a
/// `ProtocolError` always means the connection closes.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum ProtocolErrorKind {
    /// A PDU failed to decode: bad header, truncated body, NDR conformant
    /// array bounds that don't fit the fragment.
    MalformedPdu,
    /// A DCE/RPC `Request` named an opnum other than 0.
    UnknownOpnum(u16),
    /// A `Request` arrived before a `Bind` was accepted on this connection.
    BindBeforeRequest,
    /// The decoded version tuple isn't one of `(4,0)`, `(5,0)`, `(6,0)`.
    UnsupportedVersion { major: u8, minor: u8 },
    /// V4 envelope: the trailing keyed hash didn't match.
    BadV4Hash,
    /// V5 envelope: the decrypted trailing digest didn't match
    /// `sha256(inner)[0..16]`.
    BadV5Digest,
    /// V6 envelope: the trailing AES-CMAC didn't verify.
    BadV6Cmac,
    /// A field inside the decoded message violated a protocol invariant.
    InvalidField { field: &'static str, reason: &'static str },
    /// A wire-decode error from a lower codec layer.
    Decode,
}

impl fmt::Display for ProtocolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedPdu => write!(f, "malformed PDU"),
            Self::UnknownOpnum(opnum) => write!(f, "unknown opnum {opnum}"),
            Self::BindBeforeRequest => write!(f, "request received before bind"),
            Self::UnsupportedVersion { major, minor } => write!(f, "unsupported KMS version ({major}.{minor})"),
            Self::BadV4Hash => write!(f, "V4 keyed hash mismatch"),
            Self::BadV5Digest => write!(f, "V5 trailing digest mismatch"),
            Self::BadV6Cmac => write!(f, "V6 CMAC mismatch"),
            Self::InvalidField { field, reason } => write!(f, "invalid `{field}`: {reason}"),
            Self::Decode => write!(f, "failed to decode KMS message"),
        }
    }
}

impl InvalidFieldErr for ProtocolError {
    fn invalid_field(context: &'static str, field: &'static str, reason: &'static str) -> Self {
        Self::new(context, ProtocolErrorKind::InvalidField { field, reason })
    }
}

impl UnsupportedVersionErr for ProtocolError {
    fn unsupported_version(context: &'static str, major: u8, minor: u8) -> Self {
        Self::new(context, ProtocolErrorKind::UnsupportedVersion { major, minor })
    }
}

impl OtherErr for ProtocolError {
    fn other(context: &'static str, _description: &'static str) -> Self {
        Self::new(context, ProtocolErrorKind::Decode)
    }
}

impl From<kms_core::DecodeError> for ProtocolError {
    fn from(e: kms_core::DecodeError) -> Self {
        Self::new("kms_proto", ProtocolErrorKind::Decode).with_source(e)
    }
}
