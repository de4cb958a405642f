//! The KMS message layer: decodes a Client Request, builds a Response,
//! and dispatches the V4/V5/V6 envelope that wraps both.
//!
//! `kms-core` supplies the cursor/codec primitives, `kms-crypto` the raw
//! cryptographic operations, `kms-catalog` the product table, and this
//! crate the KMS-specific wire types and protocol logic built on top of
//! them.

mod envelope;
mod epid;
mod error;
mod keys;
mod machine_name;
mod request;
mod respond;
mod response;
mod version;

pub use envelope::Envelope;
pub use epid::{apply_epid_override, derive_epid};
pub use error::{ProtocolError, ProtocolErrorKind, ProtocolResult};
pub use keys::{HASH_KEY_V4, KEY_V5, KEY_V6};
pub use machine_name::MachineName;
pub use request::{ClientRequest, LicenseStatus};
pub use respond::{build_response, ActivationConfig};
pub use response::KmsResponse;
pub use version::KmsVersion;
