use crate::epid::{apply_epid_override, derive_epid};
use crate::request::ClientRequest;
use crate::response::KmsResponse;
use crate::version::KmsVersion;

/// The subset of the engine's configuration record the message layer needs
/// to build a response. Owned by the caller (the session engine), which
/// assembles it once from the process-wide config.
#[derive(Clone, Debug)]
pub struct ActivationConfig {
    pub epid_override: Option<String>,
    pub lcid: u16,
    pub client_count: u16,
    pub activation_interval_min: u32,
    pub renewal_interval_min: u32,
}

/// Builds the KMS Response for a decoded request.
///
/// `existing_epid` is whatever the activation store already has on file for
/// this (CMID, application-group) pair; when present it is reused verbatim
/// so repeat requests from the same client see a stable EPID. `hwid` is
/// the server's configured or once-randomized
/// host identifier, used only for V6's `kms_host_id`.
#[must_use]
pub fn build_response(
    request: &ClientRequest,
    config: &ActivationConfig,
    existing_epid: Option<&str>,
    hwid: [u8; 8],
) -> KmsResponse {
    let floor = request
        .required_client_count
        .max(kms_catalog::min_clients(request.application_group));
    let activated_machines = floor.max(u32::from(config.client_count));

    let kms_epid = match (&config.epid_override, existing_epid) {
        (Some(over), _) => apply_epid_override(over),
        (None, Some(existing)) => existing.to_owned(),
        (None, None) => derive_epid(request.application_group, config.lcid, request.request_time),
    };

    let kms_host_id = matches!(request.version, KmsVersion::V6).then(|| derive_kms_host_id(hwid));

    KmsResponse {
        client_machine_id: request.client_machine_id,
        request_time: request.request_time,
        version: request.version,
        application_group: request.application_group,
        activated_machines,
        activation_interval: config.activation_interval_min,
        renewal_interval: config.renewal_interval_min,
        kms_epid,
        kms_host_id,
    }
}

fn derive_kms_host_id(hwid: [u8; 8]) -> [u8; 16] {
    let mut buf = Vec::with_capacity(8 + b"Microsoft".len());
    buf.extend_from_slice(&hwid);
    buf.extend_from_slice(b"Microsoft");
    let digest = kms_crypto::sha256(&buf);
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest[..16]);
    out
}
