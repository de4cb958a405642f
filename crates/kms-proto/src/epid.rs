use chrono::{TimeZone, Utc};
use kms_core::{Filetime, Uuid};

/// Builds a derived EPID (`kms_epid`) for an application group/LCID/request
/// time, when no `epid_override` is configured.
///
/// Layout: `{kms_pid_prefix:5}05{activation_segment:6}03{lcid:5}.{date:10}`
/// — the 5-digit group PID prefix, a fixed `05`, a random 6-digit
/// group-activation-count segment, a fixed `03`, the LCID padded to 5
/// digits, a literal `.`, and a 10-digit date derived from `request_time`
/// (`YYYYMMDDHH`, UTC).
#[must_use]
pub fn derive_epid(app_group: Uuid, lcid: u16, request_time: Filetime) -> String {
    let prefix = kms_catalog::kms_pid_prefix(app_group).unwrap_or("00000");
    let activation_segment = random_activation_segment();
    format!("{prefix}05{activation_segment}03{lcid:05}.{}", date_segment(request_time))
}

fn random_activation_segment() -> String {
    let bytes = kms_crypto::rand_array::<4>();
    let value = u32::from_le_bytes(bytes) % 1_000_000;
    format!("{value:06}")
}

fn date_segment(request_time: Filetime) -> String {
    let secs = i64::try_from(request_time.to_unix_seconds()).unwrap_or(i64::MAX);
    let dt = Utc
        .timestamp_opt(secs, 0)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().expect("epoch is a valid timestamp"));
    dt.format("%Y%m%d%H").to_string()
}

/// Truncates or pads a server-supplied EPID override to exactly 16 UTF-16
/// code units.
#[must_use]
pub fn apply_epid_override(raw: &str) -> String {
    let mut units: Vec<u16> = raw.encode_utf16().take(16).collect();
    units.resize(16, 0);
    String::from_utf16_lossy(&units).trim_end_matches('\0').to_owned()
}
