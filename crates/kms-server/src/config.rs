use std::net::IpAddr;
use std::time::Duration;

use kms_proto::ActivationConfig;

/// The server's 8-byte host identifier.
///
/// `Random` is resolved to a concrete value once at process startup by the
/// caller — treated as ephemeral for the life of the process unless
/// configuration explicitly persists it — this type only distinguishes
/// the two configuration inputs; [`crate::run`] is always given the
/// resolved `[u8; 8]` to thread through sessions.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Hwid {
    Fixed([u8; 8]),
    Random,
}

/// The documented default HWID, `364F463A8863D35F`.
pub const DEFAULT_HWID: [u8; 8] = [0x36, 0x4F, 0x46, 0x3A, 0x88, 0x63, 0xD3, 0x5F];

/// Immutable server configuration, shared by reference across every
/// session for the lifetime of the process. Nothing here changes once
/// [`crate::run`] is called — there is no live-reload path.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub epid_override: Option<String>,
    pub hwid: Hwid,
    pub lcid: u16,
    pub client_count: u16,
    pub activation_interval_min: u32,
    pub renewal_interval_min: u32,
    /// Per-session read idle timeout. `None` means blocking reads,
    /// unset by default.
    pub timeout_idle: Option<Duration>,
    /// How long [`crate::run`] waits for in-flight sessions to finish
    /// their current exchange after a shutdown signal before forcing them
    /// closed (default 5 seconds).
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    /// Projects the subset of this record the KMS message layer
    /// needs to build a response.
    #[must_use]
    pub fn to_activation_config(&self) -> ActivationConfig {
        ActivationConfig {
            epid_override: self.epid_override.clone(),
            lcid: self.lcid,
            client_count: self.client_count,
            activation_interval_min: self.activation_interval_min,
            renewal_interval_min: self.renewal_interval_min,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::from([0, 0, 0, 0]),
            port: 1688,
            epid_override: None,
            hwid: Hwid::Fixed(DEFAULT_HWID),
            lcid: 1033,
            client_count: 50,
            activation_interval_min: 120,
            renewal_interval_min: 10_080,
            timeout_idle: None,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 1688);
        assert_eq!(config.lcid, 1033);
        assert_eq!(config.client_count, 50);
        assert_eq!(config.activation_interval_min, 120);
        assert_eq!(config.renewal_interval_min, 10_080);
        assert!(config.timeout_idle.is_none());
        assert_eq!(config.hwid, Hwid::Fixed(DEFAULT_HWID));
    }

    #[test]
    fn projects_activation_config() {
        let config = ServerConfig::default();
        let activation = config.to_activation_config();
        assert_eq!(activation.lcid, config.lcid);
        assert_eq!(activation.client_count, config.client_count);
    }
}
