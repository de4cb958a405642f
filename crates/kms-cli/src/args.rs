use std::net::IpAddr;

use clap::{Parser, ValueEnum};

/// Ambient KMS activation server.
#[derive(Parser, Debug)]
#[clap(about = "KMS activation server")]
#[clap(version, long_about = None)]
pub(crate) struct Args {
    /// Address to bind the listener to.
    #[clap(long, env = "KMS_IP", default_value = "0.0.0.0")]
    pub(crate) ip: IpAddr,

    /// Port to bind the listener to.
    #[clap(long, env = "KMS_PORT", default_value_t = 1688)]
    pub(crate) port: u16,

    /// Overrides the derived EPID instead of computing one per request.
    #[clap(long, env = "KMS_EPID")]
    pub(crate) epid: Option<String>,

    /// The 8-byte host identifier, as 16 hex characters, or the literal
    /// `RANDOM` to generate one at startup.
    #[clap(long, env = "KMS_HWID", default_value = "364F463A8863D35F")]
    pub(crate) hwid: String,

    /// Locale ID embedded in responses.
    #[clap(long, env = "KMS_LCID", default_value_t = 1033)]
    pub(crate) lcid: u16,

    /// Minimum client count advertised to callers.
    #[clap(long = "client-count", env = "KMS_CLIENT_COUNT", default_value_t = 50)]
    pub(crate) client_count: u16,

    /// Activation retry interval, in minutes.
    #[clap(long = "activation-interval", env = "KMS_ACTIVATION_INTERVAL", default_value_t = 120)]
    pub(crate) activation_interval: u32,

    /// License renewal interval, in minutes.
    #[clap(long = "renewal-interval", env = "KMS_RENEWAL_INTERVAL", default_value_t = 10_080)]
    pub(crate) renewal_interval: u32,

    /// Per-connection idle read timeout, in seconds. Unset means blocking reads.
    #[clap(long = "timeout-idle", env = "KMS_TIMEOUT_IDLE")]
    pub(crate) timeout_idle: Option<u64>,

    /// Path to a sqlite database used to persist activation records. Unset
    /// disables persistence: every request is treated as first contact.
    #[clap(long, env = "KMS_SQLITE")]
    pub(crate) sqlite: Option<String>,

    /// Event verbosity shown on stderr.
    #[clap(long, env = "KMS_LOGLEVEL", value_enum, default_value_t = LogLevel::Info)]
    pub(crate) loglevel: LogLevel,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogLevel {
    Mini,
    Info,
    Debug,
}

impl LogLevel {
    #[must_use]
    pub(crate) const fn to_event_level(self) -> kms_server::EventLevel {
        match self {
            Self::Mini => kms_server::EventLevel::Minimal,
            Self::Info => kms_server::EventLevel::Info,
            Self::Debug => kms_server::EventLevel::Debug,
        }
    }
}
