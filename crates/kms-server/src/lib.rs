//! The session engine and configuration/event surface: accepts
//! TCP connections speaking the KMS activation dialect, drives each one
//! through its own `Init -> BindSeen -> Active` state machine, and emits a
//! structured event stream back to the caller instead of logging directly.
//!
//! Everything here is a thin shell around `kms-rpc` (framing) and
//! `kms-proto` (the message layer); this crate's own job is TCP
//! acceptance, per-connection concurrency, idle/shutdown timing, and
//! wiring the optional `kms-store` activation record in.

mod config;
mod error;
mod events;
mod server;
mod session;

pub use config::{Hwid, ServerConfig, DEFAULT_HWID};
pub use error::{ServerError, ServerErrorKind, ServerResult};
pub use events::{Event, EventLevel, EventSender};
pub use server::run;
pub use session::SessionContext;
