use std::net::SocketAddr;

use kms_core::{Filetime, Uuid};
use kms_proto::ProtocolErrorKind;
use kms_store::StorageErrorKind;
use tokio::sync::mpsc;

/// The three verbosity tiers this engine names (`MINI`/`INFO`/`DEBUG`).
/// Ordered so a lower variant is strictly less verbose than a higher one;
/// a configured floor shows every event at or below it.
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Debug)]
pub enum EventLevel {
    Minimal,
    Info,
    Debug,
}

/// The structured event stream the session engine emits back to the
/// caller in place of logging directly. `RequestAccepted`/`ResponseSent`
/// are the two events a `Minimal` log level still shows; the error
/// variants need at least `Info`; `CatalogMiss` needs `Debug` — a catalog
/// fallback is a routine, expected occurrence, not a warning.
#[derive(Clone, Debug)]
pub enum Event {
    RequestAccepted {
        peer: SocketAddr,
        cmid: Uuid,
        version: (u8, u8),
        app_group: Uuid,
        sku: Uuid,
        request_time: Filetime,
        client_count: u32,
    },
    ResponseSent {
        peer: SocketAddr,
        cmid: Uuid,
        epid: String,
        activated_count: u32,
    },
    ProtocolError {
        peer: SocketAddr,
        kind: ProtocolErrorKind,
        details: String,
    },
    StorageError {
        cmid: Uuid,
        kind: StorageErrorKind,
    },
    /// An application-group or SKU UUID the static catalog has no entry
    /// for. Falls back to a generic name but is otherwise unremarkable, so
    /// it gets its own variant rather than being folded into a generic one.
    CatalogMiss { uuid: Uuid, what: &'static str },
    /// Accept/read/write failed. `peer` is `None` for accept-loop failures
    /// that precede a connection existing.
    ResourceError { peer: Option<SocketAddr>, details: String },
}

impl Event {
    #[must_use]
    pub const fn level(&self) -> EventLevel {
        match self {
            Self::RequestAccepted { .. } | Self::ResponseSent { .. } => EventLevel::Minimal,
            Self::ProtocolError { .. } | Self::StorageError { .. } | Self::ResourceError { .. } => EventLevel::Info,
            Self::CatalogMiss { .. } => EventLevel::Debug,
        }
    }
}

/// Where [`crate::session::run_session`] and [`crate::server::run`] send
/// every [`Event`]; the caller owns the receiving end and decides how (or
/// whether) to render them.
pub type EventSender = mpsc::UnboundedSender<Event>;
