//! Activation bookkeeping: an optional SQLite-backed record per
//! `(CMID, application-group)`, tracking EPID assignment and request
//! history so repeat requests from the same client stay consistent.

mod error;
mod store;

pub use error::{StorageError, StorageErrorKind, StorageResult};
pub use store::{ActivationStore, UpsertOutcome};
