use core::fmt;

use kms_error::{InvalidFieldErr, OtherErr};

pub type StorageResult<T> = Result<T, StorageError>;
pub type StorageError = kms_error::Error<StorageErrorKind>;

#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum StorageErrorKind {
    Open { description: String },
    Migration { description: String },
    Query { description: String },
    InvalidField { field: &'static str, reason: &'static str },
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { description } => write!(f, "failed to open activation store: {description}"),
            Self::Migration { description } => write!(f, "failed to migrate activation store schema: {description}"),
            Self::Query { description } => write!(f, "activation store query failed: {description}"),
            Self::InvalidField { field, reason } => write!(f, "invalid `{field}`: {reason}"),
        }
    }
}

impl InvalidFieldErr for StorageError {
    fn invalid_field(context: &'static str, field: &'static str, reason: &'static str) -> Self {
        Self::new(context, StorageErrorKind::InvalidField { field, reason })
    }
}

impl OtherErr for StorageError {
    fn other(context: &'static str, description: &'static str) -> Self {
        Self::new(context, StorageErrorKind::Query {
            description: description.to_owned(),
        })
    }
}

pub(crate) fn open_err(e: rusqlite::Error) -> StorageError {
    StorageError::new("activation_store::open", StorageErrorKind::Open {
        description: e.to_string(),
    })
}

pub(crate) fn migration_err(e: rusqlite::Error) -> StorageError {
    StorageError::new("activation_store::migrate", StorageErrorKind::Migration {
        description: e.to_string(),
    })
}

pub(crate) fn query_err(e: rusqlite::Error) -> StorageError {
    StorageError::new("activation_store::query", StorageErrorKind::Query {
        description: e.to_string(),
    })
}
