//! A small generic error wrapper shared by every crate in the KMS engine.
//!
//! Each layer (codec, protocol, RPC framing, storage) defines its own `Kind`
//! enum and uses [`Error<Kind>`] to carry a `'static` context string plus an
//! optional boxed source, instead of hand-rolling a `{context}: {kind}`
//! `Display` impl and a `source()` chain in every crate.

use std::error::Error as StdError;
use std::fmt;

pub trait Source: StdError + Sync + Send + 'static {}

impl<T> Source for T where T: StdError + Sync + Send + 'static {}

#[derive(Debug)]
pub struct Error<Kind> {
    pub context: &'static str,
    pub kind: Kind,
    source: Option<Box<dyn StdError + Sync + Send>>,
}

impl<Kind> Error<Kind> {
    #[must_use]
    pub fn new(context: &'static str, kind: Kind) -> Self {
        Self {
            context,
            kind,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source<E: Source>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }
}

impl<Kind: fmt::Display> fmt::Display for Error<Kind> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.context, self.kind)
    }
}

impl<Kind: fmt::Debug + fmt::Display> StdError for Error<Kind> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|e| e as _)
    }
}

/// Creates a `"not enough bytes"` error.
pub trait NotEnoughBytesErr {
    fn not_enough_bytes(context: &'static str, received: usize, expected: usize) -> Self;
}

pub fn not_enough_bytes_err<T: NotEnoughBytesErr>(context: &'static str, received: usize, expected: usize) -> T {
    T::not_enough_bytes(context, received, expected)
}

/// Creates an `"invalid field"` error.
pub trait InvalidFieldErr {
    fn invalid_field(context: &'static str, field: &'static str, reason: &'static str) -> Self;
}

pub fn invalid_field_err<T: InvalidFieldErr>(context: &'static str, field: &'static str, reason: &'static str) -> T {
    T::invalid_field(context, field, reason)
}

/// Creates an `"unsupported version"` error.
pub trait UnsupportedVersionErr {
    fn unsupported_version(context: &'static str, major: u8, minor: u8) -> Self;
}

pub fn unsupported_version_err<T: UnsupportedVersionErr>(context: &'static str, major: u8, minor: u8) -> T {
    T::unsupported_version(context, major, minor)
}

/// Creates a generic `"other"` error.
pub trait OtherErr {
    fn other(context: &'static str, description: &'static str) -> Self;
}

pub fn other_err<T: OtherErr>(context: &'static str, description: &'static str) -> T {
    T::other(context, description)
}
