//! Cursor-based binary codec primitives shared by every layer of the KMS
//! engine: the [`ReadCursor`]/[`WriteCursor`] pair and the [`Decode`]/[`Encode`]
//! traits built on top of them.
//!
//! This mirrors the cursor/trait split used throughout the RDP PDU stack
//! this engine is descended from: a thin, allocation-free cursor doing the
//! byte shuffling, and a pair of traits giving every wire type a uniform
//! `decode`/`encode` entry point.

mod codec;
mod cursor;
mod error;
mod filetime;
mod string;
mod uuid;

pub use codec::*;
pub use cursor::*;
pub use error::*;
pub use filetime::Filetime;
pub use string::{read_utf16le_string, utf16le_string_size, write_utf16le_string};
pub use uuid::Uuid;
