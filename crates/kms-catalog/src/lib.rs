//! The static, read-only product catalog: SKU and application-group tables
//! used to resolve display names, EPID prefixes, and activation-count
//! floors.
//!
//! The data is embedded JSON ([`include_str!`]), parsed once into a
//! [`std::sync::OnceLock`]-backed table. There is no mutation after startup,
//! so every lookup here is a lock-free read.

mod catalog;
mod error;

pub use catalog::{app_name, init, kms_pid_prefix, min_clients, sku_group, sku_name, ApplicationGroupEntry, SkuEntry};
pub use error::{CatalogError, CatalogErrorKind, CatalogResult};
