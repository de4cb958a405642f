use std::collections::HashMap;
use std::sync::OnceLock;

use kms_core::Uuid;
use serde::Deserialize;

use crate::error::{CatalogError, CatalogErrorKind, CatalogResult};

const DATA: &str = include_str!("data.json");

/// One KMS application group: a family of SKUs sharing a KMS identity
/// (Windows, Windows Server, Office, ...).
#[derive(Clone, Debug)]
pub struct ApplicationGroupEntry {
    pub uuid: Uuid,
    pub display_name: String,
    /// 5 decimal digits, the fixed prefix of derived EPIDs for this group.
    pub kms_pid_prefix: String,
    pub min_clients: u32,
}

/// One product SKU (edition) and the application group it belongs to.
#[derive(Clone, Debug)]
pub struct SkuEntry {
    pub uuid: Uuid,
    pub display_name: String,
    pub group_uuid: Uuid,
}

#[derive(Deserialize)]
struct RawApplicationGroup {
    uuid: String,
    display_name: String,
    kms_pid_prefix: String,
    min_clients: u32,
}

#[derive(Deserialize)]
struct RawSku {
    uuid: String,
    display_name: String,
    group_uuid: String,
}

#[derive(Deserialize)]
struct RawCatalog {
    application_groups: Vec<RawApplicationGroup>,
    skus: Vec<RawSku>,
}

struct Catalog {
    groups: HashMap<Uuid, ApplicationGroupEntry>,
    skus: HashMap<Uuid, SkuEntry>,
}

fn parse_uuid(entry: &'static str, value: &str) -> CatalogResult<Uuid> {
    Uuid::parse(value).ok_or_else(|| {
        CatalogError::new(
            "catalog",
            CatalogErrorKind::InvalidUuid {
                entry,
                value: value.to_owned(),
            },
        )
    })
}

impl Catalog {
    fn parse(json: &str) -> CatalogResult<Self> {
        let raw: RawCatalog = serde_json::from_str(json)
            .map_err(|e| CatalogError::new("catalog", CatalogErrorKind::MalformedJson).with_source(e))?;

        let mut groups = HashMap::with_capacity(raw.application_groups.len());
        for g in raw.application_groups {
            let uuid = parse_uuid("application_groups[].uuid", &g.uuid)?;
            groups.insert(
                uuid,
                ApplicationGroupEntry {
                    uuid,
                    display_name: g.display_name,
                    kms_pid_prefix: g.kms_pid_prefix,
                    min_clients: g.min_clients,
                },
            );
        }

        let mut skus = HashMap::with_capacity(raw.skus.len());
        for s in raw.skus {
            let uuid = parse_uuid("skus[].uuid", &s.uuid)?;
            let group_uuid = parse_uuid("skus[].group_uuid", &s.group_uuid)?;
            skus.insert(
                uuid,
                SkuEntry {
                    uuid,
                    display_name: s.display_name,
                    group_uuid,
                },
            );
        }

        Ok(Self { groups, skus })
    }
}

static CATALOG: OnceLock<Catalog> = OnceLock::new();

/// Parses and installs the embedded catalog. Call this once at process
/// startup so a malformed catalog can be reported before any connection is
/// accepted; if never called, the catalog is still built lazily on first
/// lookup.
pub fn init() -> CatalogResult<()> {
    let catalog = Catalog::parse(DATA)?;
    // A concurrent caller may have already installed it; either way the
    // embedded data is identical, so losing this race is harmless.
    let _ = CATALOG.set(catalog);
    Ok(())
}

fn catalog() -> &'static Catalog {
    CATALOG.get_or_init(|| Catalog::parse(DATA).expect("embedded catalog data is well-formed"))
}

/// Display name for an application group, falling back to its hex UUID
/// bytes when unknown. Falling back never logs above debug level.
#[must_use]
pub fn app_name(app_uuid: Uuid) -> String {
    catalog()
        .groups
        .get(&app_uuid)
        .map_or_else(|| hex_fallback(app_uuid), |g| g.display_name.clone())
}

/// Display name for a SKU, falling back to its hex UUID bytes when unknown.
#[must_use]
pub fn sku_name(sku_uuid: Uuid) -> String {
    catalog()
        .skus
        .get(&sku_uuid)
        .map_or_else(|| hex_fallback(sku_uuid), |s| s.display_name.clone())
}

/// Minimum `activated_machines` count this application group requires.
/// Unknown groups have no policy floor, so this is `0`.
#[must_use]
pub fn min_clients(app_uuid: Uuid) -> u32 {
    catalog().groups.get(&app_uuid).map_or(0, |g| g.min_clients)
}

/// The 5-digit EPID prefix for an application group, if known.
#[must_use]
pub fn kms_pid_prefix(app_uuid: Uuid) -> Option<&'static str> {
    catalog().groups.get(&app_uuid).map(|g| g.kms_pid_prefix.as_str())
}

/// The application group a SKU belongs to, if the SKU is known.
#[must_use]
pub fn sku_group(sku_uuid: Uuid) -> Option<Uuid> {
    catalog().skus.get(&sku_uuid).map(|s| s.group_uuid)
}

fn hex_fallback(uuid: Uuid) -> String {
    let bytes = uuid.canonical_bytes();
    let mut out = String::with_capacity(32);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows_group() -> Uuid {
        Uuid::parse("55c92734-d682-4d71-983e-d6ec3f16059f").unwrap()
    }

    fn windows_11_pro() -> Uuid {
        Uuid::parse("2de67392-b7a7-462a-b1ca-108dd189f588").unwrap()
    }

    #[test]
    fn known_application_group_resolves() {
        assert_eq!(app_name(windows_group()), "Windows");
        assert_eq!(min_clients(windows_group()), 25);
        assert_eq!(kms_pid_prefix(windows_group()), Some("03612"));
    }

    #[test]
    fn known_sku_resolves_to_its_group() {
        assert_eq!(sku_name(windows_11_pro()), "Windows 11 Professional");
        assert_eq!(sku_group(windows_11_pro()), Some(windows_group()));
    }

    #[test]
    fn unknown_sku_falls_back_to_hex_with_no_floor() {
        let unknown = Uuid::parse("00000000-0000-0000-0000-000000000001").unwrap();
        assert_eq!(sku_name(unknown), "00000000000000000000000000000001");
        assert_eq!(min_clients(unknown), 0);
    }

    #[test]
    fn embedded_json_parses() {
        assert!(Catalog::parse(DATA).is_ok());
    }
}
