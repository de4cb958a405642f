use std::sync::Mutex;

use chrono::Utc;
use kms_core::{Filetime, Uuid};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{migration_err, open_err, query_err, StorageResult};

const RING_SIZE: usize = 6;

/// Outcome of upserting one activation record: the EPID to embed in the
/// response (the record's existing EPID if one was already on file, or the
/// freshly derived one this call persisted) and the running request count.
#[derive(Clone, Debug)]
pub struct UpsertOutcome {
    pub epid: String,
    pub n_requests: u32,
    pub is_new: bool,
}

/// Persistent bookkeeping of activation records keyed by (CMID,
/// application-group).
///
/// A single `Mutex<Connection>` serializes all access — SQLite itself only
/// ever allows one writer, so per-CMID locking would add a second layer of
/// bookkeeping over a backend that already gives us this for free.
pub struct ActivationStore {
    conn: Mutex<Connection>,
}

impl ActivationStore {
    /// Opens (or creates) the store at `path`. `":memory:"` opens a
    /// private in-memory database, used by scenario S6 and by tests.
    pub fn open(path: &str) -> StorageResult<Self> {
        let conn = Connection::open(path).map_err(open_err)?;
        let store = Self { conn: Mutex::new(conn) };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> StorageResult<()> {
        tracing::debug!("running activation store migration");
        let conn = self.lock();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS clients (
                cmid TEXT NOT NULL,
                app_group TEXT NOT NULL,
                sku TEXT NOT NULL,
                epid TEXT NOT NULL,
                first_request_time TEXT NOT NULL,
                last_request_time TEXT NOT NULL,
                n_requests INTEGER NOT NULL,
                ring_1 INTEGER,
                ring_2 INTEGER,
                ring_3 INTEGER,
                ring_4 INTEGER,
                ring_5 INTEGER,
                ring_6 INTEGER,
                PRIMARY KEY (cmid, app_group)
            )",
            [],
        )
        .map_err(migration_err)?;

        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Upserts the activation record for `(cmid, app_group)`. On first
    /// contact the record is created with `candidate_epid` and
    /// `n_requests = 1`; on every later contact the existing EPID is
    /// returned unchanged, `last_request_time` is refreshed, `request_time`
    /// is pushed into the ring of the 6 most recent request FILETIMEs, and
    /// `n_requests` is incremented.
    pub fn upsert(
        &self,
        cmid: Uuid,
        app_group: Uuid,
        sku: Uuid,
        candidate_epid: &str,
        request_time: Filetime,
    ) -> StorageResult<UpsertOutcome> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.lock();
        let tx = conn.transaction().map_err(query_err)?;

        let existing: Option<(String, u32, [Option<i64>; RING_SIZE])> = tx
            .query_row(
                "SELECT epid, n_requests, ring_1, ring_2, ring_3, ring_4, ring_5, ring_6
                 FROM clients WHERE cmid = ?1 AND app_group = ?2",
                params![cmid.to_string(), app_group.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        [
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                            row.get(7)?,
                        ],
                    ))
                },
            )
            .optional()
            .map_err(query_err)?
            .map(|(epid, n_requests, ring)| (epid, u32::try_from(n_requests).unwrap_or(u32::MAX), ring));

        let outcome = if let Some((epid, n_requests, mut ring)) = existing {
            ring.rotate_right(1);
            ring[0] = Some(i64::try_from(request_time.ticks()).unwrap_or(i64::MAX));
            let n_requests = n_requests.saturating_add(1);

            tx.execute(
                "UPDATE clients
                 SET sku = ?1, last_request_time = ?2, n_requests = ?3,
                     ring_1 = ?4, ring_2 = ?5, ring_3 = ?6, ring_4 = ?7, ring_5 = ?8, ring_6 = ?9
                 WHERE cmid = ?10 AND app_group = ?11",
                params![
                    sku.to_string(),
                    now,
                    i64::from(n_requests),
                    ring[0],
                    ring[1],
                    ring[2],
                    ring[3],
                    ring[4],
                    ring[5],
                    cmid.to_string(),
                    app_group.to_string(),
                ],
            )
            .map_err(query_err)?;

            UpsertOutcome {
                epid,
                n_requests,
                is_new: false,
            }
        } else {
            tx.execute(
                "INSERT INTO clients (
                    cmid, app_group, sku, epid, first_request_time, last_request_time, n_requests, ring_1
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?5, 1, ?6)",
                params![
                    cmid.to_string(),
                    app_group.to_string(),
                    sku.to_string(),
                    candidate_epid,
                    now,
                    i64::try_from(request_time.ticks()).unwrap_or(i64::MAX),
                ],
            )
            .map_err(query_err)?;

            UpsertOutcome {
                epid: candidate_epid.to_owned(),
                n_requests: 1,
                is_new: true,
            }
        };

        tx.commit().map_err(query_err)?;
        Ok(outcome)
    }

    /// Looks up the EPID already on file for `(cmid, app_group)`, without
    /// recording a new request. Used to decide whether a derived EPID is
    /// needed at all before the crypto/derivation work runs.
    pub fn existing_epid(&self, cmid: Uuid, app_group: Uuid) -> StorageResult<Option<String>> {
        self.lock()
            .query_row(
                "SELECT epid FROM clients WHERE cmid = ?1 AND app_group = ?2",
                params![cmid.to_string(), app_group.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ids() -> (Uuid, Uuid, Uuid) {
        (
            Uuid::parse("00112233-4455-6677-8899-aabbccddeeff").unwrap(),
            Uuid::parse("55c92734-d682-4d71-983e-d6ec3f16059f").unwrap(),
            Uuid::parse("2de67392-b7a7-462a-b1ca-108dd189f588").unwrap(),
        )
    }

    #[test]
    fn first_request_creates_a_record() {
        let store = ActivationStore::open(":memory:").unwrap();
        let (cmid, app_group, sku) = sample_ids();

        let outcome = store
            .upsert(cmid, app_group, sku, "03612...", Filetime::from_ticks(132_000_000_000_000_000))
            .unwrap();

        assert!(outcome.is_new);
        assert_eq!(outcome.n_requests, 1);
        assert_eq!(outcome.epid, "03612...");
    }

    #[test]
    fn second_request_reuses_the_assigned_epid() {
        let store = ActivationStore::open(":memory:").unwrap();
        let (cmid, app_group, sku) = sample_ids();

        store
            .upsert(cmid, app_group, sku, "first-epid", Filetime::from_ticks(1))
            .unwrap();
        let second = store
            .upsert(cmid, app_group, sku, "second-epid-candidate", Filetime::from_ticks(2))
            .unwrap();

        assert!(!second.is_new);
        assert_eq!(second.n_requests, 2);
        assert_eq!(second.epid, "first-epid");
    }

    #[test]
    fn existing_epid_is_none_before_first_request() {
        let store = ActivationStore::open(":memory:").unwrap();
        let (cmid, app_group, _) = sample_ids();
        assert_eq!(store.existing_epid(cmid, app_group).unwrap(), None);
    }
}
