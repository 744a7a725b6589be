//! `SQLite`-backed record store.
//!
//! Mirrors the hosted table: ids come from `AUTOINCREMENT`, `created_at` is
//! assigned on insert and never goes backwards, even if the wall clock does.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::schema::{self, RECORDS_TABLE};
use super::RecordStore;
use crate::error::{Error, Result};
use crate::media::Photo;
use crate::record::{parse_timestamp, NewRecord, Record, RecordId};

const COLUMNS: &str =
    "id, name, email, designation, description, latitude, longitude, image, created_at";

/// Build a `SELECT` of every record column, followed by `tail`.
fn select_sql(tail: &str) -> String {
    format!("SELECT {COLUMNS} FROM {RECORDS_TABLE} {tail}")
}

/// Local record store.
#[derive(Debug)]
pub struct LocalStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection, never held across an await.
    conn: Mutex<Connection>,
}

impl LocalStore {
    /// Open or create a store at the given path.
    ///
    /// Creates parent directories as needed and migrates the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        debug!("Opening local store at {}", path.display());
        let mut conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        schema::migrate(&mut conn)?;

        info!("Local store ready at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        schema::migrate(&mut conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("local store connection lock poisoned"))
    }

    /// Insert a record, assigning its id and timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert(&self, record: &NewRecord) -> Result<Record> {
        let conn = self.conn()?;

        let last: Option<String> = conn
            .query_row(
                &format!("SELECT created_at FROM {RECORDS_TABLE} ORDER BY id DESC LIMIT 1"),
                [],
                |row| row.get(0),
            )
            .optional()?;
        let created_at = next_timestamp(
            Utc::now().trunc_subsecs(6),
            last.as_deref().and_then(parse_timestamp),
        );

        conn.execute(
            &format!(
                "INSERT INTO {RECORDS_TABLE}
                    (name, email, designation, description, latitude, longitude, image, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ),
            params![
                record.name,
                record.email,
                record.designation,
                record.description,
                record.latitude,
                record.longitude,
                record.image,
                format_timestamp(created_at),
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Inserted record with id {}", id);
        Ok(Record {
            id: RecordId::from(id),
            name: record.name.clone(),
            email: record.email.clone(),
            designation: record.designation.clone(),
            description: record.description.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
            image: record.image.clone(),
            created_at,
        })
    }

    /// Get a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: &RecordId) -> Result<Option<Record>> {
        let Some(rowid) = local_rowid(id) else {
            return Ok(None);
        };
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &select_sql("WHERE id = ?1"),
                [rowid],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Get every record in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn all(&self) -> Result<Vec<Record>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&select_sql("ORDER BY id ASC"))?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Delete a record by id.
    ///
    /// Returns `true` if a record was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn remove(&self, id: &RecordId) -> Result<bool> {
        let Some(rowid) = local_rowid(id) else {
            return Ok(false);
        };
        let affected = self
            .conn()?
            .execute(&format!("DELETE FROM {RECORDS_TABLE} WHERE id = ?1"), [rowid])?;
        Ok(affected > 0)
    }

    /// Count stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count = self.conn()?.query_row(
            &format!("SELECT COUNT(*) FROM {RECORDS_TABLE}"),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[async_trait]
impl RecordStore for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn list(&self) -> Result<Vec<Record>> {
        self.all()
    }

    async fn create(&self, record: &NewRecord, _photo: Option<&Photo>) -> Result<Record> {
        let created = self.insert(record)?;
        info!("Created record {}", created.id);
        Ok(created)
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        if self.remove(id)? {
            info!("Deleted record {}", id);
        } else {
            debug!("Record {} already absent", id);
        }
        Ok(())
    }
}

/// Local ids are integers; anything else cannot exist here.
fn local_rowid(id: &RecordId) -> Option<i64> {
    id.as_str().parse().ok()
}

/// Pick a timestamp strictly after `last`, normally `now`.
fn next_timestamp(now: DateTime<Utc>, last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match last {
        Some(last) if now <= last => last + Duration::microseconds(1),
        _ => now,
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<Record> {
    let id: i64 = row.get(0)?;
    let created_at_str: String = row.get(8)?;
    let created_at = parse_timestamp(&created_at_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            rusqlite::types::Type::Text,
            format!("record {id} has unparsable created_at {created_at_str:?}").into(),
        )
    })?;

    Ok(Record {
        id: RecordId::from(id),
        name: row.get(1)?,
        email: row.get(2)?,
        designation: row.get(3)?,
        description: row.get(4)?,
        latitude: row.get(5)?,
        longitude: row.get(6)?,
        image: row.get(7)?,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> LocalStore {
        LocalStore::open_in_memory().expect("failed to create test store")
    }

    fn new_record(name: &str) -> NewRecord {
        NewRecord {
            name: name.to_string(),
            email: "a@b.com".to_string(),
            designation: "Surveyor".to_string(),
            description: "Borewell depth".to_string(),
            latitude: 1.0,
            longitude: 2.0,
            image: None,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = create_test_store();
        let created = store.insert(&new_record("A")).unwrap();

        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.name, "A");
    }

    #[test]
    fn test_ids_unique_and_timestamps_monotonic() {
        let store = create_test_store();
        let records: Vec<Record> = (0..20)
            .map(|i| store.insert(&new_record(&format!("R{i}"))).unwrap())
            .collect();

        for pair in records.windows(2) {
            assert_ne!(pair[0].id, pair[1].id);
            assert!(pair[0].created_at < pair[1].created_at);
        }
    }

    #[test]
    fn test_next_timestamp_survives_clock_going_back() {
        let last = Utc::now();
        let earlier = last - Duration::seconds(30);
        assert_eq!(
            next_timestamp(earlier, Some(last)),
            last + Duration::microseconds(1)
        );
        assert_eq!(next_timestamp(last, None), last);
    }

    #[test]
    fn test_all_in_insertion_order() {
        let store = create_test_store();
        store.insert(&new_record("first")).unwrap();
        store.insert(&new_record("second")).unwrap();

        let names: Vec<String> = store.all().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["first", "second"]);
    }

    #[test]
    fn test_remove() {
        let store = create_test_store();
        let created = store.insert(&new_record("gone")).unwrap();

        assert!(store.remove(&created.id).unwrap());
        assert!(store.get(&created.id).unwrap().is_none());
        assert!(!store.remove(&created.id).unwrap());
    }

    #[test]
    fn test_non_numeric_id_is_absent() {
        let store = create_test_store();
        let id = RecordId::new("not-a-number");
        assert!(store.get(&id).unwrap().is_none());
        assert!(!store.remove(&id).unwrap());
    }

    #[test]
    fn test_image_round_trips() {
        let store = create_test_store();
        let mut record = new_record("with image");
        record.image = Some("abc123.jpg".to_string());

        let created = store.insert(&record).unwrap();
        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched.image.as_deref(), Some("abc123.jpg"));
    }

    #[test]
    fn test_count() {
        let store = create_test_store();
        assert_eq!(store.count().unwrap(), 0);
        store.insert(&new_record("A")).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_record_store_delete_twice() {
        let store = create_test_store();
        let created = store.create(&new_record("A"), None).await.unwrap();

        store.delete(&created.id).await.unwrap();
        store.delete(&created.id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    fn insert_raw(store: &LocalStore, created_at: &str) {
        store
            .conn()
            .unwrap()
            .execute(
                &format!(
                    "INSERT INTO {RECORDS_TABLE}
                        (name, email, designation, description, latitude, longitude, created_at)
                    VALUES ('raw', 'a@b.com', 'D', 'd', 0, 0, ?1)"
                ),
                [created_at],
            )
            .unwrap();
    }

    #[test]
    fn test_unparsable_created_at_is_an_error() {
        let store = create_test_store();
        store.insert(&new_record("good")).unwrap();
        insert_raw(&store, "garbage");

        let err = store.all().unwrap_err();
        assert!(matches!(err, Error::DatabaseQuery(_)));
        assert!(err.to_string().contains("garbage"));
    }

    #[test]
    fn test_offsetless_created_at_loads() {
        let store = create_test_store();
        insert_raw(&store, "2024-03-05 10:15:30.5");

        let records = store.all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].created_at,
            parse_timestamp("2024-03-05T10:15:30.5Z").unwrap()
        );

        // The next insert still lands after the stored timestamp.
        let next = store.insert(&new_record("next")).unwrap();
        assert!(next.created_at > records[0].created_at);
    }

    #[test]
    fn test_queries_use_records_table() {
        assert!(select_sql("").contains(&format!("FROM {RECORDS_TABLE}")));
    }

    #[test]
    fn test_open_file_based_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("records.db");

        let store = LocalStore::open(&db_path).unwrap();
        store.insert(&new_record("persisted")).unwrap();
        assert_eq!(store.path(), db_path);
        drop(store);

        let reopened = LocalStore::open(&db_path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }
}
