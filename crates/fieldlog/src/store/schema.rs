//! `SQLite` schema and migrations for the local record store.
//!
//! The schema version lives in `PRAGMA user_version`. Each entry of
//! [`MIGRATIONS`] upgrades the database by one version and runs inside a
//! transaction together with the version bump.

use rusqlite::Connection;
use tracing::info;

use crate::error::{Error, Result};

/// Table holding records, matching the hosted table's name.
pub const RECORDS_TABLE: &str = "user_details";

/// Version 1: the records table.
const V1_RECORDS: &str = r"
CREATE TABLE IF NOT EXISTS user_details (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    designation TEXT NOT NULL,
    description TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    image TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_user_details_created_at ON user_details(created_at);
";

/// Ordered migrations; index `n` upgrades from version `n` to `n + 1`.
pub const MIGRATIONS: &[&str] = &[V1_RECORDS];

/// The schema version this build expects.
#[must_use]
pub fn current_version() -> u32 {
    u32::try_from(MIGRATIONS.len()).unwrap_or(u32::MAX)
}

/// Read the schema version of an open database.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Bring the database schema up to [`current_version`].
///
/// # Errors
///
/// Returns an error if the database is newer than this build or a migration
/// fails.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    let found = schema_version(conn)?;
    let target = current_version();

    if found > target {
        return Err(Error::DatabaseMigration {
            message: format!("database schema v{found} is newer than supported v{target}"),
        });
    }

    for (version, sql) in (found..target).zip(&MIGRATIONS[found as usize..]) {
        let next = version + 1;
        let tx = conn.transaction()?;
        tx.execute_batch(sql).map_err(|e| Error::DatabaseMigration {
            message: format!("upgrade to v{next} failed: {e}"),
        })?;
        tx.pragma_update(None, "user_version", next)?;
        tx.commit()?;
        info!("Migrated local store to schema v{}", next);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    #[test]
    fn test_migrate_fresh_database() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);

        migrate(&mut conn).unwrap();

        assert!(table_exists(&conn, RECORDS_TABLE));
        assert_eq!(schema_version(&conn).unwrap(), current_version());
    }

    #[test]
    fn test_migrate_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), current_version());
    }

    #[test]
    fn test_migrate_rejects_newer_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", current_version() + 1)
            .unwrap();

        let err = migrate(&mut conn).unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_created_at_index() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name='idx_user_details_created_at'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
