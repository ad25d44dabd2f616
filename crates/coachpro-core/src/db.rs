//! SQLite-backed store. Every domain module adds its operations through an
//! `impl Store` block of its own.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, Connection};

use crate::error::{CoachError, Result};
use crate::schema::{MIGRATIONS, SCHEMA_VERSION, TABLES};

pub struct Store {
    pub(crate) conn: Connection,
}

impl Store {
    /// Open (or create) the database at `path` and bring the schema up to date.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::io::ensure_dir(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        let mut store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn schema_version(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    /// Apply pending migrations in order, one transaction per step.
    pub fn migrate(&mut self) -> Result<()> {
        let current = self.schema_version()?;
        if current > SCHEMA_VERSION {
            return Err(CoachError::UnsupportedSchemaVersion {
                found: current,
                supported: SCHEMA_VERSION,
            });
        }

        for (idx, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
            let version = idx as i64 + 1;
            let tx = self.conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", version)?;
            tx.commit()?;
            tracing::debug!(version, "applied schema migration");
        }

        self.conn.execute(
            "INSERT INTO options (name, value) VALUES ('coachpro_lms_version', ?1)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value",
            params![env!("CARGO_PKG_VERSION")],
        )?;
        Ok(())
    }

    /// Drop every table and option the schema owns and reset the schema version.
    pub fn purge(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for table in TABLES {
            tx.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
        }
        tx.pragma_update(None, "user_version", 0)?;
        tx.commit()?;
        Ok(())
    }

    /// Count rows in one of the schema's tables.
    pub fn count_rows(&self, table: &str) -> Result<i64> {
        if !TABLES.contains(&table) {
            return Err(CoachError::InvalidInput(format!("unknown table: {table}")));
        }
        Ok(self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?)
    }
}

/// Current time truncated to whole seconds, the precision rows are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Map a unique-constraint violation to a domain error, pass anything else through.
pub(crate) fn on_unique_violation(err: rusqlite::Error, conflict: CoachError) -> CoachError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            conflict
        }
        _ => CoachError::Db(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn fresh_store_is_at_current_version() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn migrate_is_idempotent() {
        let mut store = Store::open_in_memory().unwrap();
        store.migrate().unwrap();
        store.migrate().unwrap();
        assert_eq!(store.count_rows("enrollments").unwrap(), 0);
    }

    #[test]
    fn open_on_disk_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".coachpro/coachpro.db");
        let store = Store::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
                .unwrap();
        }
        assert!(matches!(
            Store::open(&path),
            Err(CoachError::UnsupportedSchemaVersion { .. })
        ));
    }

    #[test]
    fn purge_drops_all_tables() {
        let mut store = Store::open_in_memory().unwrap();
        store.purge().unwrap();
        assert_eq!(store.schema_version().unwrap(), 0);
        let remaining: i64 = store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn count_rows_rejects_unknown_table() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.count_rows("sqlite_master").is_err());
    }
}
