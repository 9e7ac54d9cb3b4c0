//! SQLite-backed catalog store.
//!
//! Records live in a single key/value table; the value is the record's JSON
//! form. The store is stored in `~/.slicer/catalog.db` unless a path is
//! configured.
//!
//! # Layout
//!
//! ```text
//! records(kind TEXT, id TEXT, value TEXT)   PRIMARY KEY (kind, id)
//! meta(key TEXT, value TEXT)                'version' -> STORE_VERSION
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, warn};

use super::store::{CatalogStore, Records, StoreError, StoreResult};
use crate::config::{StoreBackend, StoreSettings};
use crate::model::RecordId;

/// Current store schema version. Bump this when the record layout changes.
const STORE_VERSION: i32 = 1;

/// SQLite catalog store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store database at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        debug!(path = %path.display(), "opening catalog store");
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open the store described by `settings`.
    ///
    /// A `memory` backend opens an in-memory SQLite database.
    pub fn from_settings(settings: &StoreSettings) -> StoreResult<Self> {
        match settings.backend {
            StoreBackend::Memory => Self::open_in_memory(),
            StoreBackend::Sqlite => match settings.resolved_path() {
                Some(path) => Self::open(path),
                None => Self::open(Self::default_path()?),
            },
        }
    }

    /// Default store location.
    pub fn default_path() -> StoreResult<PathBuf> {
        let base = dirs::home_dir().ok_or(StoreError::NoStoreDir)?;
        Ok(base.join(".slicer").join("catalog.db"))
    }

    /// Create tables if needed and check the layout version.
    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS records (
                kind TEXT NOT NULL,
                id TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (kind, id)
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        let stored_version: Option<i32> = conn
            .query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
                let s: String = row.get(0)?;
                Ok(s.parse().unwrap_or(0))
            })
            .optional()?;

        // A store written under another layout is refused, never migrated.
        match stored_version {
            Some(v) if v == STORE_VERSION => {}
            Some(v) => {
                warn!(found = v, expected = STORE_VERSION, "catalog store version mismatch");
                return Err(StoreError::VersionMismatch {
                    found: v,
                    expected: STORE_VERSION,
                });
            }
            None => {
                conn.execute(
                    "INSERT OR REPLACE INTO meta (key, value) VALUES ('version', ?)",
                    params![STORE_VERSION.to_string()],
                )?;
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Number of stored records of every kind.
    pub fn len(&self) -> StoreResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Transaction handle of a [`SqliteStore`].
pub struct SqliteTx<'a> {
    tx: rusqlite::Transaction<'a>,
}

impl Records for SqliteTx<'_> {
    fn get_json(&self, kind: &str, id: RecordId) -> StoreResult<Option<String>> {
        let json = self
            .tx
            .query_row(
                "SELECT value FROM records WHERE kind = ? AND id = ?",
                params![kind, id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(json)
    }

    fn put_json(&mut self, kind: &str, id: RecordId, json: String) -> StoreResult<()> {
        self.tx.execute(
            "INSERT OR REPLACE INTO records (kind, id, value) VALUES (?, ?, ?)",
            params![kind, id.to_string(), json],
        )?;
        Ok(())
    }

    fn delete_json(&mut self, kind: &str, id: RecordId) -> StoreResult<bool> {
        let rows = self.tx.execute(
            "DELETE FROM records WHERE kind = ? AND id = ?",
            params![kind, id.to_string()],
        )?;
        Ok(rows > 0)
    }

    fn list_json(&self, kind: &str) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .tx
            .prepare("SELECT value FROM records WHERE kind = ? ORDER BY id")?;
        let values = stmt
            .query_map(params![kind], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(values)
    }
}

impl CatalogStore for SqliteStore {
    type Tx<'a> = SqliteTx<'a>;

    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Tx<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let mut handle = SqliteTx { tx };

        match f(&mut handle) {
            Ok(value) => {
                handle.tx.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = handle.tx.rollback() {
                    warn!(error = %rollback_err, "catalog store rollback failed");
                }
                Err(err)
            }
        }
    }
}
