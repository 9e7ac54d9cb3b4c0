//! Store traits: typed records over a JSON key/value layer.
//!
//! Backends only implement the four `*_json` primitives of [`Records`] and
//! the transaction wrapper of [`CatalogStore`]; typed access is provided.

use serde::{de::DeserializeOwned, Serialize};

use crate::model::RecordId;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to determine store directory")]
    NoStoreDir,

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: RecordId },

    #[error("{kind} '{id}' already exists")]
    AlreadyExists { kind: &'static str, id: RecordId },

    #[error("{kind} references missing {target} '{id}'")]
    MissingReference {
        kind: &'static str,
        target: &'static str,
        id: RecordId,
    },

    #[error("Catalog store layout version {found} does not match expected {expected}")]
    VersionMismatch { found: i32, expected: i32 },

    #[error("Store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A catalog entity that can be persisted.
pub trait Record: Serialize + DeserializeOwned {
    /// Namespace of this record type in the store.
    const KIND: &'static str;

    fn id(&self) -> RecordId;
}

/// Read/write access to stored records.
pub trait Records {
    fn get_json(&self, kind: &str, id: RecordId) -> StoreResult<Option<String>>;

    fn put_json(&mut self, kind: &str, id: RecordId, json: String) -> StoreResult<()>;

    /// Returns true if a record was deleted.
    fn delete_json(&mut self, kind: &str, id: RecordId) -> StoreResult<bool>;

    fn list_json(&self, kind: &str) -> StoreResult<Vec<String>>;

    fn get<R: Record>(&self, id: RecordId) -> StoreResult<Option<R>> {
        match self.get_json(R::KIND, id)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Like [`Records::get`], but a missing record is an error.
    fn require<R: Record>(&self, id: RecordId) -> StoreResult<R> {
        self.get(id)?
            .ok_or(StoreError::NotFound { kind: R::KIND, id })
    }

    fn exists<R: Record>(&self, id: RecordId) -> StoreResult<bool> {
        Ok(self.get_json(R::KIND, id)?.is_some())
    }

    fn create<R: Record>(&mut self, record: &R) -> StoreResult<()> {
        let id = record.id();
        if self.exists::<R>(id)? {
            return Err(StoreError::AlreadyExists { kind: R::KIND, id });
        }
        self.put_json(R::KIND, id, serde_json::to_string(record)?)
    }

    fn update<R: Record>(&mut self, record: &R) -> StoreResult<()> {
        let id = record.id();
        if !self.exists::<R>(id)? {
            return Err(StoreError::NotFound { kind: R::KIND, id });
        }
        self.put_json(R::KIND, id, serde_json::to_string(record)?)
    }

    fn delete<R: Record>(&mut self, id: RecordId) -> StoreResult<bool> {
        self.delete_json(R::KIND, id)
    }

    fn find<R: Record, P: Fn(&R) -> bool>(&self, predicate: P) -> StoreResult<Vec<R>> {
        let mut found = Vec::new();
        for json in self.list_json(R::KIND)? {
            let record: R = serde_json::from_str(&json)?;
            if predicate(&record) {
                found.push(record);
            }
        }
        Ok(found)
    }
}

/// A shared catalog store.
///
/// All writes that must land together go through
/// [`CatalogStore::with_transaction`]: if the closure returns `Err`, every
/// write it performed is discarded.
pub trait CatalogStore: Send + Sync {
    type Tx<'a>: Records
    where
        Self: 'a;

    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Tx<'_>) -> Result<T, E>,
        E: From<StoreError>;

    fn get<R: Record>(&self, id: RecordId) -> StoreResult<Option<R>> {
        self.with_transaction(|tx| tx.get(id))
    }

    fn require<R: Record>(&self, id: RecordId) -> StoreResult<R> {
        self.with_transaction(|tx| tx.require(id))
    }

    fn create<R: Record>(&self, record: &R) -> StoreResult<()> {
        self.with_transaction(|tx| tx.create(record))
    }

    fn update<R: Record>(&self, record: &R) -> StoreResult<()> {
        self.with_transaction(|tx| tx.update(record))
    }

    fn delete<R: Record>(&self, id: RecordId) -> StoreResult<bool> {
        self.with_transaction(|tx| tx.delete::<R>(id))
    }

    fn find<R: Record, P: Fn(&R) -> bool>(&self, predicate: P) -> StoreResult<Vec<R>> {
        self.with_transaction(|tx| tx.find(predicate))
    }
}
