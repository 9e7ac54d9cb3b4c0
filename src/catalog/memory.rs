//! In-process catalog store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::store::{CatalogStore, Records, StoreError, StoreResult};
use crate::model::RecordId;

type RecordMap = BTreeMap<(String, RecordId), String>;

/// A mutex-guarded record map.
///
/// A transaction holds the lock for its whole duration and restores a
/// snapshot of the map when its closure fails.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<RecordMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records of every kind.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.records.lock().map_err(|_| StoreError::Poisoned)?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Transaction handle of a [`MemoryStore`].
pub struct MemoryTx<'a> {
    records: MutexGuard<'a, RecordMap>,
}

impl Records for MemoryTx<'_> {
    fn get_json(&self, kind: &str, id: RecordId) -> StoreResult<Option<String>> {
        Ok(self.records.get(&(kind.to_string(), id)).cloned())
    }

    fn put_json(&mut self, kind: &str, id: RecordId, json: String) -> StoreResult<()> {
        self.records.insert((kind.to_string(), id), json);
        Ok(())
    }

    fn delete_json(&mut self, kind: &str, id: RecordId) -> StoreResult<bool> {
        Ok(self.records.remove(&(kind.to_string(), id)).is_some())
    }

    fn list_json(&self, kind: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .records
            .iter()
            .filter(|((k, _), _)| k == kind)
            .map(|(_, json)| json.clone())
            .collect())
    }
}

impl CatalogStore for MemoryStore {
    type Tx<'a> = MemoryTx<'a>;

    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Tx<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        let snapshot = records.clone();
        let mut tx = MemoryTx { records };
        match f(&mut tx) {
            Ok(value) => Ok(value),
            Err(err) => {
                *tx.records = snapshot;
                Err(err)
            }
        }
    }
}
