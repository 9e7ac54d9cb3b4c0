//! Catalog store: persistence of catalog records.
//!
//! The rest of the crate reaches records only through [`CatalogStore`],
//! which is passed in explicitly. Two backends are provided:
//!
//! - [`MemoryStore`] - a mutex-guarded map, for tests and embedding
//! - [`SqliteStore`] - a SQLite key/value table of JSON records

mod memory;
mod registry;
mod sqlite;
mod store;

pub use memory::{MemoryStore, MemoryTx};
pub use registry::Catalog;
pub use sqlite::{SqliteStore, SqliteTx};
pub use store::{CatalogStore, Record, Records, StoreError, StoreResult};

use crate::model::{Column, DataSet, Maintainer, RecordId, Schema, Table, TableDefinition};

impl Record for Maintainer {
    const KIND: &'static str = "maintainer";

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Record for DataSet {
    const KIND: &'static str = "dataset";

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Record for Schema {
    const KIND: &'static str = "schema";

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Record for Table {
    const KIND: &'static str = "table";

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Record for Column {
    const KIND: &'static str = "column";

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Record for TableDefinition {
    const KIND: &'static str = "table_definition";

    fn id(&self) -> RecordId {
        self.id
    }
}
