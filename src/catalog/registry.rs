//! Foreign-key aware access to catalog entities.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::store::{CatalogStore, Record, Records, StoreError, StoreResult};
use crate::model::{Column, DataSet, Maintainer, RecordId, Schema, Table, TableRef};
use crate::slice::Slice;

/// Registers catalog entities, checking that every reference they carry
/// points at an existing record.
pub struct Catalog<S: CatalogStore> {
    store: Arc<S>,
}

impl<S: CatalogStore> Clone for Catalog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

fn check_reference<T: Records, R: Record>(
    tx: &T,
    kind: &'static str,
    id: RecordId,
) -> StoreResult<()> {
    if tx.exists::<R>(id)? {
        Ok(())
    } else {
        Err(StoreError::MissingReference {
            kind,
            target: R::KIND,
            id,
        })
    }
}

impl<S: CatalogStore> Catalog<S> {
    /// Create a catalog over a shared store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying store, for callers sharing it with a [`crate::ledger::Ledger`].
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Register a maintainer.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the id is taken.
    pub fn add_maintainer(&self, maintainer: &Maintainer) -> StoreResult<()> {
        self.store.create(maintainer)
    }

    /// Register a dataset.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::MissingReference` if its maintainer does not exist.
    #[instrument(skip_all, fields(dataset = %dataset.info.name))]
    pub fn add_dataset(&self, dataset: &DataSet) -> StoreResult<()> {
        self.store.with_transaction(|tx| {
            check_reference::<_, Maintainer>(&*tx, DataSet::KIND, dataset.stewardship.maintainer)?;
            tx.create(dataset)
        })
    }

    /// Register a schema.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::MissingReference` if its dataset or maintainer
    /// does not exist.
    #[instrument(skip_all, fields(schema = %schema.info.name))]
    pub fn add_schema(&self, schema: &Schema) -> StoreResult<()> {
        self.store.with_transaction(|tx| {
            check_reference::<_, DataSet>(&*tx, Schema::KIND, schema.dataset)?;
            check_reference::<_, Maintainer>(&*tx, Schema::KIND, schema.stewardship.maintainer)?;
            tx.create(schema)
        })
    }

    /// Register a table. New tables never carry a definition; the ledger sets it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::MissingReference` if its schema or maintainer
    /// does not exist.
    #[instrument(skip_all, fields(table = %table.info.name))]
    pub fn add_table(&self, table: &Table) -> StoreResult<()> {
        self.store.with_transaction(|tx| {
            check_reference::<_, Schema>(&*tx, Table::KIND, table.schema)?;
            check_reference::<_, Maintainer>(&*tx, Table::KIND, table.stewardship.maintainer)?;
            let mut table = table.clone();
            table.definition = None;
            tx.create(&table)
        })
    }

    /// Register a column. Tables pick columns up through ledger definitions.
    pub fn add_column(&self, column: &Column) -> StoreResult<()> {
        self.store.create(column)
    }

    /// Register a slice.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::MissingReference` if its main table or any joined
    /// table does not exist.
    #[instrument(skip_all, fields(slice = %slice.name))]
    pub fn add_slice(&self, slice: &Slice) -> StoreResult<()> {
        self.store.with_transaction(|tx| {
            for table in slice.tables() {
                check_reference::<_, Table>(&*tx, Slice::KIND, table.id)?;
            }
            tx.create(slice)
        })
    }

    /// Load a slice; a missing id is `StoreError::NotFound`.
    pub fn slice(&self, id: RecordId) -> StoreResult<Slice> {
        self.store.require(id)
    }

    /// Slices whose main table is `table`.
    pub fn slices_on(&self, table: RecordId) -> StoreResult<Vec<Slice>> {
        self.store.find(|s: &Slice| s.main_table.id == table)
    }

    /// Load a dataset; a missing id is `StoreError::NotFound`.
    pub fn dataset(&self, id: RecordId) -> StoreResult<DataSet> {
        self.store.require(id)
    }

    pub fn schema(&self, id: RecordId) -> StoreResult<Schema> {
        self.store.require(id)
    }

    pub fn table(&self, id: RecordId) -> StoreResult<Table> {
        self.store.require(id)
    }

    pub fn column(&self, id: RecordId) -> StoreResult<Column> {
        self.store.require(id)
    }

    /// Schemas belonging to `dataset`.
    pub fn schemas_of(&self, dataset: RecordId) -> StoreResult<Vec<Schema>> {
        self.store.find(|s: &Schema| s.dataset == dataset)
    }

    /// Tables belonging to `schema`.
    pub fn tables_of(&self, schema: RecordId) -> StoreResult<Vec<Table>> {
        self.store.find(|t: &Table| t.schema == schema)
    }

    /// `dataset.schema.table`
    pub fn qualified_name(&self, table: RecordId) -> StoreResult<String> {
        self.store.with_transaction(|tx| {
            let table: Table = tx.require(table)?;
            let schema: Schema = tx.require(table.schema)?;
            let dataset: DataSet = tx.require(schema.dataset)?;
            Ok(format!(
                "{}.{}.{}",
                dataset.info.name, schema.info.name, table.info.name
            ))
        })
    }

    /// Handle for use in element, join and slice declarations.
    pub fn table_ref(&self, table: RecordId) -> StoreResult<TableRef> {
        let table: Table = self.store.require(table)?;
        Ok(TableRef::new(table.id, table.to_string()))
    }

    /// Clear the active flag of a dataset. Records are never deleted.
    pub fn deactivate_dataset(&self, id: RecordId) -> StoreResult<()> {
        self.store.with_transaction(|tx| {
            let mut dataset: DataSet = tx.require(id)?;
            dataset.lifecycle.deactivate();
            tx.update(&dataset)
        })
    }

    pub fn deactivate_schema(&self, id: RecordId) -> StoreResult<()> {
        self.store.with_transaction(|tx| {
            let mut schema: Schema = tx.require(id)?;
            schema.lifecycle.deactivate();
            tx.update(&schema)
        })
    }

    pub fn deactivate_table(&self, id: RecordId) -> StoreResult<()> {
        debug!(table = %id, "deactivating table");
        self.store.with_transaction(|tx| {
            let mut table: Table = tx.require(id)?;
            table.lifecycle.deactivate();
            tx.update(&table)
        })
    }

    pub fn deactivate_column(&self, id: RecordId) -> StoreResult<()> {
        self.store.with_transaction(|tx| {
            let mut column: Column = tx.require(id)?;
            column.lifecycle.deactivate();
            tx.update(&column)
        })
    }
}
