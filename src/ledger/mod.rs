//! Table definition ledger.
//!
//! Every table owns an append-only chain of [`TableDefinition`]s linked
//! through `previous`, newest first. The table's `definition` field points
//! at the active entry. The ledger is the only writer of both.
//!
//! # Guarantees
//!
//! - Proposing the column set of the active definition is a no-op.
//! - Version numbers strictly decrease along the previous-chain.
//! - Creating a definition and repointing the table happen in one store
//!   transaction; a failure or abort leaves the prior definition active.
//! - Mutations on the same table are serialized in-process by a per-table
//!   lock and across processes by the store transaction.
//!
//! # Retraction policy
//!
//! Retracting a definition in the middle of the chain relinks its successor
//! to its predecessor, so the chain stays intact. Retracting the active
//! definition regresses the table to the highest remaining version.

mod abort;
pub mod chain;

pub use abort::Abort;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::{CatalogStore, Record, Records, StoreError};
use crate::config::LedgerSettings;
use crate::model::{new_record_id, Column, RecordId, Table, TableDefinition};
use chain::NextVersion;

/// Errors that can occur during ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error(
        "Version conflict on table '{table}': expected active definition {expected:?}, found {found:?}"
    )]
    VersionConflict {
        table: RecordId,
        expected: Option<RecordId>,
        found: Option<RecordId>,
    },

    #[error("Inconsistent definition chain for table '{table}': {reason}")]
    InconsistentChain { table: RecordId, reason: String },

    #[error("Table definition not found: {0}")]
    NotFound(RecordId),

    #[error("Ledger operation cancelled")]
    Cancelled,

    #[error("Ledger operation deadline exceeded")]
    DeadlineExceeded,

    #[error("Ledger lock poisoned for table '{0}'")]
    Poisoned(RecordId),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

fn inconsistent(table: RecordId, reason: impl Into<String>) -> LedgerError {
    let reason = reason.into();
    error!(table = %table, reason = %reason, "inconsistent definition chain");
    LedgerError::InconsistentChain { table, reason }
}

/// A request to make `columns` the active definition of `table`.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub table: RecordId,
    pub columns: BTreeSet<RecordId>,
    /// Optimistic fence: the active definition the caller based this
    /// proposal on. `None` skips the check.
    pub expected_active: Option<Option<RecordId>>,
    pub abort: Abort,
}

impl Proposal {
    /// A proposal with no fence and no abort.
    pub fn new(table: RecordId, columns: impl IntoIterator<Item = RecordId>) -> Self {
        Self {
            table,
            columns: columns.into_iter().collect(),
            expected_active: None,
            abort: Abort::none(),
        }
    }

    /// Fail with `VersionConflict` unless the table's active definition is
    /// still `active` when the proposal is applied.
    pub fn expecting(mut self, active: Option<RecordId>) -> Self {
        self.expected_active = Some(active);
        self
    }

    /// Abort the proposal when `abort` trips before commit.
    pub fn with_abort(mut self, abort: Abort) -> Self {
        self.abort = abort;
        self
    }
}

/// The table definition ledger over a catalog store.
pub struct Ledger<S: CatalogStore> {
    store: Arc<S>,
    settings: LedgerSettings,
    locks: DashMap<RecordId, Arc<Mutex<()>>>,
}

impl<S: CatalogStore> Ledger<S> {
    /// Create a ledger with default settings.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_settings(store, LedgerSettings::default())
    }

    pub fn with_settings(store: Arc<S>, settings: LedgerSettings) -> Self {
        Self {
            store,
            settings,
            locks: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Run `f` holding the in-process lock of `table`.
    ///
    /// The lock entry is dropped again once no other caller holds it.
    fn with_table_lock<T>(
        &self,
        table: RecordId,
        f: impl FnOnce() -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let lock = Arc::clone(&self.locks.entry(table).or_default());
        let result = match lock.lock() {
            Ok(_guard) => f(),
            Err(_) => Err(LedgerError::Poisoned(table)),
        };
        drop(lock);
        self.locks.remove_if(&table, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Make `columns` the active definition of `table`.
    ///
    /// Returns the new definition, or the current one unchanged when it
    /// already lists exactly these columns.
    ///
    /// # Errors
    ///
    /// - `LedgerError::Store` if the table or any column does not exist
    /// - `LedgerError::InconsistentChain` if the stored chain is broken, or
    ///   skewed under strict versioning
    pub fn propose(
        &self,
        table: RecordId,
        columns: impl IntoIterator<Item = RecordId>,
    ) -> LedgerResult<TableDefinition> {
        self.submit(Proposal::new(table, columns))
    }

    /// [`Ledger::propose`], aborting when `abort` trips before commit.
    pub fn propose_with(
        &self,
        table: RecordId,
        columns: impl IntoIterator<Item = RecordId>,
        abort: &Abort,
    ) -> LedgerResult<TableDefinition> {
        self.submit(Proposal::new(table, columns).with_abort(abort.clone()))
    }

    /// Apply a [`Proposal`].
    ///
    /// # Errors
    ///
    /// As [`Ledger::propose`], plus `VersionConflict` when the proposal's
    /// fence no longer matches, and `Cancelled` or `DeadlineExceeded` when
    /// its abort trips. Nothing is written in any error case.
    #[instrument(skip_all, fields(table = %proposal.table, columns = proposal.columns.len()))]
    pub fn submit(&self, proposal: Proposal) -> LedgerResult<TableDefinition> {
        let Proposal {
            table: table_id,
            columns,
            expected_active,
            abort,
        } = proposal;

        self.with_table_lock(table_id, || {
            abort.check()?;
            self.store
                .with_transaction(|tx| self.apply(tx, table_id, columns, expected_active, &abort))
        })
    }

    fn apply<T: Records>(
        &self,
        tx: &mut T,
        table_id: RecordId,
        columns: BTreeSet<RecordId>,
        expected_active: Option<Option<RecordId>>,
        abort: &Abort,
    ) -> LedgerResult<TableDefinition> {
        let mut table: Table = tx.require(table_id)?;

        if let Some(expected) = expected_active {
            if expected != table.definition {
                return Err(LedgerError::VersionConflict {
                    table: table_id,
                    expected,
                    found: table.definition,
                });
            }
        }

        for &column in &columns {
            if !tx.exists::<Column>(column)? {
                return Err(StoreError::MissingReference {
                    kind: TableDefinition::KIND,
                    target: Column::KIND,
                    id: column,
                }
                .into());
            }
        }

        let active = match table.definition {
            Some(id) => Some(tx.get::<TableDefinition>(id)?.ok_or_else(|| {
                inconsistent(table_id, format!("active definition {} is missing", id))
            })?),
            None => None,
        };

        if let Some(active) = active {
            if active.has_columns(&columns) {
                debug!(version = active.version_num, "column set unchanged; nothing to do");
                return Ok(active);
            }
        }

        let existing: Vec<TableDefinition> = tx.find(|d: &TableDefinition| d.table == table_id)?;

        if self.settings.verify_chain_on_propose {
            chain::walk(&existing, table.definition)
                .map_err(|reason| inconsistent(table_id, reason))?;
        }

        let version_num = match chain::next_version(&existing) {
            NextVersion::Next(v) => v,
            skewed @ NextVersion::Skewed { count, latest } => {
                if self.settings.strict_versioning {
                    return Err(inconsistent(
                        table_id,
                        format!(
                            "{} definitions stored but latest version is {}",
                            count, latest
                        ),
                    ));
                }
                warn!(count, latest, "definition count exceeds latest version; skipping ahead");
                skewed.resolve()
            }
        };

        let definition = TableDefinition {
            id: new_record_id(),
            table: table_id,
            created_at: Utc::now(),
            columns,
            version_num,
            previous: table.definition,
        };
        tx.create(&definition)?;

        table.definition = Some(definition.id);
        table.lifecycle.touch();
        tx.update(&table)?;

        abort.check()?;
        info!(version = version_num, definition = %definition.id, "table definition proposed");
        Ok(definition)
    }

    /// Delete a definition, keeping the table's active pointer and the
    /// previous-chain consistent.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotFound` if the definition does not exist.
    pub fn retract(&self, definition: RecordId) -> LedgerResult<()> {
        self.retract_with(definition, &Abort::none())
    }

    /// [`Ledger::retract`], rolled back when `abort` trips before commit.
    #[instrument(skip(self, abort))]
    pub fn retract_with(&self, definition: RecordId, abort: &Abort) -> LedgerResult<()> {
        let table_id = self
            .store
            .get::<TableDefinition>(definition)?
            .ok_or(LedgerError::NotFound(definition))?
            .table;

        self.with_table_lock(table_id, || {
            abort.check()?;
            self.store.with_transaction(|tx| Self::unlink(tx, table_id, definition, abort))
        })
    }

    fn unlink<T: Records>(
        tx: &mut T,
        table_id: RecordId,
        definition: RecordId,
        abort: &Abort,
    ) -> LedgerResult<()> {
        let retracted: TableDefinition = tx
            .get(definition)?
            .ok_or(LedgerError::NotFound(definition))?;
        let mut table: Table = tx.require(table_id)?;
        let siblings: Vec<TableDefinition> =
            tx.find(|d: &TableDefinition| d.table == table_id && d.id != definition)?;

        if table.definition == Some(definition) {
            let regressed = chain::latest_excluding(&siblings, definition).map(|d| d.id);
            debug!(regressed_to = ?regressed, "retracting active definition");
            table.definition = regressed;
            table.lifecycle.touch();
            tx.update(&table)?;
        }

        for mut successor in siblings
            .into_iter()
            .filter(|d| d.previous == Some(definition))
        {
            successor.previous = retracted.previous;
            tx.update(&successor)?;
        }

        tx.delete::<TableDefinition>(definition)?;

        abort.check()?;
        info!(version = retracted.version_num, "table definition retracted");
        Ok(())
    }

    /// The table's active definition, if any.
    pub fn active_definition(&self, table: RecordId) -> LedgerResult<Option<TableDefinition>> {
        self.store.with_transaction(|tx| {
            let table: Table = tx.require(table)?;
            match table.definition {
                Some(id) => match tx.get::<TableDefinition>(id)? {
                    Some(def) => Ok(Some(def)),
                    None => Err(inconsistent(
                        table.id,
                        format!("active definition {} is missing", id),
                    )),
                },
                None => Ok(None),
            }
        })
    }

    /// Every stored definition of `table`, newest first.
    pub fn history(&self, table: RecordId) -> LedgerResult<Vec<TableDefinition>> {
        let mut definitions: Vec<TableDefinition> =
            self.store.find(|d: &TableDefinition| d.table == table)?;
        definitions.sort_by(|a, b| b.version_num.cmp(&a.version_num));
        Ok(definitions)
    }

    /// Walk the previous-chain from the active definition and check it.
    ///
    /// Returns the chain newest first.
    pub fn verify_chain(&self, table: RecordId) -> LedgerResult<Vec<TableDefinition>> {
        self.store.with_transaction(|tx| {
            let table: Table = tx.require(table)?;
            let existing: Vec<TableDefinition> =
                tx.find(|d: &TableDefinition| d.table == table.id)?;
            chain::walk(&existing, table.definition).map_err(|reason| inconsistent(table.id, reason))
        })
    }
}
