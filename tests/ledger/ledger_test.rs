//! Table definition ledger tests.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use slicer::catalog::{Catalog, CatalogStore, MemoryStore, SqliteStore, StoreError};
use slicer::config::LedgerSettings;
use slicer::ledger::{Abort, Ledger, LedgerError, Proposal};
use slicer::model::{
    new_record_id, Column, DataSet, Maintainer, RecordId, Schema, Table, TableDefinition, Vendor,
};

struct Setup<S: CatalogStore> {
    store: Arc<S>,
    table: RecordId,
    columns: Vec<RecordId>,
}

fn setup<S: CatalogStore>(store: S) -> Setup<S> {
    let store = Arc::new(store);
    let catalog = Catalog::new(Arc::clone(&store));

    let maintainer = Maintainer::new("data-eng");
    catalog.add_maintainer(&maintainer).unwrap();
    let dataset = DataSet::new("warehouse", Vendor::Postgres, "db", maintainer.id);
    catalog.add_dataset(&dataset).unwrap();
    let schema = Schema::new("sales", dataset.id, maintainer.id);
    catalog.add_schema(&schema).unwrap();
    let table = Table::new("orders", &schema, maintainer.id);
    catalog.add_table(&table).unwrap();

    let columns = ["id", "cust_id", "amount", "status", "created_at"]
        .into_iter()
        .map(|name| {
            let column = Column::new(name, "text");
            catalog.add_column(&column).unwrap();
            column.id
        })
        .collect();

    Setup {
        store,
        table: table.id,
        columns,
    }
}

/// Wraps a store and cancels an [`Abort`] from inside a chosen transaction,
/// after the ledger's own pre-checks have passed.
struct CancellingStore<S> {
    inner: S,
    armed: Mutex<Option<(usize, Abort)>>,
}

impl<S> CancellingStore<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            armed: Mutex::new(None),
        }
    }

    /// Cancel `abort` inside the `nth` transaction opened from now on.
    fn cancel_in(&self, nth: usize, abort: &Abort) {
        *self.armed.lock().unwrap() = Some((nth, abort.clone()));
    }
}

impl<S: CatalogStore + 'static> CatalogStore for CancellingStore<S> {
    type Tx<'a>
        = S::Tx<'a>
    where
        Self: 'a;

    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Tx<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let trip = {
            let mut armed = self.armed.lock().unwrap();
            match armed.as_mut() {
                Some((remaining, _)) if *remaining > 1 => {
                    *remaining -= 1;
                    None
                }
                Some(_) => armed.take().map(|(_, abort)| abort),
                None => None,
            }
        };
        self.inner.with_transaction(|tx| {
            if let Some(abort) = &trip {
                abort.cancel();
            }
            f(tx)
        })
    }
}

fn active_id<S: CatalogStore>(setup: &Setup<S>) -> Option<RecordId> {
    setup.store.require::<Table>(setup.table).unwrap().definition
}

#[test]
fn test_first_proposal_is_version_one() {
    let s = setup(MemoryStore::new());
    let ledger = Ledger::new(Arc::clone(&s.store));

    let def = ledger.propose(s.table, s.columns[..2].to_vec()).unwrap();
    assert_eq!(def.version_num, 1);
    assert_eq!(def.previous, None);
    assert_eq!(active_id(&s), Some(def.id));
}

#[test]
fn test_same_column_set_is_a_no_op() {
    let s = setup(MemoryStore::new());
    let ledger = Ledger::new(Arc::clone(&s.store));

    let first = ledger.propose(s.table, [s.columns[0], s.columns[1]]).unwrap();
    let again = ledger.propose(s.table, [s.columns[1], s.columns[0]]).unwrap();

    assert_eq!(again, first);
    assert_eq!(ledger.history(s.table).unwrap().len(), 1);
}

#[test]
fn test_versions_increase_along_the_chain() {
    let s = setup(MemoryStore::new());
    let ledger = Ledger::new(Arc::clone(&s.store));

    let mut previous = None;
    for n in 1..=s.columns.len() {
        let def = ledger.propose(s.table, s.columns[..n].to_vec()).unwrap();
        assert_eq!(def.version_num, n as u32);
        assert_eq!(def.previous, previous);
        previous = Some(def.id);
    }

    let chain = ledger.verify_chain(s.table).unwrap();
    let versions: Vec<u32> = chain.iter().map(|d| d.version_num).collect();
    assert_eq!(versions, vec![5, 4, 3, 2, 1]);
    assert_eq!(ledger.history(s.table).unwrap(), chain);
}

#[test]
fn test_retracting_active_regresses_to_previous() {
    let s = setup(MemoryStore::new());
    let ledger = Ledger::new(Arc::clone(&s.store));

    let v1 = ledger.propose(s.table, [s.columns[0]]).unwrap();
    let v2 = ledger.propose(s.table, [s.columns[1]]).unwrap();
    let v3 = ledger.propose(s.table, [s.columns[2]]).unwrap();
    assert_eq!(active_id(&s), Some(v3.id));

    ledger.retract(v3.id).unwrap();
    assert_eq!(active_id(&s), Some(v2.id));

    ledger.retract(v2.id).unwrap();
    assert_eq!(active_id(&s), Some(v1.id));
    assert_eq!(ledger.verify_chain(s.table).unwrap(), vec![v1.clone()]);

    ledger.retract(v1.id).unwrap();
    assert_eq!(active_id(&s), None);
    assert!(ledger.active_definition(s.table).unwrap().is_none());
}

#[test]
fn test_retracting_middle_relinks_chain() {
    let s = setup(MemoryStore::new());
    let ledger = Ledger::new(Arc::clone(&s.store));

    let v1 = ledger.propose(s.table, [s.columns[0]]).unwrap();
    let v2 = ledger.propose(s.table, [s.columns[1]]).unwrap();
    let v3 = ledger.propose(s.table, [s.columns[2]]).unwrap();

    ledger.retract(v2.id).unwrap();

    let active = ledger.active_definition(s.table).unwrap().unwrap();
    assert_eq!(active.id, v3.id);
    assert_eq!(active.previous, Some(v1.id));

    let chain: Vec<RecordId> = ledger
        .verify_chain(s.table)
        .unwrap()
        .iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(chain, vec![v3.id, v1.id]);

    // Two definitions remain with latest version 3; the next one is 4.
    let v4 = ledger.propose(s.table, [s.columns[3]]).unwrap();
    assert_eq!(v4.version_num, 4);
    assert_eq!(v4.previous, Some(v3.id));
}

#[test]
fn test_retract_unknown_definition() {
    let s = setup(MemoryStore::new());
    let ledger = Ledger::new(Arc::clone(&s.store));
    let missing = new_record_id();
    assert!(matches!(
        ledger.retract(missing),
        Err(LedgerError::NotFound(id)) if id == missing
    ));
}

#[test]
fn test_propose_on_unknown_table() {
    let s = setup(MemoryStore::new());
    let ledger = Ledger::new(Arc::clone(&s.store));
    assert!(matches!(
        ledger.propose(new_record_id(), s.columns.clone()),
        Err(LedgerError::Store(_))
    ));
}

#[test]
fn test_stale_expectation_is_a_version_conflict() {
    let s = setup(MemoryStore::new());
    let ledger = Ledger::new(Arc::clone(&s.store));

    let v1 = ledger.propose(s.table, [s.columns[0]]).unwrap();
    let v2 = ledger
        .submit(Proposal::new(s.table, [s.columns[1]]).expecting(Some(v1.id)))
        .unwrap();

    let err = ledger
        .submit(Proposal::new(s.table, [s.columns[2]]).expecting(Some(v1.id)))
        .unwrap_err();
    match err {
        LedgerError::VersionConflict {
            expected, found, ..
        } => {
            assert_eq!(expected, Some(v1.id));
            assert_eq!(found, Some(v2.id));
        }
        other => panic!("expected version conflict, got {:?}", other),
    }
    assert_eq!(active_id(&s), Some(v2.id));
}

#[test]
fn test_cancelled_proposal_changes_nothing() {
    let s = setup(MemoryStore::new());
    let ledger = Ledger::new(Arc::clone(&s.store));
    let v1 = ledger.propose(s.table, [s.columns[0]]).unwrap();

    let abort = Abort::none();
    abort.cancel();
    assert!(matches!(
        ledger.propose_with(s.table, [s.columns[1]], &abort),
        Err(LedgerError::Cancelled)
    ));
    assert!(matches!(
        ledger.retract_with(v1.id, &abort),
        Err(LedgerError::Cancelled)
    ));

    assert_eq!(active_id(&s), Some(v1.id));
    assert_eq!(ledger.history(s.table).unwrap().len(), 1);
}

#[test]
fn test_elapsed_deadline_changes_nothing() {
    let s = setup(MemoryStore::new());
    let ledger = Ledger::new(Arc::clone(&s.store));

    let abort = Abort::with_timeout(Duration::ZERO);
    assert!(matches!(
        ledger.propose_with(s.table, [s.columns[0]], &abort),
        Err(LedgerError::DeadlineExceeded)
    ));
    assert_eq!(active_id(&s), None);
}

#[test]
fn test_concurrent_proposals_serialize() {
    let s = setup(MemoryStore::new());
    let ledger = Arc::new(Ledger::new(Arc::clone(&s.store)));

    std::thread::scope(|scope| {
        for n in 1..=s.columns.len() {
            let ledger = Arc::clone(&ledger);
            let columns = s.columns[..n].to_vec();
            let table = s.table;
            scope.spawn(move || ledger.propose(table, columns).unwrap());
        }
    });

    let chain = ledger.verify_chain(s.table).unwrap();
    let mut versions: Vec<u32> = chain.iter().map(|d| d.version_num).collect();
    versions.sort_unstable();
    assert_eq!(versions, vec![1, 2, 3, 4, 5]);
}

fn orphan_definition(table: RecordId, version_num: u32) -> TableDefinition {
    TableDefinition {
        id: new_record_id(),
        table,
        created_at: Utc::now(),
        columns: BTreeSet::new(),
        version_num,
        previous: None,
    }
}

#[test]
fn test_skewed_chain_is_rejected_when_strict() {
    let s = setup(MemoryStore::new());
    let settings = LedgerSettings {
        strict_versioning: true,
        verify_chain_on_propose: false,
    };
    let ledger = Ledger::with_settings(Arc::clone(&s.store), settings);

    let v1 = ledger.propose(s.table, [s.columns[0]]).unwrap();
    s.store.create(&orphan_definition(s.table, 1)).unwrap();

    assert!(matches!(
        ledger.propose(s.table, [s.columns[1]]),
        Err(LedgerError::InconsistentChain { .. })
    ));
    assert_eq!(active_id(&s), Some(v1.id));
}

#[test]
fn test_skewed_chain_skips_ahead_when_lenient() {
    let s = setup(MemoryStore::new());
    let settings = LedgerSettings {
        strict_versioning: false,
        verify_chain_on_propose: false,
    };
    let ledger = Ledger::with_settings(Arc::clone(&s.store), settings);

    ledger.propose(s.table, [s.columns[0]]).unwrap();
    s.store.create(&orphan_definition(s.table, 1)).unwrap();

    let def = ledger.propose(s.table, [s.columns[1]]).unwrap();
    assert_eq!(def.version_num, 3);
}

#[test]
fn test_broken_chain_is_detected_before_proposing() {
    let s = setup(MemoryStore::new());
    let ledger = Ledger::new(Arc::clone(&s.store));

    ledger.propose(s.table, [s.columns[0]]).unwrap();
    s.store.create(&orphan_definition(s.table, 7)).unwrap();

    assert!(matches!(
        ledger.propose(s.table, [s.columns[1]]),
        Err(LedgerError::InconsistentChain { .. })
    ));
    assert!(matches!(
        ledger.verify_chain(s.table),
        Err(LedgerError::InconsistentChain { .. })
    ));
}

#[test]
fn test_ledger_on_sqlite() {
    let s = setup(SqliteStore::open_in_memory().unwrap());
    let ledger = Ledger::new(Arc::clone(&s.store));

    let v1 = ledger.propose(s.table, [s.columns[0]]).unwrap();
    let v2 = ledger.propose(s.table, [s.columns[0], s.columns[1]]).unwrap();
    assert_eq!(v2.previous, Some(v1.id));

    ledger.retract(v2.id).unwrap();
    assert_eq!(
        ledger.active_definition(s.table).unwrap().map(|d| d.id),
        Some(v1.id)
    );
}

#[test]
fn test_unknown_column_is_rejected() {
    fn check<S: CatalogStore>(store: S) {
        let s = setup(store);
        let ledger = Ledger::new(Arc::clone(&s.store));
        let v1 = ledger.propose(s.table, [s.columns[0]]).unwrap();

        let ghost = new_record_id();
        let err = ledger.propose(s.table, [s.columns[1], ghost]).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Store(StoreError::MissingReference {
                kind: "table_definition",
                target: "column",
                id,
            }) if id == ghost
        ));

        assert_eq!(active_id(&s), Some(v1.id));
        assert_eq!(ledger.history(s.table).unwrap(), vec![v1]);
    }

    check(MemoryStore::new());
    check(SqliteStore::open_in_memory().unwrap());
}

#[test]
fn test_abort_after_writes_rolls_back() {
    fn check<S: CatalogStore + 'static>(store: S) {
        let s = setup(CancellingStore::new(store));
        let ledger = Ledger::new(Arc::clone(&s.store));
        ledger.propose(s.table, [s.columns[0]]).unwrap();
        let v2 = ledger.propose(s.table, [s.columns[1]]).unwrap();
        let before = ledger.history(s.table).unwrap();

        // Proposing runs in a single transaction.
        let abort = Abort::none();
        s.store.cancel_in(1, &abort);
        assert!(matches!(
            ledger.propose_with(s.table, [s.columns[2]], &abort),
            Err(LedgerError::Cancelled)
        ));
        assert!(abort.is_cancelled());
        assert_eq!(active_id(&s), Some(v2.id));
        assert_eq!(ledger.history(s.table).unwrap(), before);

        // Retracting looks the definition up first, then mutates.
        let abort = Abort::none();
        s.store.cancel_in(2, &abort);
        assert!(matches!(
            ledger.retract_with(v2.id, &abort),
            Err(LedgerError::Cancelled)
        ));
        assert!(abort.is_cancelled());
        assert_eq!(active_id(&s), Some(v2.id));
        assert_eq!(ledger.history(s.table).unwrap(), before);
        assert_eq!(s.store.get::<TableDefinition>(v2.id).unwrap(), Some(v2));
        assert_eq!(ledger.verify_chain(s.table).unwrap(), before);
    }

    check(MemoryStore::new());
    check(SqliteStore::open_in_memory().unwrap());
}
