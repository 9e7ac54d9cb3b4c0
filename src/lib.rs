//! # Slicer
//!
//! Metadata and query compilation for a tabular data catalog.
//!
//! ## Architecture
//!
//! Slicer tracks versioned table definitions and compiles slice requests
//! into executor-neutral query plans:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Catalog (datasets, schemas, tables, columns)      │
//! │              MemoryStore | SqliteStore                   │
//! └─────────────────────────────────────────────────────────┘
//!             │                              │
//!             ▼ [ledger]                     ▼ [table refs]
//! ┌───────────────────────────┐  ┌──────────────────────────┐
//! │  Table Definition Ledger   │  │  Slice                   │
//! │  (versioned column sets)   │  │  (metrics, dimensions,   │
//! └───────────────────────────┘  │   joins)                 │
//!                                └──────────────────────────┘
//!                                             │
//!                                             ▼ [planner]
//! ┌─────────────────────────────────────────────────────────┐
//! │     QueryPlan (scan, joins, projections, filters,        │
//! │                aggregation, operation rewrites)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [executor]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Tabular result                          │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod config;
pub mod executor;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod planner;
pub mod slice;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::catalog::{Catalog, CatalogStore, MemoryStore, SqliteStore};
    pub use crate::executor::Executor;
    pub use crate::ledger::{Abort, Ledger, Proposal};
    pub use crate::model::{
        ComparisonOp, Dimension, DimensionType, Filter, FilterValue, Join, JoinType, Metric,
        Operation, OperationKind, RecordId, SliceElement, TableRef,
    };
    pub use crate::planner::{PlanCache, QueryPlan, SliceRequest};
    pub use crate::slice::{DisplayMap, Slice};
}

// Also export at crate root for convenience
pub use catalog::{StoreError, StoreResult};
pub use config::{Settings, SettingsError};
pub use ledger::{LedgerError, LedgerResult};
pub use planner::{PlanError, PlanResult, QueryPlan, SchemaValidationError, SliceRequest};
pub use slice::{Slice, SliceError, SliceResult};
