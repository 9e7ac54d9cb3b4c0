//! Value types shared by the catalog, the ledger and the planner.

pub mod catalog;
pub mod element;
pub mod filter;
pub mod join;
pub mod operation;
pub mod types;

pub use catalog::{Column, DataSet, Maintainer, Schema, Table, TableDefinition, UnknownVendor, Vendor};
pub use element::{Dimension, DimensionType, Metric, SliceElement};
pub use filter::{ComparisonOp, Filter, FilterValue};
pub use join::{Join, JoinType};
pub use operation::{Operation, OperationKind};
pub use types::{new_record_id, Descriptor, Lifecycle, RecordId, Stewardship, TableRef};
