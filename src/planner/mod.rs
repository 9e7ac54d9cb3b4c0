//! Query plan compiler - turns a slice request into an executor-neutral plan.
//!
//! Compilation runs in phases:
//! 1. Validation: request shape rules, filter parameters, operation targets
//! 2. Join resolution: tables the request reads, pruned to declared joins
//! 3. Assembly: scan, joins, projections, filters, aggregation
//! 4. Rewrite: operations wrap their target's expression as new outputs
//!
//! Compilation is pure. The same inputs always produce an equal plan with
//! the same [`QueryPlan::fingerprint`].

pub mod builder;
pub mod cache;
pub mod hash;
pub mod join;
pub mod plan;
pub mod request;
pub mod validate;

pub use builder::PlanBuilder;
pub use cache::PlanCache;
pub use join::JoinResolver;
pub use plan::{
    Aggregate, Condition, GroupKey, PlanExpr, Predicate, Projection, QueryPlan, Rewrite, Stage,
};
pub use request::SliceRequest;
pub use validate::{validate, SchemaValidationError};

use crate::model::{Join, TableRef};
use thiserror::Error;

/// Errors that can occur during planning.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Schema validation failed: {0}")]
    SchemaValidation(#[from] SchemaValidationError),

    #[error("No join declared for required table '{table}'")]
    MissingJoin { table: String },

    #[error("Failed to fingerprint plan: {0}")]
    Fingerprint(String),
}

pub type PlanResult<T> = Result<T, PlanError>;

/// Main entry point for plan compilation.
pub struct QueryCompiler<'a> {
    main_table: &'a TableRef,
    joins: &'a [Join],
}

impl<'a> QueryCompiler<'a> {
    pub fn new(main_table: &'a TableRef, joins: &'a [Join]) -> Self {
        Self { main_table, joins }
    }

    /// Compile a request against the main table and declared joins.
    pub fn compile(&self, request: &SliceRequest) -> PlanResult<QueryPlan> {
        PlanBuilder::new(self.main_table, self.joins).build(request)
    }

    /// Like [`QueryCompiler::compile`], reusing a plan from `cache` when
    /// the same inputs were compiled before.
    pub fn compile_cached(
        &self,
        request: &SliceRequest,
        cache: &PlanCache,
    ) -> PlanResult<std::sync::Arc<QueryPlan>> {
        let key = PlanCache::key(self.main_table, self.joins, request)?;
        cache.get_or_compile(key, || self.compile(request))
    }
}

/// Compile `request` against `main_table` and `joins`.
pub fn compile(main_table: &TableRef, joins: &[Join], request: &SliceRequest) -> PlanResult<QueryPlan> {
    QueryCompiler::new(main_table, joins).compile(request)
}
