//! Slices: named query views anchored on one main table.
//!
//! A slice owns a catalog of metrics, dimensions and joins. Requests name
//! elements from that catalog; [`Slice::data`] resolves them, compiles a
//! plan and hands it to an [`Executor`].

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::catalog::Record;
use crate::executor::Executor;
use crate::model::{new_record_id, Dimension, Join, Metric, RecordId, SliceElement, TableRef};
use crate::planner::{
    PlanCache, PlanError, QueryCompiler, QueryPlan, SchemaValidationError, SliceRequest,
};

/// Errors that can occur building or querying a slice.
#[derive(Debug, thiserror::Error)]
pub enum SliceError {
    #[error("Slice already declares a join to table '{table}'")]
    DuplicateJoin { table: String },

    #[error("Slice already declares an element named '{name}'")]
    DuplicateElement { name: String },

    #[error("Invalid element name '{name}'")]
    InvalidElementName { name: String },

    #[error("Join to the main table '{table}' is implicit")]
    JoinToMainTable { table: String },

    #[error("Planning failed: {0}")]
    Plan(#[from] PlanError),

    #[error("Execution failed: {0}")]
    Execution(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<SchemaValidationError> for SliceError {
    fn from(err: SchemaValidationError) -> Self {
        SliceError::Plan(err.into())
    }
}

pub type SliceResult<T> = Result<T, SliceError>;

/// A named, reusable query view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub main_table: TableRef,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    /// Declared joins, in the order plans apply them.
    #[serde(default)]
    pub joins: Vec<Join>,
}

impl Record for Slice {
    const KIND: &'static str = "slice";

    fn id(&self) -> RecordId {
        self.id
    }
}

impl Slice {
    pub fn new(name: impl Into<String>, main_table: TableRef) -> Self {
        Self {
            id: new_record_id(),
            name: name.into(),
            description: String::new(),
            main_table,
            metrics: Vec::new(),
            dimensions: Vec::new(),
            joins: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> SliceResult<Self> {
        self.check_new_element(&metric.element)?;
        self.metrics.push(metric);
        Ok(self)
    }

    pub fn with_dimension(mut self, dimension: Dimension) -> SliceResult<Self> {
        self.check_new_element(&dimension.element)?;
        self.dimensions.push(dimension);
        Ok(self)
    }

    pub fn with_join(mut self, join: Join) -> SliceResult<Self> {
        if join.table.id == self.main_table.id {
            return Err(SliceError::JoinToMainTable {
                table: join.table.name,
            });
        }
        if self.joins.iter().any(|j| j.table.id == join.table.id) {
            return Err(SliceError::DuplicateJoin {
                table: join.table.name,
            });
        }
        self.joins.push(join);
        Ok(self)
    }

    fn check_new_element(&self, element: &SliceElement) -> SliceResult<()> {
        if !element.has_valid_name() {
            return Err(SliceError::InvalidElementName {
                name: element.name.clone(),
            });
        }
        if self.element(&element.name).is_some() {
            return Err(SliceError::DuplicateElement {
                name: element.name.clone(),
            });
        }
        Ok(())
    }

    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name() == name)
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name() == name)
    }

    /// A metric or dimension of this slice.
    pub fn element(&self, name: &str) -> Option<&SliceElement> {
        self.metric(name)
            .map(|m| &m.element)
            .or_else(|| self.dimension(name).map(|d| &d.element))
    }

    /// Replace every element the request names with this slice's copy.
    ///
    /// Fails on the first name the slice does not declare, and on filters
    /// naming one of the slice's aggregation metrics.
    pub fn resolve(&self, request: &SliceRequest) -> SliceResult<SliceRequest> {
        let unknown = |kind: &'static str, name: &str| {
            SliceError::from(SchemaValidationError::UnknownElement {
                kind,
                name: name.to_string(),
            })
        };

        let mut resolved = request.clone();
        for metric in &mut resolved.metrics {
            *metric = self
                .metric(metric.name())
                .ok_or_else(|| unknown("metric", metric.name()))?
                .clone();
        }
        for dimension in resolved.dimensions.iter_mut().chain(&mut resolved.group_by) {
            *dimension = self
                .dimension(dimension.name())
                .ok_or_else(|| unknown("dimension", dimension.name()))?
                .clone();
        }
        for filter in &mut resolved.filters {
            let element = filter.element_mut();
            if self.metric(&element.name).is_some_and(|m| m.is_aggregation) {
                return Err(SchemaValidationError::FilterOnAggregation {
                    element: element.name.clone(),
                }
                .into());
            }
            *element = self
                .element(&element.name)
                .ok_or_else(|| unknown("element", &element.name))?
                .clone();
        }
        for operation in &mut resolved.operations {
            operation.element = self
                .element(&operation.element.name)
                .ok_or_else(|| unknown("element", &operation.element.name))?
                .clone();
        }
        Ok(resolved)
    }

    /// Compile a request against this slice's main table and joins.
    #[instrument(skip_all, fields(slice = %self.name))]
    pub fn compile(&self, request: &SliceRequest) -> SliceResult<QueryPlan> {
        let request = self.resolve(request)?;
        let plan = QueryCompiler::new(&self.main_table, &self.joins).compile(&request)?;
        debug!(joins = plan.joins.len(), outputs = plan.output_columns().len(), "compiled slice request");
        Ok(plan)
    }

    /// Compile a request and run the plan on `executor`.
    pub fn data<E: Executor>(&self, executor: &E, request: &SliceRequest) -> SliceResult<E::Output> {
        let plan = self.compile(request)?;
        executor
            .execute(&plan)
            .map_err(|e| SliceError::Execution(Box::new(e)))
    }

    /// Like [`Slice::data`], reusing compiled plans from `cache`.
    #[instrument(skip_all, fields(slice = %self.name))]
    pub fn data_cached<E: Executor>(
        &self,
        executor: &E,
        request: &SliceRequest,
        cache: &PlanCache,
    ) -> SliceResult<E::Output> {
        let request = self.resolve(request)?;
        let plan: Arc<QueryPlan> =
            QueryCompiler::new(&self.main_table, &self.joins).compile_cached(&request, cache)?;
        executor
            .execute(&plan)
            .map_err(|e| SliceError::Execution(Box::new(e)))
    }

    /// Output names of a request mapped to their labels.
    ///
    /// Derived from the request alone; nothing is validated.
    pub fn display(&self, request: &SliceRequest) -> DisplayMap {
        DisplayMap {
            metrics: labels(request.metrics.iter().map(|m| &m.element)),
            dimensions: labels(
                request
                    .dimensions
                    .iter()
                    .chain(&request.group_by)
                    .map(|d| &d.element),
            ),
            operations: request
                .operations
                .iter()
                .map(|o| (o.name(), o.label()))
                .collect(),
        }
    }

    /// Tables this slice can read: the main table plus every joined one.
    pub fn tables(&self) -> HashSet<&TableRef> {
        std::iter::once(&self.main_table)
            .chain(self.joins.iter().map(|j| &j.table))
            .collect()
    }
}

fn labels<'a>(elements: impl Iterator<Item = &'a SliceElement>) -> BTreeMap<String, String> {
    elements
        .map(|e| (e.name.clone(), e.display_label().to_string()))
        .collect()
}

/// Name to label maps for presentation layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayMap {
    pub metrics: BTreeMap<String, String>,
    pub dimensions: BTreeMap<String, String>,
    pub operations: BTreeMap<String, String>,
}

impl DisplayMap {
    /// All entries in one map.
    pub fn flatten(&self) -> BTreeMap<String, String> {
        self.metrics
            .iter()
            .chain(&self.dimensions)
            .chain(&self.operations)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
