//! Slice request - what a caller asks a slice for.

use serde::{Deserialize, Serialize};

use crate::model::{Dimension, Filter, Metric, Operation};

/// Metrics, dimensions, filters, grouping and operations to compile.
///
/// `dimensions` select a flat, row-level projection; `group_by` selects an
/// aggregated rollup. A request uses one shape or the other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SliceRequest {
    pub metrics: Vec<Metric>,
    pub dimensions: Vec<Dimension>,
    pub filters: Vec<Filter>,
    pub group_by: Vec<Dimension>,
    pub operations: Vec<Operation>,
}

impl SliceRequest {
    /// An empty request; it fails validation until something is selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request from a list of metrics.
    pub fn metrics(metrics: impl IntoIterator<Item = Metric>) -> Self {
        Self {
            metrics: metrics.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Add a metric. Its output column is the metric name.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    /// Add a dimension to a flat projection.
    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    /// Add a row filter. Structurally equal filters are compiled once.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Group by a dimension, turning the request into a rollup.
    pub fn with_group_by(mut self, dimension: Dimension) -> Self {
        self.group_by.push(dimension);
        self
    }

    /// Add a WoW/MoM/YoY output over a selected element.
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Aggregation metrics of the request.
    pub fn aggregations(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter().filter(|m| m.is_aggregation)
    }

    /// Raw per-row metrics of the request.
    pub fn values(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter().filter(|m| !m.is_aggregation)
    }

    /// Whether the request compiles to an aggregated plan.
    pub fn is_aggregated(&self) -> bool {
        !self.group_by.is_empty()
    }
}
