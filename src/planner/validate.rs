//! Request validation, run before anything is resolved.

use std::cmp::Ordering;
use std::collections::HashSet;

use super::request::SliceRequest;
use crate::model::Filter;

/// A request whose shape cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaValidationError {
    #[error(
        "Dimensions [{}] cannot be combined with group-by [{}]; use one or the other",
        .dimensions.join(", "),
        .group_by.join(", ")
    )]
    DimensionsWithGroupBy {
        dimensions: Vec<String>,
        group_by: Vec<String>,
    },

    #[error(
        "Raw metrics [{}] cannot be combined with aggregation metrics [{}]",
        .values.join(", "),
        .aggregations.join(", ")
    )]
    MixedMetricShapes {
        values: Vec<String>,
        aggregations: Vec<String>,
    },

    #[error("Aggregation metrics [{}] require a group-by", .metrics.join(", "))]
    AggregationWithoutGroupBy { metrics: Vec<String> },

    #[error("Group-by [{}] requires at least one aggregation metric", .group_by.join(", "))]
    GroupByWithoutAggregation { group_by: Vec<String> },

    #[error("Request selects no metrics, dimensions or group-by")]
    EmptyRequest,

    #[error("Operation '{operation}' targets '{element}', which this request does not select")]
    UnknownOperationTarget { operation: String, element: String },

    #[error("Range filter on '{element}' has start {start} after stop {stop}")]
    InvalidRange {
        element: String,
        start: String,
        stop: String,
    },

    #[error("Contains filter on '{element}' allows no values")]
    EmptyContains { element: String },

    #[error("Filter on aggregation metric '{element}' cannot be applied to rows")]
    FilterOnAggregation { element: String },

    #[error("Output '{name}' appears more than once")]
    DuplicateOutput { name: String },

    #[error("Unknown {kind} '{name}'")]
    UnknownElement { kind: &'static str, name: String },
}

fn names<'a, T: AsRef<crate::model::SliceElement> + 'a>(
    items: impl IntoIterator<Item = &'a T>,
) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.as_ref().name.clone())
        .collect()
}

/// Check the request shape.
///
/// Rules are checked in a fixed order and the first violation is reported:
/// 1. `dimensions` and `group_by` are mutually exclusive
/// 2. raw and aggregation metrics are mutually exclusive
/// 3. aggregation metrics and `group_by` require each other
pub fn validate(request: &SliceRequest) -> Result<(), SchemaValidationError> {
    if !request.dimensions.is_empty() && !request.group_by.is_empty() {
        return Err(SchemaValidationError::DimensionsWithGroupBy {
            dimensions: names(&request.dimensions),
            group_by: names(&request.group_by),
        });
    }

    let values = names(request.values());
    let aggregations = names(request.aggregations());

    if !values.is_empty() && !aggregations.is_empty() {
        return Err(SchemaValidationError::MixedMetricShapes {
            values,
            aggregations,
        });
    }

    if !aggregations.is_empty() && request.group_by.is_empty() {
        return Err(SchemaValidationError::AggregationWithoutGroupBy {
            metrics: aggregations,
        });
    }
    if !request.group_by.is_empty() && aggregations.is_empty() {
        return Err(SchemaValidationError::GroupByWithoutAggregation {
            group_by: names(&request.group_by),
        });
    }

    if request.metrics.is_empty() && request.dimensions.is_empty() && request.group_by.is_empty()
    {
        return Err(SchemaValidationError::EmptyRequest);
    }

    let aggregations: HashSet<&str> = request.aggregations().map(|m| m.name()).collect();
    for filter in &request.filters {
        if aggregations.contains(filter.element().name.as_str()) {
            return Err(SchemaValidationError::FilterOnAggregation {
                element: filter.element().name.clone(),
            });
        }
        validate_filter(filter)?;
    }

    validate_operations(request)?;
    validate_outputs(request)
}

fn validate_filter(filter: &Filter) -> Result<(), SchemaValidationError> {
    match filter {
        Filter::Range {
            element,
            start,
            stop,
        } => {
            if start.partial_compare(stop) == Some(Ordering::Greater) {
                return Err(SchemaValidationError::InvalidRange {
                    element: element.name.clone(),
                    start: start.to_string(),
                    stop: stop.to_string(),
                });
            }
        }
        Filter::Contains { element, values } if values.is_empty() => {
            return Err(SchemaValidationError::EmptyContains {
                element: element.name.clone(),
            });
        }
        _ => {}
    }
    Ok(())
}

/// Operations may only wrap elements the request selects.
fn validate_operations(request: &SliceRequest) -> Result<(), SchemaValidationError> {
    let targets: HashSet<&str> = request
        .metrics
        .iter()
        .map(|m| m.name())
        .chain(request.dimensions.iter().map(|d| d.name()))
        .chain(request.group_by.iter().map(|d| d.name()))
        .collect();

    for operation in &request.operations {
        if !targets.contains(operation.element.name.as_str()) {
            return Err(SchemaValidationError::UnknownOperationTarget {
                operation: operation.name(),
                element: operation.element.name.clone(),
            });
        }
    }
    Ok(())
}

/// Every output column name must be unique within the plan.
fn validate_outputs(request: &SliceRequest) -> Result<(), SchemaValidationError> {
    let mut seen = HashSet::new();
    let elements = request
        .dimensions
        .iter()
        .chain(&request.group_by)
        .map(|d| d.name().to_string())
        .chain(request.metrics.iter().map(|m| m.name().to_string()));

    for name in elements.chain(request.operations.iter().map(|op| op.name())) {
        if !seen.insert(name.clone()) {
            return Err(SchemaValidationError::DuplicateOutput { name });
        }
    }
    Ok(())
}
