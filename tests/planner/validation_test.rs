//! Request shape validation through the compiler.

use slicer::model::{
    new_record_id, ComparisonOp, Dimension, DimensionType, Filter, Metric, Operation, TableRef,
};
use slicer::planner::{compile, PlanError, SchemaValidationError, SliceRequest};

fn orders() -> TableRef {
    TableRef::new(new_record_id(), "orders")
}

fn region() -> Dimension {
    Dimension::new("region", "orders.region", DimensionType::Categorical)
}

fn amount() -> Metric {
    Metric::value("amount", "orders.amount")
}

fn revenue() -> Metric {
    Metric::aggregation("revenue", "SUM(orders.amount)")
}

fn schema_error(request: &SliceRequest) -> SchemaValidationError {
    match compile(&orders(), &[], request) {
        Err(PlanError::SchemaValidation(err)) => err,
        other => panic!("expected schema validation error, got {:?}", other),
    }
}

#[test]
fn test_dimensions_with_group_by() {
    let request = SliceRequest::metrics([revenue()])
        .with_dimension(region())
        .with_group_by(region());
    assert_eq!(
        schema_error(&request),
        SchemaValidationError::DimensionsWithGroupBy {
            dimensions: vec!["region".to_string()],
            group_by: vec!["region".to_string()],
        }
    );
}

#[test]
fn test_mixed_metric_shapes() {
    let request = SliceRequest::metrics([amount(), revenue()]).with_group_by(region());
    assert!(matches!(
        schema_error(&request),
        SchemaValidationError::MixedMetricShapes { .. }
    ));
}

#[test]
fn test_aggregation_without_group_by() {
    let request = SliceRequest::metrics([revenue()]);
    assert_eq!(
        schema_error(&request),
        SchemaValidationError::AggregationWithoutGroupBy {
            metrics: vec!["revenue".to_string()],
        }
    );
}

#[test]
fn test_group_by_without_aggregation() {
    let request = SliceRequest::new().with_group_by(region());
    assert!(matches!(
        schema_error(&request),
        SchemaValidationError::GroupByWithoutAggregation { .. }
    ));

    let request = SliceRequest::metrics([amount()]).with_group_by(region());
    assert!(matches!(
        schema_error(&request),
        SchemaValidationError::GroupByWithoutAggregation { .. }
    ));
}

#[test]
fn test_empty_request() {
    assert_eq!(
        schema_error(&SliceRequest::new()),
        SchemaValidationError::EmptyRequest
    );
}

#[test]
fn test_inverted_range() {
    let request =
        SliceRequest::metrics([amount()]).with_filter(Filter::range(amount(), 100, 10));
    assert!(matches!(
        schema_error(&request),
        SchemaValidationError::InvalidRange { .. }
    ));

    // Incomparable bounds are left to the executor.
    let request =
        SliceRequest::metrics([amount()]).with_filter(Filter::range(amount(), "a", 10));
    assert!(compile(&orders(), &[], &request).is_ok());
}

#[test]
fn test_empty_contains() {
    let request = SliceRequest::metrics([amount()])
        .with_filter(Filter::contains(region(), Vec::<&str>::new()));
    assert_eq!(
        schema_error(&request),
        SchemaValidationError::EmptyContains {
            element: "region".to_string()
        }
    );
}

#[test]
fn test_operation_target_must_be_selected() {
    let request = SliceRequest::metrics([amount()]).with_operation(Operation::wow(revenue()));
    assert!(matches!(
        schema_error(&request),
        SchemaValidationError::UnknownOperationTarget { .. }
    ));
}

#[test]
fn test_valid_shapes_compile() {
    let flat = SliceRequest::metrics([amount()])
        .with_dimension(region())
        .with_filter(Filter::comparison(region(), ComparisonOp::Eq, "eu"));
    assert!(compile(&orders(), &[], &flat).is_ok());

    let rollup = SliceRequest::metrics([revenue()]).with_group_by(region());
    assert!(compile(&orders(), &[], &rollup).is_ok());
}

#[test]
fn test_repeated_outputs_are_rejected() {
    let request = SliceRequest::metrics([amount(), amount()]);
    assert_eq!(
        schema_error(&request),
        SchemaValidationError::DuplicateOutput {
            name: "amount".to_string()
        }
    );

    let request = SliceRequest::metrics([amount()])
        .with_operation(Operation::wow(amount()))
        .with_operation(Operation::wow(amount()));
    assert_eq!(
        schema_error(&request),
        SchemaValidationError::DuplicateOutput {
            name: "wow_amount".to_string()
        }
    );

    // An element may not take an operation's output name either.
    let request = SliceRequest::metrics([amount(), Metric::value("wow_amount", "orders.prev")])
        .with_operation(Operation::wow(amount()));
    assert_eq!(
        schema_error(&request),
        SchemaValidationError::DuplicateOutput {
            name: "wow_amount".to_string()
        }
    );

    // Different operations over one element are distinct outputs.
    let request = SliceRequest::metrics([amount()])
        .with_operation(Operation::wow(amount()))
        .with_operation(Operation::yoy(amount()));
    let plan = compile(&orders(), &[], &request).unwrap();
    assert_eq!(plan.output_columns(), vec!["amount", "wow_amount", "yoy_amount"]);
}

#[test]
fn test_filter_on_aggregation_metric() {
    let request = SliceRequest::metrics([revenue()])
        .with_group_by(region())
        .with_filter(Filter::comparison(revenue(), ComparisonOp::Gt, 100));
    assert_eq!(
        schema_error(&request),
        SchemaValidationError::FilterOnAggregation {
            element: "revenue".to_string()
        }
    );
}
