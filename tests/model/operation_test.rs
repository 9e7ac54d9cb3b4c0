//! Tests for operation naming and labels.

use slicer::model::{Dimension, DimensionType, Metric, Operation, OperationKind};

#[test]
fn test_names_and_labels_per_kind() {
    let revenue = Metric::aggregation("rev", "SUM(orders.amount)").with_label("Revenue");

    let cases = [
        (Operation::wow(&revenue), "wow_rev", "WoW(Revenue)"),
        (Operation::mom(&revenue), "mom_rev", "MoM(Revenue)"),
        (Operation::yoy(&revenue), "yoy_rev", "YoY(Revenue)"),
    ];
    for (operation, name, label) in cases {
        assert_eq!(operation.name(), name);
        assert_eq!(operation.label(), label);
    }
}

#[test]
fn test_operation_on_dimension() {
    let signups = Dimension::new("signups", "COUNT(users.id)", DimensionType::Numeric);
    let operation = Operation::new(OperationKind::MoM, &signups);
    assert_eq!(operation.name(), "mom_signups");
    assert_eq!(operation.label(), "MoM(signups)");
}

#[test]
fn test_names_are_derived_not_stored() {
    let revenue = Metric::aggregation("rev", "SUM(orders.amount)").with_label("Revenue");
    let mut operation = Operation::wow(&revenue);

    operation.element.name = "revenue".to_string();
    operation.element.label = "Net revenue".to_string();

    assert_eq!(operation.name(), "wow_revenue");
    assert_eq!(operation.label(), "WoW(Net revenue)");

    let json = serde_json::to_value(&operation).unwrap();
    assert!(json.get("name").is_none());
    assert!(json.get("label").is_none());
}

#[test]
fn test_period_lengths() {
    assert_eq!(OperationKind::WoW.period_days(), 7);
    assert_eq!(OperationKind::MoM.period_days(), 30);
    assert_eq!(OperationKind::YoY.period_days(), 365);
}
