//! Plan assembly: stage order, rewrites, dedup and fingerprints.

use insta::assert_snapshot;
use slicer::model::{
    new_record_id, ComparisonOp, Dimension, DimensionType, Filter, Join, Metric, Operation,
    TableRef,
};
use slicer::planner::{compile, Condition, PlanExpr, QueryPlan, SliceRequest, Stage};

struct Sales {
    orders: TableRef,
    joins: Vec<Join>,
    region: Dimension,
    status: Dimension,
    amount: Metric,
    revenue: Metric,
}

fn sales() -> Sales {
    let orders = TableRef::new(new_record_id(), "orders");
    let customers = TableRef::new(new_record_id(), "customers");
    Sales {
        joins: vec![Join::left(customers.clone(), "orders.cust_id = customers.id")],
        region: Dimension::new("region", "customers.region", DimensionType::Categorical)
            .with_id_definition("customers.region_id")
            .with_label("Region")
            .with_table(customers),
        status: Dimension::new("status", "orders.status", DimensionType::Categorical)
            .with_table(orders.clone()),
        amount: Metric::value("amount", "orders.amount").with_table(orders.clone()),
        revenue: Metric::aggregation("revenue", "SUM(orders.amount)")
            .with_label("Revenue")
            .with_table(orders.clone()),
        orders,
    }
}

fn flat_plan(s: &Sales) -> QueryPlan {
    let request = SliceRequest::metrics([s.amount.clone()])
        .with_dimension(s.region.clone())
        .with_filter(Filter::comparison(&s.region, ComparisonOp::Eq, "eu"))
        .with_filter(Filter::range(&s.amount, 10, 100))
        .with_operation(Operation::wow(&s.amount));
    compile(&s.orders, &s.joins, &request).unwrap()
}

fn rollup_plan(s: &Sales) -> QueryPlan {
    let request = SliceRequest::metrics([s.revenue.clone()])
        .with_group_by(s.region.clone())
        .with_filter(Filter::contains(&s.status, ["shipped", "paid"]))
        .with_operation(Operation::yoy(&s.revenue));
    compile(&s.orders, &s.joins, &request).unwrap()
}

#[test]
fn test_flat_plan_explain() {
    let plan = flat_plan(&sales());
    assert_snapshot!(plan.explain(), @r"
    Scan: orders
    Join: left customers ON orders.cust_id = customers.id
    Project: region := customers.region, amount := orders.amount, wow_amount := WoW[7d](orders.amount)
    Filter: customers.region = 'eu' AND orders.amount BETWEEN 10 AND 100
    ");
}

#[test]
fn test_rollup_plan_explain() {
    let plan = rollup_plan(&sales());
    assert_snapshot!(plan.explain(), @r"
    Scan: orders
    Join: left customers ON orders.cust_id = customers.id
    Filter: orders.status IN ('paid', 'shipped')
    Aggregate: by region := customers.region by customers.region_id
      revenue := SUM(orders.amount)
      yoy_revenue := YoY[365d](SUM(orders.amount))
    ");
}

#[test]
fn test_stage_order_is_fixed() {
    let plan = flat_plan(&sales());
    let kinds: Vec<&str> = plan
        .stages()
        .iter()
        .map(|stage| match stage {
            Stage::Scan(_) => "scan",
            Stage::Join(_) => "join",
            Stage::Project(_) => "project",
            Stage::Filter(_) => "filter",
            Stage::Aggregate(_) => "aggregate",
        })
        .collect();
    assert_eq!(kinds, vec!["scan", "join", "project", "filter"]);

    let plan = rollup_plan(&sales());
    assert!(plan.projections.is_empty());
    assert!(matches!(plan.stages().last(), Some(Stage::Aggregate(_))));
}

#[test]
fn test_rollup_outputs_and_rewrites() {
    let plan = rollup_plan(&sales());
    assert_eq!(plan.output_columns(), vec!["region", "revenue", "yoy_revenue"]);

    let aggregate = plan.aggregate.as_ref().unwrap();
    assert_eq!(aggregate.group_by[0].key, "customers.region_id");
    assert_eq!(aggregate.group_by[0].label, "Region");
    assert_eq!(aggregate.measures[1].label, "YoY(Revenue)");

    assert_eq!(plan.rewrites.len(), 1);
    assert_eq!(plan.rewrites[0].output, "yoy_revenue");
    assert_eq!(plan.rewrites[0].target, "revenue");
}

#[test]
fn test_operation_on_group_by_key() {
    let s = sales();
    let request = SliceRequest::metrics([s.revenue.clone()])
        .with_group_by(s.region.clone())
        .with_operation(Operation::mom(&s.region));

    let plan = compile(&s.orders, &s.joins, &request).unwrap();
    let measures = &plan.aggregate.as_ref().unwrap().measures;
    assert_eq!(measures[1].name, "mom_region");
    assert_eq!(
        measures[1].expr,
        PlanExpr::time_compare(
            slicer::model::OperationKind::MoM,
            PlanExpr::fragment("customers.region")
        )
    );
}

#[test]
fn test_duplicate_filters_are_dropped() {
    let s = sales();
    let eu = Filter::comparison(&s.region, ComparisonOp::Eq, "eu");
    let shipped = Filter::comparison(&s.status, ComparisonOp::Eq, "shipped");
    let request = SliceRequest::metrics([s.amount.clone()])
        .with_filter(eu.clone())
        .with_filter(shipped)
        .with_filter(eu);

    let plan = compile(&s.orders, &s.joins, &request).unwrap();
    let elements: Vec<&str> = plan.filters.iter().map(|p| p.element.as_str()).collect();
    assert_eq!(elements, vec!["region", "status"]);
    assert!(matches!(plan.filters[0].condition, Condition::Compare { .. }));
}

#[test]
fn test_analytic_flag_is_carried() {
    let s = sales();
    let running = Metric::value("running", "SUM(orders.amount) OVER (ORDER BY orders.day)")
        .analytic()
        .with_table(s.orders.clone());
    let plan = compile(&s.orders, &s.joins, &SliceRequest::metrics([running])).unwrap();
    assert!(plan.projections[0].analytic);
}

#[test]
fn test_compilation_is_deterministic() {
    let s = sales();
    let a = flat_plan(&s);
    let b = flat_plan(&s);
    assert_eq!(a, b);
    assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    assert_ne!(a.fingerprint().unwrap(), rollup_plan(&s).fingerprint().unwrap());
}

#[test]
fn test_plan_serializes_for_executors() {
    let plan = rollup_plan(&sales());
    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["main_table"]["name"], "orders");
    assert_eq!(json["joins"][0]["join_type"], "left");
    assert_eq!(json["filters"][0]["condition"]["kind"], "in");
    assert_eq!(
        json["aggregate"]["measures"][1]["expr"]["kind"],
        "time_compare"
    );
}
