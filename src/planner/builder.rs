//! Assemble query plans from slice requests.

use std::collections::HashSet;

use tracing::{debug, trace};

use super::join::JoinResolver;
use super::plan::{Aggregate, Condition, GroupKey, PlanExpr, Predicate, Projection, QueryPlan, Rewrite};
use super::request::SliceRequest;
use super::validate::validate;
use super::PlanResult;
use crate::model::{Dimension, Filter, Join, Metric, TableRef};

pub struct PlanBuilder<'a> {
    main_table: &'a TableRef,
    joins: &'a [Join],
}

impl<'a> PlanBuilder<'a> {
    pub fn new(main_table: &'a TableRef, joins: &'a [Join]) -> Self {
        Self { main_table, joins }
    }

    pub fn build(&self, request: &SliceRequest) -> PlanResult<QueryPlan> {
        validate(request)?;

        let filters = dedup_filters(&request.filters);
        if filters.len() < request.filters.len() {
            debug!(
                dropped = request.filters.len() - filters.len(),
                "dropped duplicate filters"
            );
        }

        let resolver = JoinResolver::new(self.main_table, self.joins);
        let required = resolver.required_tables(request, &filters);
        let joins = resolver.resolve(&required)?;

        let mut plan = QueryPlan {
            main_table: self.main_table.clone(),
            joins,
            projections: self.build_projections(request),
            filters: filters.iter().map(|f| build_predicate(f)).collect(),
            aggregate: self.build_aggregate(request),
            rewrites: Vec::new(),
        };

        self.apply_operations(&mut plan, request);

        trace!(plan = %plan.explain(), "compiled plan");
        Ok(plan)
    }

    /// Flat shape: dimensions then raw metrics.
    fn build_projections(&self, request: &SliceRequest) -> Vec<Projection> {
        if request.is_aggregated() {
            return Vec::new();
        }
        request
            .dimensions
            .iter()
            .map(dimension_projection)
            .chain(request.metrics.iter().map(metric_projection))
            .collect()
    }

    fn build_aggregate(&self, request: &SliceRequest) -> Option<Aggregate> {
        if !request.is_aggregated() {
            return None;
        }
        Some(Aggregate {
            group_by: request
                .group_by
                .iter()
                .map(|d| GroupKey {
                    name: d.element.name.clone(),
                    label: d.element.display_label().to_string(),
                    key: d.id_definition.clone(),
                    expr: PlanExpr::fragment(&d.element.definition),
                })
                .collect(),
            measures: request.metrics.iter().map(metric_projection).collect(),
        })
    }

    /// Append one output per operation, wrapping its target's expression.
    ///
    /// Outputs land next to their target: in the projections of a flat
    /// plan, in the measures of an aggregated one.
    fn apply_operations(&self, plan: &mut QueryPlan, request: &SliceRequest) {
        for operation in &request.operations {
            let target = operation.element.name.as_str();
            let (outputs, source) = match plan.aggregate.as_mut() {
                Some(aggregate) => {
                    let source = aggregate
                        .measures
                        .iter()
                        .find(|m| m.name == target)
                        .map(|m| (m.expr.clone(), m.analytic))
                        .or_else(|| {
                            aggregate
                                .group_by
                                .iter()
                                .find(|k| k.name == target)
                                .map(|k| (k.expr.clone(), false))
                        });
                    (&mut aggregate.measures, source)
                }
                None => {
                    let source = plan
                        .projections
                        .iter()
                        .find(|p| p.name == target)
                        .map(|p| (p.expr.clone(), p.analytic));
                    (&mut plan.projections, source)
                }
            };
            // Validation guarantees the target is selected.
            let Some((expr, analytic)) = source else {
                continue;
            };

            outputs.push(Projection {
                name: operation.name(),
                label: operation.label(),
                expr: PlanExpr::time_compare(operation.kind, expr),
                analytic,
            });
            plan.rewrites.push(Rewrite {
                output: operation.name(),
                target: target.to_string(),
                operation: operation.kind,
            });
        }
    }
}

/// Drop structurally equal filters, keeping the first occurrence.
pub fn dedup_filters(filters: &[Filter]) -> Vec<&Filter> {
    let mut seen = HashSet::new();
    filters.iter().filter(|f| seen.insert(*f)).collect()
}

fn dimension_projection(dimension: &Dimension) -> Projection {
    Projection {
        name: dimension.element.name.clone(),
        label: dimension.element.display_label().to_string(),
        expr: PlanExpr::fragment(&dimension.element.definition),
        analytic: false,
    }
}

fn metric_projection(metric: &Metric) -> Projection {
    Projection {
        name: metric.element.name.clone(),
        label: metric.element.display_label().to_string(),
        expr: PlanExpr::fragment(&metric.element.definition),
        analytic: metric.is_analytic,
    }
}

/// Filters are row predicates, applied before any aggregation.
fn build_predicate(filter: &Filter) -> Predicate {
    let condition = match filter {
        Filter::Comparison { op, value, .. } => Condition::Compare {
            op: *op,
            value: value.clone(),
        },
        Filter::Contains { values, .. } => Condition::In {
            values: values.iter().cloned().collect(),
        },
        Filter::Range { start, stop, .. } => Condition::Between {
            start: start.clone(),
            stop: stop.clone(),
        },
    };
    Predicate {
        element: filter.element().name.clone(),
        expr: filter.element().definition.clone(),
        condition,
    }
}
