//! Query plan types handed to executors.

use std::fmt;

use serde::Serialize;

use super::hash::compute_hash;
use super::{PlanError, PlanResult};
use crate::model::{ComparisonOp, FilterValue, Join, OperationKind, TableRef};

/// A compiled, executor-neutral query.
///
/// Stages apply in a fixed order: scan the main table, apply `joins`, then
/// `projections`, then `filters`, then `aggregate`. Operation outputs are
/// already folded into `projections` or `aggregate.measures`; `rewrites`
/// records which outputs they are.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    pub main_table: TableRef,
    pub joins: Vec<Join>,
    pub projections: Vec<Projection>,
    pub filters: Vec<Predicate>,
    pub aggregate: Option<Aggregate>,
    pub rewrites: Vec<Rewrite>,
}

/// One stage of a plan, borrowed from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage<'a> {
    Scan(&'a TableRef),
    Join(&'a Join),
    Project(&'a [Projection]),
    Filter(&'a [Predicate]),
    Aggregate(&'a Aggregate),
}

/// Expression of an output column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanExpr {
    /// An element definition, passed through verbatim.
    Fragment { sql: String },
    /// `input` compared against the same value one period earlier.
    TimeCompare {
        operation: OperationKind,
        period_days: u32,
        input: Box<PlanExpr>,
    },
}

impl PlanExpr {
    pub fn fragment(sql: impl Into<String>) -> Self {
        PlanExpr::Fragment { sql: sql.into() }
    }

    pub fn time_compare(operation: OperationKind, input: PlanExpr) -> Self {
        PlanExpr::TimeCompare {
            operation,
            period_days: operation.period_days(),
            input: Box::new(input),
        }
    }
}

impl fmt::Display for PlanExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanExpr::Fragment { sql } => f.write_str(sql),
            PlanExpr::TimeCompare {
                operation,
                period_days,
                input,
            } => write!(f, "{}[{}d]({})", operation, period_days, input),
        }
    }
}

/// A named output column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Projection {
    pub name: String,
    pub label: String,
    pub expr: PlanExpr,
    /// The expression is an analytic (window) function.
    pub analytic: bool,
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} := {}", self.name, self.expr)
    }
}

/// A group-by key: rows group on `key` and output `expr` as `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GroupKey {
    pub name: String,
    pub label: String,
    pub key: String,
    pub expr: PlanExpr,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expr {
            PlanExpr::Fragment { sql } if *sql == self.key => {
                write!(f, "{} := {}", self.name, self.key)
            }
            expr => write!(f, "{} := {} by {}", self.name, expr, self.key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub group_by: Vec<GroupKey>,
    pub measures: Vec<Projection>,
}

/// Condition of a [`Predicate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    Compare { op: ComparisonOp, value: FilterValue },
    In { values: Vec<FilterValue> },
    Between { start: FilterValue, stop: FilterValue },
}

/// A row predicate over an element's definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    /// Name of the filtered element.
    pub element: String,
    pub expr: String,
    pub condition: Condition,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition {
            Condition::Compare { op, value } => {
                write!(f, "{} {} {}", self.expr, op.symbol(), value)
            }
            Condition::In { values } => {
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{} IN ({})", self.expr, values.join(", "))
            }
            Condition::Between { start, stop } => {
                write!(f, "{} BETWEEN {} AND {}", self.expr, start, stop)
            }
        }
    }
}

/// Record of one operation folded into the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rewrite {
    /// Name of the generated output, e.g. `wow_revenue`.
    pub output: String,
    /// Name of the wrapped element.
    pub target: String,
    pub operation: OperationKind,
}

impl QueryPlan {
    /// The plan's stages in execution order. Empty stages are omitted.
    pub fn stages(&self) -> Vec<Stage<'_>> {
        let mut stages = vec![Stage::Scan(&self.main_table)];
        stages.extend(self.joins.iter().map(Stage::Join));
        if !self.projections.is_empty() {
            stages.push(Stage::Project(&self.projections));
        }
        if !self.filters.is_empty() {
            stages.push(Stage::Filter(&self.filters));
        }
        if let Some(aggregate) = &self.aggregate {
            stages.push(Stage::Aggregate(aggregate));
        }
        stages
    }

    /// Names of the plan's output columns, in order.
    pub fn output_columns(&self) -> Vec<&str> {
        match &self.aggregate {
            Some(aggregate) => aggregate
                .group_by
                .iter()
                .map(|k| k.name.as_str())
                .chain(aggregate.measures.iter().map(|m| m.name.as_str()))
                .collect(),
            None => self.projections.iter().map(|p| p.name.as_str()).collect(),
        }
    }

    pub fn is_aggregated(&self) -> bool {
        self.aggregate.is_some()
    }

    /// SHA256 over the plan's JSON form.
    pub fn fingerprint(&self) -> PlanResult<String> {
        compute_hash(self).map_err(|e| PlanError::Fingerprint(e.to_string()))
    }

    /// Human-readable rendering, one stage per line.
    pub fn explain(&self) -> String {
        let mut lines = Vec::new();
        for stage in self.stages() {
            match stage {
                Stage::Scan(table) => lines.push(format!("Scan: {}", table)),
                Stage::Join(join) if join.join_type.takes_criteria() => lines.push(format!(
                    "Join: {} {} ON {}",
                    join.join_type, join.table, join.criteria
                )),
                Stage::Join(join) => lines.push(format!("Join: {} {}", join.join_type, join.table)),
                Stage::Project(projections) => lines.push(format!(
                    "Project: {}",
                    joined(projections.iter(), ", ")
                )),
                Stage::Filter(predicates) => {
                    lines.push(format!("Filter: {}", joined(predicates.iter(), " AND ")))
                }
                Stage::Aggregate(aggregate) => {
                    lines.push(format!(
                        "Aggregate: by {}",
                        joined(aggregate.group_by.iter(), ", ")
                    ));
                    lines.extend(aggregate.measures.iter().map(|m| format!("  {}", m)));
                }
            }
        }
        lines.join("\n")
    }
}

fn joined<T: fmt::Display>(items: impl Iterator<Item = T>, sep: &str) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(sep)
}
