//! Join declarations attaching auxiliary tables to a slice's main table.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::TableRef;

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    #[default]
    Inner,
    Cross,
    Left,
    Outer,
    Semi,
    Anti,
}

impl JoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "inner",
            JoinType::Cross => "cross",
            JoinType::Left => "left",
            JoinType::Outer => "outer",
            JoinType::Semi => "semi",
            JoinType::Anti => "anti",
        }
    }

    /// Cross joins take no predicate.
    pub fn takes_criteria(&self) -> bool {
        !matches!(self, JoinType::Cross)
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How `table` attaches to the main table of a slice.
///
/// `criteria` may only read the main table and `table` itself. Joins are
/// pruned table by table, so criteria reading another joined table can
/// end up in a plan without that table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Join {
    pub table: TableRef,
    /// Join predicate, e.g. `orders.cust_id = customers.id`.
    pub criteria: String,
    #[serde(default)]
    pub join_type: JoinType,
}

impl Join {
    pub fn new(table: TableRef, join_type: JoinType, criteria: impl Into<String>) -> Self {
        Self {
            table,
            criteria: criteria.into(),
            join_type,
        }
    }

    pub fn inner(table: TableRef, criteria: impl Into<String>) -> Self {
        Self::new(table, JoinType::Inner, criteria)
    }

    pub fn left(table: TableRef, criteria: impl Into<String>) -> Self {
        Self::new(table, JoinType::Left, criteria)
    }

    pub fn cross(table: TableRef) -> Self {
        Self::new(table, JoinType::Cross, "")
    }
}
