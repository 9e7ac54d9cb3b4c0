//! Filter descriptors over slice elements.
//!
//! Filters compare structurally: two filters are equal when they are the
//! same variant, target an element with the same name, and carry the same
//! parameters. The element's definition and label do not participate, so
//! a filter survives an element being re-labelled. `Hash` agrees with `Eq`,
//! which lets callers deduplicate filter sets or key caches on them.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::element::{Dimension, Metric, SliceElement};

/// Comparison operator of a [`Filter::Comparison`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Like,
}

impl ComparisonOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "eq",
            ComparisonOp::Ne => "ne",
            ComparisonOp::Gt => "gt",
            ComparisonOp::Lt => "lt",
            ComparisonOp::Gte => "gte",
            ComparisonOp::Lte => "lte",
            ComparisonOp::Like => "like",
        }
    }

    /// Operator symbol as it appears in a predicate.
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "<>",
            ComparisonOp::Gt => ">",
            ComparisonOp::Lt => "<",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Lte => "<=",
            ComparisonOp::Like => "LIKE",
        }
    }
}

/// A literal filter parameter.
///
/// Floats compare and hash by bit pattern so that the type can be `Eq`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl FilterValue {
    fn rank(&self) -> u8 {
        match self {
            FilterValue::Bool(_) => 0,
            FilterValue::Int(_) => 1,
            FilterValue::Float(_) => 2,
            FilterValue::Str(_) => 3,
        }
    }

    /// Order two values of compatible kinds; `None` when they are not comparable.
    pub fn partial_compare(&self, other: &FilterValue) -> Option<Ordering> {
        match (self, other) {
            (FilterValue::Bool(a), FilterValue::Bool(b)) => Some(a.cmp(b)),
            (FilterValue::Int(a), FilterValue::Int(b)) => Some(a.cmp(b)),
            (FilterValue::Float(a), FilterValue::Float(b)) => a.partial_cmp(b),
            (FilterValue::Int(a), FilterValue::Float(b)) => (*a as f64).partial_cmp(b),
            (FilterValue::Float(a), FilterValue::Int(b)) => a.partial_cmp(&(*b as f64)),
            (FilterValue::Str(a), FilterValue::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl PartialEq for FilterValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FilterValue {}

impl PartialOrd for FilterValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FilterValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FilterValue::Bool(a), FilterValue::Bool(b)) => a.cmp(b),
            (FilterValue::Int(a), FilterValue::Int(b)) => a.cmp(b),
            (FilterValue::Float(a), FilterValue::Float(b)) => a.total_cmp(b),
            (FilterValue::Str(a), FilterValue::Str(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for FilterValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            FilterValue::Bool(v) => v.hash(state),
            FilterValue::Int(v) => v.hash(state),
            FilterValue::Float(v) => v.to_bits().hash(state),
            FilterValue::Str(v) => v.hash(state),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Bool(v) => write!(f, "{}", v),
            FilterValue::Int(v) => write!(f, "{}", v),
            FilterValue::Float(v) => write!(f, "{}", v),
            FilterValue::Str(v) => write!(f, "'{}'", v.replace('\'', "''")),
        }
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        FilterValue::Int(v.into())
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Float(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Str(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Str(v)
    }
}

impl AsRef<SliceElement> for SliceElement {
    fn as_ref(&self) -> &SliceElement {
        self
    }
}

impl AsRef<SliceElement> for Dimension {
    fn as_ref(&self) -> &SliceElement {
        &self.element
    }
}

impl AsRef<SliceElement> for Metric {
    fn as_ref(&self) -> &SliceElement {
        &self.element
    }
}

/// A row filter targeting one slice element.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    Comparison {
        element: SliceElement,
        op: ComparisonOp,
        value: FilterValue,
    },
    Contains {
        element: SliceElement,
        values: BTreeSet<FilterValue>,
    },
    Range {
        element: SliceElement,
        start: FilterValue,
        stop: FilterValue,
    },
}

impl Filter {
    pub fn comparison(
        element: impl AsRef<SliceElement>,
        op: ComparisonOp,
        value: impl Into<FilterValue>,
    ) -> Self {
        Filter::Comparison {
            element: element.as_ref().clone(),
            op,
            value: value.into(),
        }
    }

    pub fn contains<V, I>(element: impl AsRef<SliceElement>, values: I) -> Self
    where
        V: Into<FilterValue>,
        I: IntoIterator<Item = V>,
    {
        Filter::Contains {
            element: element.as_ref().clone(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn range(
        element: impl AsRef<SliceElement>,
        start: impl Into<FilterValue>,
        stop: impl Into<FilterValue>,
    ) -> Self {
        Filter::Range {
            element: element.as_ref().clone(),
            start: start.into(),
            stop: stop.into(),
        }
    }

    /// The element this filter targets.
    pub fn element(&self) -> &SliceElement {
        match self {
            Filter::Comparison { element, .. }
            | Filter::Contains { element, .. }
            | Filter::Range { element, .. } => element,
        }
    }

    pub fn element_mut(&mut self) -> &mut SliceElement {
        match self {
            Filter::Comparison { element, .. }
            | Filter::Contains { element, .. }
            | Filter::Range { element, .. } => element,
        }
    }

    fn variant_tag(&self) -> u8 {
        match self {
            Filter::Comparison { .. } => 0,
            Filter::Contains { .. } => 1,
            Filter::Range { .. } => 2,
        }
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        if self.element().name != other.element().name {
            return false;
        }
        match (self, other) {
            (
                Filter::Comparison { op, value, .. },
                Filter::Comparison {
                    op: other_op,
                    value: other_value,
                    ..
                },
            ) => op == other_op && value == other_value,
            (
                Filter::Contains { values, .. },
                Filter::Contains {
                    values: other_values,
                    ..
                },
            ) => values == other_values,
            (
                Filter::Range { start, stop, .. },
                Filter::Range {
                    start: other_start,
                    stop: other_stop,
                    ..
                },
            ) => start == other_start && stop == other_stop,
            _ => false,
        }
    }
}

impl Eq for Filter {}

impl Hash for Filter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.variant_tag().hash(state);
        self.element().name.hash(state);
        match self {
            Filter::Comparison { op, value, .. } => {
                op.hash(state);
                value.hash(state);
            }
            Filter::Contains { values, .. } => values.hash(state),
            Filter::Range { start, stop, .. } => {
                start.hash(state);
                stop.hash(state);
            }
        }
    }
}
