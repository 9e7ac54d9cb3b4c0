//! Slice elements: the named, reusable expressions a slice exposes.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::TableRef;

static ELEMENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Fields shared by dimensions and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SliceElement {
    pub name: String,
    /// Human label; falls back to `name` when empty.
    #[serde(default)]
    pub label: String,
    /// Query fragment computing the element.
    pub definition: String,
    /// Tables the definition reads from.
    #[serde(default)]
    pub tables: BTreeSet<TableRef>,
    #[serde(default)]
    pub description: String,
}

impl SliceElement {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            definition: definition.into(),
            tables: BTreeSet::new(),
            description: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_table(mut self, table: TableRef) -> Self {
        self.tables.insert(table);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The label to show for this element.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    /// Whether `name` is usable as an output column name.
    pub fn has_valid_name(&self) -> bool {
        ELEMENT_NAME.is_match(&self.name)
    }
}

impl fmt::Display for SliceElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_label())
    }
}

/// Value family of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionType {
    Bool,
    Numeric,
    Datetime,
    Categorical,
    Unique,
}

/// A dimension: an element usable for projection, grouping and filtering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    #[serde(flatten)]
    pub element: SliceElement,
    /// Expression producing the grouping key.
    pub id_definition: String,
    pub data_type: DimensionType,
}

impl Dimension {
    /// Create a dimension whose grouping key is its own definition.
    pub fn new(
        name: impl Into<String>,
        definition: impl Into<String>,
        data_type: DimensionType,
    ) -> Self {
        let element = SliceElement::new(name, definition);
        Self {
            id_definition: element.definition.clone(),
            element,
            data_type,
        }
    }

    pub fn with_id_definition(mut self, id_definition: impl Into<String>) -> Self {
        self.id_definition = id_definition.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.element = self.element.with_label(label);
        self
    }

    pub fn with_table(mut self, table: TableRef) -> Self {
        self.element = self.element.with_table(table);
        self
    }

    pub fn name(&self) -> &str {
        &self.element.name
    }
}

/// A metric: either a raw per-row value or an aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metric {
    #[serde(flatten)]
    pub element: SliceElement,
    /// The definition is an analytic (window) function.
    #[serde(default)]
    pub is_analytic: bool,
    /// The definition aggregates rows and needs a group-by.
    #[serde(default)]
    pub is_aggregation: bool,
}

impl Metric {
    /// A raw per-row metric.
    pub fn value(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            element: SliceElement::new(name, definition),
            is_analytic: false,
            is_aggregation: false,
        }
    }

    /// An aggregation metric.
    pub fn aggregation(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            is_aggregation: true,
            ..Self::value(name, definition)
        }
    }

    pub fn analytic(mut self) -> Self {
        self.is_analytic = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.element = self.element.with_label(label);
        self
    }

    pub fn with_table(mut self, table: TableRef) -> Self {
        self.element = self.element.with_table(table);
        self
    }

    pub fn name(&self) -> &str {
        &self.element.name
    }
}
