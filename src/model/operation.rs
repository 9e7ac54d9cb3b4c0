//! Time-comparison operations wrapping a slice element.
//!
//! Operations are never stored. Their name and label are derived from the
//! wrapped element on every call, so renaming the element renames the
//! operation with it.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::element::SliceElement;

/// Comparison period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OperationKind {
    /// Week over week.
    WoW,
    /// Month over month.
    MoM,
    /// Year over year.
    YoY,
}

impl OperationKind {
    /// Tag used in labels, e.g. `WoW`.
    pub fn tag(&self) -> &'static str {
        match self {
            OperationKind::WoW => "WoW",
            OperationKind::MoM => "MoM",
            OperationKind::YoY => "YoY",
        }
    }

    /// Prefix used in generated names, e.g. `wow`.
    pub fn prefix(&self) -> &'static str {
        match self {
            OperationKind::WoW => "wow",
            OperationKind::MoM => "mom",
            OperationKind::YoY => "yoy",
        }
    }

    /// Length of the comparison period in days, as handed to executors.
    pub fn period_days(&self) -> u32 {
        match self {
            OperationKind::WoW => 7,
            OperationKind::MoM => 30,
            OperationKind::YoY => 365,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A time-comparison applied to one element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub element: SliceElement,
}

impl Operation {
    pub fn new(kind: OperationKind, element: impl AsRef<SliceElement>) -> Self {
        Self {
            kind,
            element: element.as_ref().clone(),
        }
    }

    pub fn wow(element: impl AsRef<SliceElement>) -> Self {
        Self::new(OperationKind::WoW, element)
    }

    pub fn mom(element: impl AsRef<SliceElement>) -> Self {
        Self::new(OperationKind::MoM, element)
    }

    pub fn yoy(element: impl AsRef<SliceElement>) -> Self {
        Self::new(OperationKind::YoY, element)
    }

    /// `<prefix>_<element name>`, e.g. `wow_rev`.
    pub fn name(&self) -> String {
        format!("{}_{}", self.kind.prefix(), self.element.name)
    }

    /// `<Tag>(<element label>)`, e.g. `WoW(Revenue)`.
    pub fn label(&self) -> String {
        format!("{}({})", self.kind.tag(), self.element.display_label())
    }
}
