//! Shared field groups embedded by catalog entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of any persisted catalog record.
pub type RecordId = Uuid;

/// Generate a fresh record identifier.
pub fn new_record_id() -> RecordId {
    Uuid::new_v4()
}

/// Publication timestamps plus the soft-delete flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub published_on: DateTime<Utc>,
    pub modified_on: DateTime<Utc>,
    pub is_active: bool,
}

impl Lifecycle {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            published_on: now,
            modified_on: now,
            is_active: true,
        }
    }

    /// Refresh `modified_on`.
    pub fn touch(&mut self) {
        self.modified_on = Utc::now();
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.touch();
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Name and free-form description shared by describable entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Descriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Non-owning reference to the maintainer responsible for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stewardship {
    pub maintainer: RecordId,
}

/// A lightweight handle to a catalog table, as used by elements, joins and plans.
///
/// Identity is the record id; `name` is the qualified display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub id: RecordId,
    pub name: String,
}

impl TableRef {
    pub fn new(id: RecordId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
