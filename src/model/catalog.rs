//! Catalog entities: maintainers, datasets, schemas, tables, columns and
//! the versioned table definitions that bind columns to tables.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{new_record_id, Descriptor, Lifecycle, RecordId, Stewardship};

/// Error returned when a vendor name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported vendor: {0}. Supported: postgres, mysql, vertica, hdfs, hive, spark")]
pub struct UnknownVendor(pub String);

/// Storage engine behind a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Postgres,
    Mysql,
    Vertica,
    Hdfs,
    Hive,
    Spark,
}

impl Vendor {
    /// Parse vendor from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, UnknownVendor> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Vendor::Postgres),
            "mysql" => Ok(Vendor::Mysql),
            "vertica" => Ok(Vendor::Vertica),
            "hdfs" => Ok(Vendor::Hdfs),
            "hive" => Ok(Vendor::Hive),
            "spark" => Ok(Vendor::Spark),
            other => Err(UnknownVendor(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Postgres => "postgres",
            Vendor::Mysql => "mysql",
            Vendor::Vertica => "vertica",
            Vendor::Hdfs => "hdfs",
            Vendor::Hive => "hive",
            Vendor::Spark => "spark",
        }
    }

    /// Conventional listening port for this vendor.
    pub fn default_port(&self) -> u16 {
        match self {
            Vendor::Postgres => 5432,
            Vendor::Mysql => 3306,
            Vendor::Vertica => 5433,
            Vendor::Hdfs => 8020,
            Vendor::Hive => 10000,
            Vendor::Spark => 7077,
        }
    }

    /// Whether the vendor belongs to the Hadoop family.
    pub fn is_hadoop(&self) -> bool {
        matches!(self, Vendor::Hdfs | Vendor::Hive | Vendor::Spark)
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The person or team responsible for catalog entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    pub id: RecordId,
    pub name: String,
}

impl Maintainer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_record_id(),
            name: name.into(),
        }
    }
}

/// A remote storage system; root of a catalog tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    pub id: RecordId,
    #[serde(flatten)]
    pub info: Descriptor,
    pub vendor: Vendor,
    pub host: String,
    pub port: u16,
    #[serde(flatten)]
    pub stewardship: Stewardship,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl DataSet {
    /// Create a dataset listening on the vendor's default port.
    pub fn new(
        name: impl Into<String>,
        vendor: Vendor,
        host: impl Into<String>,
        maintainer: RecordId,
    ) -> Self {
        Self {
            id: new_record_id(),
            info: Descriptor::new(name),
            vendor,
            host: host.into(),
            port: vendor.default_port(),
            stewardship: Stewardship { maintainer },
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }
}

impl fmt::Display for DataSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.info.name, self.vendor)
    }
}

/// A schema inside exactly one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub id: RecordId,
    #[serde(flatten)]
    pub info: Descriptor,
    pub dataset: RecordId,
    #[serde(flatten)]
    pub stewardship: Stewardship,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl Schema {
    pub fn new(name: impl Into<String>, dataset: RecordId, maintainer: RecordId) -> Self {
        Self {
            id: new_record_id(),
            info: Descriptor::new(name),
            dataset,
            stewardship: Stewardship { maintainer },
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.info.name)
    }
}

/// A table inside exactly one schema.
///
/// `definition` points at the active entry of the table's definition chain
/// and is only ever moved by the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: RecordId,
    #[serde(flatten)]
    pub info: Descriptor,
    pub schema: RecordId,
    /// Name of the owning schema, kept for display.
    pub schema_name: String,
    #[serde(flatten)]
    pub stewardship: Stewardship,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
    pub definition: Option<RecordId>,
}

impl Table {
    pub fn new(name: impl Into<String>, schema: &Schema, maintainer: RecordId) -> Self {
        Self {
            id: new_record_id(),
            info: Descriptor::new(name),
            schema: schema.id,
            schema_name: schema.info.name.clone(),
            stewardship: Stewardship { maintainer },
            lifecycle: Lifecycle::new(),
            definition: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema_name, self.info.name)
    }
}

/// A column; shared between table definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: RecordId,
    #[serde(flatten)]
    pub info: Descriptor,
    pub data_type: String,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            id: new_record_id(),
            info: Descriptor::new(name),
            data_type: data_type.into(),
            lifecycle: Lifecycle::new(),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.info.name)
    }
}

/// One version of a table's column set.
///
/// Column membership is compared as a set: two definitions listing the
/// same columns in a different order are the same definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub id: RecordId,
    pub table: RecordId,
    pub created_at: DateTime<Utc>,
    pub columns: BTreeSet<RecordId>,
    pub version_num: u32,
    pub previous: Option<RecordId>,
}

impl TableDefinition {
    /// Whether this definition lists exactly `columns`.
    pub fn has_columns(&self, columns: &BTreeSet<RecordId>) -> bool {
        &self.columns == columns
    }
}

impl fmt::Display for TableDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> version number {}", self.table, self.version_num)
    }
}
