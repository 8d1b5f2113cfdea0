//! Serialization-ready snapshots of catalog entities.
//!
//! Snapshots are owned, deep copies taken at event time. Field names are part
//! of the wire contract with downstream consumers and must not change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Snapshot of a single column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchemaSnapshot {
    /// Column name.
    pub name: String,
    /// Column type string.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Column comment; empty when the catalog has none.
    pub comment: String,
}

/// Snapshot of a table's storage descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDescriptorSnapshot {
    /// Storage location URI.
    pub location: Option<String>,
    /// Columns, in catalog order.
    pub cols: Vec<FieldSchemaSnapshot>,
}

impl StorageDescriptorSnapshot {
    /// Returns `true` when the descriptor carries no location and no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.cols.is_empty()
    }
}

/// Snapshot of a database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSnapshot {
    /// Database name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Default table location.
    pub location_uri: Option<String>,
    /// Owning principal.
    pub owner_name: Option<String>,
    /// Parameters, sorted by key.
    pub parameters: BTreeMap<String, String>,
}

/// Snapshot of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot {
    /// Table name.
    pub table_name: String,
    /// Owning database name.
    pub db_name: String,
    /// Owning principal.
    pub owner: Option<String>,
    /// Creation time in epoch seconds.
    pub create_time: i32,
    /// Last access time in epoch seconds.
    pub last_access_time: i32,
    /// Retention period.
    pub retention: i32,
    /// Storage descriptor.
    pub sd: StorageDescriptorSnapshot,
    /// Parameters, sorted by key.
    pub parameters: BTreeMap<String, String>,
}
