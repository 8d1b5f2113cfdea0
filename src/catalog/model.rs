//! Owned catalog entities.
//!
//! Field names follow the Hive metastore Thrift-JSON shape (`dbName`,
//! `tableName`, `sd`, `cols`, ...) so hosts can hand over a JSON dump of
//! their objects directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::entity::{
    ParameterIter, RawDatabase, RawFieldSchema, RawStorageDescriptor, RawTable,
};

/// Column definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Column name.
    pub name: String,
    /// Column type string.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Optional comment.
    #[serde(default)]
    pub comment: Option<String>,
}

impl FieldSchema {
    /// Creates a column with the given name, type and optional comment.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        comment: Option<&str>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            comment: comment.map(str::to_string),
        }
    }
}

/// Storage descriptor: location plus ordered columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDescriptor {
    /// Storage location URI.
    #[serde(default)]
    pub location: Option<String>,
    /// Columns in catalog order.
    #[serde(default)]
    pub cols: Vec<FieldSchema>,
}

/// Catalog database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    /// Database name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Default table location.
    #[serde(default)]
    pub location_uri: Option<String>,
    /// Owning principal.
    #[serde(default)]
    pub owner_name: Option<String>,
    /// Key/value parameters.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

impl Database {
    /// Creates a database with only its name set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Catalog table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Table name.
    pub table_name: String,
    /// Owning database name.
    pub db_name: String,
    /// Owning principal.
    #[serde(default)]
    pub owner: Option<String>,
    /// Creation time in epoch seconds.
    #[serde(default)]
    pub create_time: i32,
    /// Last access time in epoch seconds.
    #[serde(default)]
    pub last_access_time: i32,
    /// Retention period.
    #[serde(default)]
    pub retention: i32,
    /// Storage descriptor.
    #[serde(default)]
    pub sd: Option<StorageDescriptor>,
    /// Key/value parameters.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

impl Table {
    /// Creates a table in `db_name` with an empty storage descriptor.
    #[must_use]
    pub fn new(db_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            db_name: db_name.into(),
            sd: Some(StorageDescriptor::default()),
            ..Self::default()
        }
    }

    /// Appends a column to the storage descriptor, creating it if absent.
    #[must_use]
    pub fn with_column(mut self, column: FieldSchema) -> Self {
        self.sd.get_or_insert_with(StorageDescriptor::default).cols.push(column);
        self
    }
}

impl RawFieldSchema for FieldSchema {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

impl RawStorageDescriptor for StorageDescriptor {
    fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    fn columns(&self) -> Vec<&dyn RawFieldSchema> {
        self.cols.iter().map(|c| c as &dyn RawFieldSchema).collect()
    }
}

impl RawDatabase for Database {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn location_uri(&self) -> Option<&str> {
        self.location_uri.as_deref()
    }

    fn owner_name(&self) -> Option<&str> {
        self.owner_name.as_deref()
    }

    fn parameters(&self) -> ParameterIter<'_> {
        Box::new(self.parameters.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

impl RawTable for Table {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn db_name(&self) -> &str {
        &self.db_name
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn create_time(&self) -> i32 {
        self.create_time
    }

    fn last_access_time(&self) -> i32 {
        self.last_access_time
    }

    fn retention(&self) -> i32 {
        self.retention
    }

    fn storage_descriptor(&self) -> Option<&dyn RawStorageDescriptor> {
        self.sd.as_ref().map(|sd| sd as &dyn RawStorageDescriptor)
    }

    fn parameters(&self) -> ParameterIter<'_> {
        Box::new(self.parameters.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn table_deserializes_from_thrift_json() {
        let json = r#"{
            "tableName": "orders",
            "dbName": "sales",
            "owner": "hive",
            "createTime": 1580000000,
            "lastAccessTime": 0,
            "retention": 0,
            "sd": {
                "location": "hdfs://nn/warehouse/sales.db/orders",
                "cols": [
                    {"name": "id", "type": "int", "comment": "pk"},
                    {"name": "amount", "type": "decimal(10,2)"}
                ]
            },
            "parameters": {"transient_lastDdlTime": "1580000000"}
        }"#;
        let Ok(table) = serde_json::from_str::<Table>(json) else {
            panic!("table should deserialize");
        };
        assert_eq!(table.table_name(), "orders");
        assert_eq!(table.db_name(), "sales");
        assert_eq!(table.create_time(), 1_580_000_000);
        let Some(sd) = table.storage_descriptor() else {
            panic!("sd should be present");
        };
        let cols = sd.columns();
        assert_eq!(cols.len(), 2);
        assert_eq!(cols.first().map(|c| c.comment()), Some(Some("pk")));
        assert_eq!(cols.get(1).map(|c| c.comment()), Some(None));
    }

    #[test]
    fn with_column_keeps_insertion_order() {
        let table = Table::new("db", "t")
            .with_column(FieldSchema::new("b", "string", None))
            .with_column(FieldSchema::new("a", "int", None));
        let names: Vec<&str> = table
            .sd
            .iter()
            .flat_map(|sd| sd.cols.iter().map(|c| c.name.as_str()))
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn database_parameters_are_exposed() {
        let mut db = Database::new("sales");
        db.parameters.insert("k".to_string(), "v".to_string());
        let params: Vec<(&str, &str)> = RawDatabase::parameters(&db).collect();
        assert_eq!(params, vec![("k", "v")]);
    }
}
