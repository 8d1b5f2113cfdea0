//! Raw catalog entity → snapshot conversion.
//!
//! Every value is copied out of the host-owned entity; nothing borrowed
//! survives the call. Normalization never fails: a table without a storage
//! descriptor is logged and given an empty one, so a malformed entity cannot
//! block the catalog operation that produced it.

use std::collections::BTreeMap;

use crate::catalog::entity::{
    ParameterIter, RawDatabase, RawFieldSchema, RawStorageDescriptor, RawTable,
};

use super::snapshot::{
    DatabaseSnapshot, FieldSchemaSnapshot, StorageDescriptorSnapshot, TableSnapshot,
};

/// Copies a raw database into a [`DatabaseSnapshot`].
#[must_use]
pub fn normalize_database(database: &dyn RawDatabase) -> DatabaseSnapshot {
    DatabaseSnapshot {
        name: database.name().to_string(),
        description: database.description().map(str::to_string),
        location_uri: database.location_uri().map(str::to_string),
        owner_name: database.owner_name().map(str::to_string),
        parameters: collect_parameters(database.parameters()),
    }
}

/// Copies a raw table, including its storage descriptor and columns, into a
/// [`TableSnapshot`].
#[must_use]
pub fn normalize_table(table: &dyn RawTable) -> TableSnapshot {
    let sd = match table.storage_descriptor() {
        Some(sd) => normalize_storage_descriptor(sd),
        None => {
            tracing::warn!(
                db = table.db_name(),
                table = table.table_name(),
                "table has no storage descriptor; publishing an empty one"
            );
            StorageDescriptorSnapshot::default()
        }
    };

    TableSnapshot {
        table_name: table.table_name().to_string(),
        db_name: table.db_name().to_string(),
        owner: table.owner().map(str::to_string),
        create_time: table.create_time(),
        last_access_time: table.last_access_time(),
        retention: table.retention(),
        sd,
        parameters: collect_parameters(table.parameters()),
    }
}

/// Copies a storage descriptor, preserving column order.
#[must_use]
pub fn normalize_storage_descriptor(sd: &dyn RawStorageDescriptor) -> StorageDescriptorSnapshot {
    StorageDescriptorSnapshot {
        location: sd.location().map(str::to_string),
        cols: sd.columns().into_iter().map(normalize_field).collect(),
    }
}

fn normalize_field(field: &dyn RawFieldSchema) -> FieldSchemaSnapshot {
    FieldSchemaSnapshot {
        name: field.name().to_string(),
        type_name: field.type_name().to_string(),
        comment: field.comment().unwrap_or_default().to_string(),
    }
}

fn collect_parameters(params: ParameterIter<'_>) -> BTreeMap<String, String> {
    params
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::catalog::{Database, FieldSchema, StorageDescriptor, Table};

    fn sample_table() -> Table {
        let mut table = Table::new("sales", "orders")
            .with_column(FieldSchema::new("id", "int", Some("pk")))
            .with_column(FieldSchema::new("name", "string", Some("")));
        table.owner = Some("hive".to_string());
        table.create_time = 1_580_000_000;
        table.last_access_time = 1_580_000_100;
        table.retention = 7;
        if let Some(sd) = table.sd.as_mut() {
            sd.location = Some("hdfs://nn/warehouse/sales.db/orders".to_string());
        }
        table
            .parameters
            .insert("last_modified_time".to_string(), "1580000200".to_string());
        table
    }

    #[test]
    fn table_scalars_are_copied_unchanged() {
        let snapshot = normalize_table(&sample_table());
        assert_eq!(snapshot.table_name, "orders");
        assert_eq!(snapshot.db_name, "sales");
        assert_eq!(snapshot.owner.as_deref(), Some("hive"));
        assert_eq!(snapshot.create_time, 1_580_000_000);
        assert_eq!(snapshot.last_access_time, 1_580_000_100);
        assert_eq!(snapshot.retention, 7);
        assert_eq!(
            snapshot.sd.location.as_deref(),
            Some("hdfs://nn/warehouse/sales.db/orders")
        );
        assert_eq!(
            snapshot.parameters.get("last_modified_time").map(String::as_str),
            Some("1580000200")
        );
    }

    #[test]
    fn columns_keep_order_and_content() {
        let snapshot = normalize_table(&sample_table());
        let expected = vec![
            FieldSchemaSnapshot {
                name: "id".to_string(),
                type_name: "int".to_string(),
                comment: "pk".to_string(),
            },
            FieldSchemaSnapshot {
                name: "name".to_string(),
                type_name: "string".to_string(),
                comment: String::new(),
            },
        ];
        assert_eq!(snapshot.sd.cols, expected);
    }

    #[test]
    fn missing_comment_becomes_empty_string() {
        let table = Table::new("db", "t").with_column(FieldSchema::new("c", "bigint", None));
        let snapshot = normalize_table(&table);
        let Some(col) = snapshot.sd.cols.first() else {
            panic!("expected one column");
        };
        assert_eq!(col.comment, "");
    }

    #[test]
    fn missing_storage_descriptor_yields_empty_descriptor() {
        let mut table = Table::new("db", "t");
        table.sd = None;
        let snapshot = normalize_table(&table);
        assert!(snapshot.sd.is_empty());
        assert_eq!(snapshot.table_name, "t");
    }

    #[test]
    fn wide_table_preserves_column_order() {
        let sd = StorageDescriptor {
            location: None,
            cols: (0..64)
                .rev()
                .map(|i| FieldSchema::new(format!("c{i}"), "int", None))
                .collect(),
        };
        let snapshot = normalize_storage_descriptor(&sd);
        let names: Vec<&str> = snapshot.cols.iter().map(|c| c.name.as_str()).collect();
        let expected: Vec<String> = (0..64).rev().map(|i| format!("c{i}")).collect();
        assert_eq!(names, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn database_fields_are_copied() {
        let mut db = Database::new("sales");
        db.description = Some("sales data".to_string());
        db.location_uri = Some("hdfs://nn/warehouse/sales.db".to_string());
        db.owner_name = Some("etl".to_string());
        db.parameters.insert("b".to_string(), "2".to_string());
        db.parameters.insert("a".to_string(), "1".to_string());

        let snapshot = normalize_database(&db);
        assert_eq!(snapshot.name, "sales");
        assert_eq!(snapshot.description.as_deref(), Some("sales data"));
        assert_eq!(
            snapshot.location_uri.as_deref(),
            Some("hdfs://nn/warehouse/sales.db")
        );
        assert_eq!(snapshot.owner_name.as_deref(), Some("etl"));
        let keys: Vec<&str> = snapshot.parameters.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn snapshot_outlives_source_entity() {
        let snapshot = {
            let table = sample_table();
            normalize_table(&table)
        };
        assert_eq!(snapshot.sd.cols.len(), 2);
    }
}
