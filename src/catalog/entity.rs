//! Capability traits over raw catalog entities.
//!
//! Accessors borrow from the host-owned object and are only valid for the
//! duration of the hook call. Everything the pipeline keeps is copied out by
//! [`crate::domain::normalizer`].

/// Iterator over `(key, value)` parameter pairs borrowed from an entity.
pub type ParameterIter<'a> = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

/// A single column definition.
pub trait RawFieldSchema: Send + Sync {
    /// Column name.
    fn name(&self) -> &str;

    /// Column type string as reported by the catalog (e.g. `"int"`,
    /// `"array<string>"`).
    fn type_name(&self) -> &str;

    /// Free-text column comment, if any.
    fn comment(&self) -> Option<&str>;
}

/// Physical storage of a table: location and ordered columns.
pub trait RawStorageDescriptor: Send + Sync {
    /// Storage location URI.
    fn location(&self) -> Option<&str>;

    /// Columns in catalog order.
    fn columns(&self) -> Vec<&dyn RawFieldSchema>;
}

/// A catalog database.
pub trait RawDatabase: Send + Sync {
    /// Database name.
    fn name(&self) -> &str;

    /// Optional description.
    fn description(&self) -> Option<&str>;

    /// Default location for tables of this database.
    fn location_uri(&self) -> Option<&str>;

    /// Owning principal.
    fn owner_name(&self) -> Option<&str>;

    /// Free-form key/value parameters.
    fn parameters(&self) -> ParameterIter<'_>;
}

/// A catalog table.
pub trait RawTable: Send + Sync {
    /// Table name.
    fn table_name(&self) -> &str;

    /// Name of the database owning the table.
    fn db_name(&self) -> &str;

    /// Owning principal.
    fn owner(&self) -> Option<&str>;

    /// Creation time in epoch seconds.
    fn create_time(&self) -> i32;

    /// Last access time in epoch seconds.
    fn last_access_time(&self) -> i32;

    /// Retention period.
    fn retention(&self) -> i32;

    /// Storage descriptor. `None` only for malformed tables.
    fn storage_descriptor(&self) -> Option<&dyn RawStorageDescriptor>;

    /// Free-form key/value parameters.
    fn parameters(&self) -> ParameterIter<'_>;
}
