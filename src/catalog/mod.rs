//! Catalog-side view of metastore entities.
//!
//! The listener never depends on a specific metastore SDK. Instead it reads
//! entities through the small capability traits in [`entity`], which a host
//! implements for its own database/table objects. The owned structs in
//! [`model`] implement the same traits and deserialize from the Thrift-JSON
//! field naming used by the Hive metastore, for hosts without their own
//! types.

pub mod entity;
pub mod model;

pub use entity::{RawDatabase, RawFieldSchema, RawStorageDescriptor, RawTable};
pub use model::{Database, FieldSchema, StorageDescriptor, Table};
