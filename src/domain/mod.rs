//! Domain layer: snapshots, envelopes, and normalization.
//!
//! Raw catalog entities are normalized into owned snapshots, which are then
//! wrapped into a [`ChangeEnvelope`] tagged with the event kind and origin
//! host.

pub mod envelope;
pub mod normalizer;
pub mod snapshot;

pub use envelope::{ChangeEnvelope, ChangePayload, EventKind, SCHEMA_VERSION};
pub use snapshot::{
    DatabaseSnapshot, FieldSchemaSnapshot, StorageDescriptorSnapshot, TableSnapshot,
};
