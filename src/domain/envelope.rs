//! Change envelopes: one per catalog mutation.
//!
//! A [`ChangeEnvelope`] pairs a [`ChangePayload`] with the origin host. The
//! payload is a tagged enum, so the `event` discriminant always matches the
//! snapshot(s) it carries. Serialized, an envelope looks like:
//!
//! ```json
//! {
//!   "event": "ALTER_TABLE",
//!   "oldTable": { "tableName": "t1", ... },
//!   "newTable": { "tableName": "t2", ... },
//!   "hostName": "metastore-0"
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::snapshot::{DatabaseSnapshot, TableSnapshot};

/// Version of the envelope wire schema. Sent as a message attribute.
pub const SCHEMA_VERSION: u32 = 1;

/// Kind of catalog mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// A database was created.
    CreateDatabase,
    /// A database was dropped.
    DropDatabase,
    /// A table was created.
    CreateTable,
    /// A table was dropped.
    DropTable,
    /// A table was altered (including renames).
    AlterTable,
}

impl EventKind {
    /// Returns the wire tag for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreateDatabase => "CREATE_DATABASE",
            Self::DropDatabase => "DROP_DATABASE",
            Self::CreateTable => "CREATE_TABLE",
            Self::DropTable => "DROP_TABLE",
            Self::AlterTable => "ALTER_TABLE",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event payload, tagged by `event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ChangePayload {
    /// Payload of [`EventKind::CreateDatabase`].
    CreateDatabase {
        /// The new database.
        database: DatabaseSnapshot,
    },
    /// Payload of [`EventKind::DropDatabase`].
    DropDatabase {
        /// The dropped database.
        database: DatabaseSnapshot,
    },
    /// Payload of [`EventKind::CreateTable`].
    CreateTable {
        /// The new table.
        table: TableSnapshot,
    },
    /// Payload of [`EventKind::DropTable`].
    DropTable {
        /// The dropped table.
        table: TableSnapshot,
    },
    /// Payload of [`EventKind::AlterTable`].
    AlterTable {
        /// Table state before the change.
        old_table: TableSnapshot,
        /// Table state after the change.
        new_table: TableSnapshot,
    },
}

impl ChangePayload {
    /// Returns the kind matching this payload.
    #[must_use]
    pub const fn event_kind(&self) -> EventKind {
        match self {
            Self::CreateDatabase { .. } => EventKind::CreateDatabase,
            Self::DropDatabase { .. } => EventKind::DropDatabase,
            Self::CreateTable { .. } => EventKind::CreateTable,
            Self::DropTable { .. } => EventKind::DropTable,
            Self::AlterTable { .. } => EventKind::AlterTable,
        }
    }

    /// Returns a `db` or `db.table` label for logging.
    #[must_use]
    pub fn subject(&self) -> String {
        match self {
            Self::CreateDatabase { database } | Self::DropDatabase { database } => {
                database.name.clone()
            }
            Self::CreateTable { table } | Self::DropTable { table } => {
                format!("{}.{}", table.db_name, table.table_name)
            }
            Self::AlterTable { new_table, .. } => {
                format!("{}.{}", new_table.db_name, new_table.table_name)
            }
        }
    }
}

/// Immutable, serializable description of one catalog mutation.
///
/// Built through one constructor per event kind; fields are private so the
/// tag cannot drift from the payload after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEnvelope {
    #[serde(flatten)]
    payload: ChangePayload,
    host_name: String,
}

impl ChangeEnvelope {
    /// Envelope for a database creation.
    #[must_use]
    pub fn create_database(database: DatabaseSnapshot, host_name: impl Into<String>) -> Self {
        Self::from_payload(ChangePayload::CreateDatabase { database }, host_name)
    }

    /// Envelope for a database drop.
    #[must_use]
    pub fn drop_database(database: DatabaseSnapshot, host_name: impl Into<String>) -> Self {
        Self::from_payload(ChangePayload::DropDatabase { database }, host_name)
    }

    /// Envelope for a table creation.
    #[must_use]
    pub fn create_table(table: TableSnapshot, host_name: impl Into<String>) -> Self {
        Self::from_payload(ChangePayload::CreateTable { table }, host_name)
    }

    /// Envelope for a table drop.
    #[must_use]
    pub fn drop_table(table: TableSnapshot, host_name: impl Into<String>) -> Self {
        Self::from_payload(ChangePayload::DropTable { table }, host_name)
    }

    /// Envelope for a table alteration.
    #[must_use]
    pub fn alter_table(
        old_table: TableSnapshot,
        new_table: TableSnapshot,
        host_name: impl Into<String>,
    ) -> Self {
        Self::from_payload(
            ChangePayload::AlterTable {
                old_table,
                new_table,
            },
            host_name,
        )
    }

    fn from_payload(payload: ChangePayload, host_name: impl Into<String>) -> Self {
        Self {
            payload,
            host_name: host_name.into(),
        }
    }

    /// Returns the event kind.
    #[must_use]
    pub const fn event_kind(&self) -> EventKind {
        self.payload.event_kind()
    }

    /// Returns the payload.
    #[must_use]
    pub const fn payload(&self) -> &ChangePayload {
        &self.payload
    }

    /// Returns the origin host name.
    #[must_use]
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// Serializes the envelope to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
