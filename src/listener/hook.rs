//! Hook interface invoked by the catalog service.

use async_trait::async_trait;

use crate::catalog::entity::{RawDatabase, RawTable};
use crate::error::HookError;

/// Callbacks fired by the catalog service, one per mutation.
///
/// Each call returns only once the event has been delivered or has failed.
/// An `Err` tells the catalog service to fail the operation that fired it.
#[async_trait]
pub trait MetastoreEventListener: Send + Sync {
    /// A database was created.
    ///
    /// # Errors
    ///
    /// Returns a [`HookError`] if the event could not be delivered and the
    /// listener is configured to fail closed.
    async fn on_create_database(&self, database: &dyn RawDatabase) -> Result<(), HookError>;

    /// A database was dropped.
    ///
    /// # Errors
    ///
    /// See [`MetastoreEventListener::on_create_database`].
    async fn on_drop_database(&self, database: &dyn RawDatabase) -> Result<(), HookError>;

    /// A table was created.
    ///
    /// # Errors
    ///
    /// See [`MetastoreEventListener::on_create_database`].
    async fn on_create_table(&self, table: &dyn RawTable) -> Result<(), HookError>;

    /// A table was dropped.
    ///
    /// # Errors
    ///
    /// See [`MetastoreEventListener::on_create_database`].
    async fn on_drop_table(&self, table: &dyn RawTable) -> Result<(), HookError>;

    /// A table was altered; `old_table` and `new_table` are its state before
    /// and after.
    ///
    /// # Errors
    ///
    /// See [`MetastoreEventListener::on_create_database`].
    async fn on_alter_table(
        &self,
        old_table: &dyn RawTable,
        new_table: &dyn RawTable,
    ) -> Result<(), HookError>;
}
