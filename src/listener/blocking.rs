//! Synchronous facade for hosts that fire hooks from plain threads.
//!
//! Catalog services typically run their hooks on request threads and need
//! the hook to block until delivery completes. [`BlockingListener`] owns a
//! multi-threaded runtime and drives the async listener to completion on the
//! calling thread. It must not be called from inside an async runtime.

use std::io;

use tokio::runtime::{Builder, Runtime};

use super::hook::MetastoreEventListener;
use crate::catalog::entity::{RawDatabase, RawTable};
use crate::error::HookError;

/// Blocking adapter around any [`MetastoreEventListener`].
#[derive(Debug)]
pub struct BlockingListener<L> {
    inner: L,
    runtime: Runtime,
}

impl<L: MetastoreEventListener> BlockingListener<L> {
    /// Wraps `inner`, starting a dedicated runtime for its I/O.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the runtime cannot be started.
    pub fn new(inner: L) -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("metastore-listener")
            .enable_all()
            .build()?;
        Ok(Self { inner, runtime })
    }

    /// Returns the wrapped listener.
    #[must_use]
    pub const fn inner(&self) -> &L {
        &self.inner
    }

    /// Blocking [`MetastoreEventListener::on_create_database`].
    ///
    /// # Errors
    ///
    /// Propagates the listener's [`HookError`].
    pub fn on_create_database(&self, database: &dyn RawDatabase) -> Result<(), HookError> {
        self.runtime.block_on(self.inner.on_create_database(database))
    }

    /// Blocking [`MetastoreEventListener::on_drop_database`].
    ///
    /// # Errors
    ///
    /// Propagates the listener's [`HookError`].
    pub fn on_drop_database(&self, database: &dyn RawDatabase) -> Result<(), HookError> {
        self.runtime.block_on(self.inner.on_drop_database(database))
    }

    /// Blocking [`MetastoreEventListener::on_create_table`].
    ///
    /// # Errors
    ///
    /// Propagates the listener's [`HookError`].
    pub fn on_create_table(&self, table: &dyn RawTable) -> Result<(), HookError> {
        self.runtime.block_on(self.inner.on_create_table(table))
    }

    /// Blocking [`MetastoreEventListener::on_drop_table`].
    ///
    /// # Errors
    ///
    /// Propagates the listener's [`HookError`].
    pub fn on_drop_table(&self, table: &dyn RawTable) -> Result<(), HookError> {
        self.runtime.block_on(self.inner.on_drop_table(table))
    }

    /// Blocking [`MetastoreEventListener::on_alter_table`].
    ///
    /// # Errors
    ///
    /// Propagates the listener's [`HookError`].
    pub fn on_alter_table(
        &self,
        old_table: &dyn RawTable,
        new_table: &dyn RawTable,
    ) -> Result<(), HookError> {
        self.runtime.block_on(self.inner.on_alter_table(old_table, new_table))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::catalog::{Database, Table};
    use crate::domain::EventKind;
    use crate::error::{BusError, PublishError};

    #[derive(Debug, Default)]
    struct CountingListener {
        calls: AtomicUsize,
    }

    impl CountingListener {
        fn bump(&self) -> Result<(), HookError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl MetastoreEventListener for CountingListener {
        async fn on_create_database(&self, _: &dyn RawDatabase) -> Result<(), HookError> {
            self.bump()
        }

        async fn on_drop_database(&self, _: &dyn RawDatabase) -> Result<(), HookError> {
            Err(HookError::new(
                EventKind::DropDatabase,
                1,
                PublishError::PublishFailure {
                    topic: "t".to_string(),
                    source: BusError::Transport("down".to_string()),
                },
            ))
        }

        async fn on_create_table(&self, _: &dyn RawTable) -> Result<(), HookError> {
            tokio::task::yield_now().await;
            self.bump()
        }

        async fn on_drop_table(&self, _: &dyn RawTable) -> Result<(), HookError> {
            self.bump()
        }

        async fn on_alter_table(
            &self,
            _: &dyn RawTable,
            _: &dyn RawTable,
        ) -> Result<(), HookError> {
            self.bump()
        }
    }

    #[test]
    fn blocks_until_hook_completes() {
        let Ok(listener) = BlockingListener::new(CountingListener::default()) else {
            panic!("runtime should start");
        };
        let table = Table::new("db", "t");

        assert!(listener.on_create_database(&Database::new("db")).is_ok());
        assert!(listener.on_create_table(&table).is_ok());
        assert!(listener.on_drop_table(&table).is_ok());
        assert!(listener.on_alter_table(&table, &table).is_ok());
        assert_eq!(listener.inner().calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn hook_errors_propagate() {
        let Ok(listener) = BlockingListener::new(CountingListener::default()) else {
            panic!("runtime should start");
        };
        let result = listener.on_drop_database(&Database::new("db"));
        let Err(err) = result else {
            panic!("expected failure");
        };
        assert_eq!(err.event, EventKind::DropDatabase);
    }

    #[test]
    fn usable_from_many_host_threads() {
        let Ok(listener) = BlockingListener::new(CountingListener::default()) else {
            panic!("runtime should start");
        };
        let listener = Arc::new(listener);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let listener = Arc::clone(&listener);
                std::thread::spawn(move || {
                    listener.on_create_table(&Table::new("db", format!("t{i}")))
                })
            })
            .collect();
        for handle in handles {
            let Ok(result) = handle.join() else {
                panic!("host thread panicked");
            };
            assert!(result.is_ok());
        }
        assert_eq!(listener.inner().calls.load(Ordering::SeqCst), 8);
    }
}
