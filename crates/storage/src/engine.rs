//! Database lifecycle and transaction handles.
//!
//! [`Engine`] owns the single redb database file. Opening it idempotently
//! ensures every table exists, so read transactions never observe a
//! missing table. No other component opens or closes the file; clones
//! share the same underlying database through an `Arc`.
//!
//! redb makes each commit durable at commit time and releases the file
//! lock when the last handle drops, so dropping the final `Engine` (or
//! `Store`) is the close operation. A second process opening the same
//! file fails on the engine's file lock rather than corrupting data.

use std::path::Path;
use std::sync::Arc;

use redb::backends::InMemoryBackend;
use redb::{Database, ReadTransaction, WriteTransaction};
use snafu::ResultExt;

use crate::error::{BeginSnafu, CommitSnafu, OpenSnafu, Result, TableSnafu};
use crate::tables::Tables;

/// Handle to the storage engine.
pub struct Engine {
    db: Arc<Database>,
}

impl Engine {
    /// Opens (or creates) the database at `path` and ensures all tables
    /// exist. Safe to repeat; never destructive.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`](crate::StoreError::Open) if the file
    /// cannot be opened or created, or the table-creation transaction
    /// errors it encounters.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Database::create(path)
            .context(OpenSnafu { path: path.display().to_string() })?;

        let engine = Self { db: Arc::new(db) };
        engine.ensure_tables()?;
        Ok(engine)
    }

    /// Creates an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`](crate::StoreError::Open) if the
    /// in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .context(OpenSnafu { path: ":memory:".to_string() })?;

        let engine = Self { db: Arc::new(db) };
        engine.ensure_tables()?;
        Ok(engine)
    }

    /// Opens every table once inside a single write transaction so later
    /// reads never fail on a missing table.
    fn ensure_tables(&self) -> Result<()> {
        let txn = self.begin_write()?;
        {
            txn.open_table(Tables::HOOKS).context(TableSnafu { table: "hooks" })?;
            txn.open_table(Tables::HOOKS_TTL).context(TableSnafu { table: "hooks_ttl" })?;
            txn.open_table(Tables::REQUESTS).context(TableSnafu { table: "requests" })?;
            txn.open_table(Tables::REQUESTS_TTL)
                .context(TableSnafu { table: "requests_ttl" })?;
            txn.open_table(Tables::COUNTERS).context(TableSnafu { table: "counters" })?;
        }
        txn.commit().context(CommitSnafu)
    }

    /// Begins a read transaction (consistent snapshot).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Begin`](crate::StoreError::Begin) if the
    /// transaction cannot be started.
    pub fn begin_read(&self) -> Result<ReadTransaction> {
        self.db.begin_read().context(BeginSnafu)
    }

    /// Begins a write transaction. At most one write transaction commits
    /// at a time; readers are never blocked.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Begin`](crate::StoreError::Begin) if the
    /// transaction cannot be started.
    pub fn begin_write(&self) -> Result<WriteTransaction> {
        self.db.begin_write().context(BeginSnafu)
    }
}

impl Clone for Engine {
    fn clone(&self) -> Self {
        Self { db: Arc::clone(&self.db) }
    }
}
