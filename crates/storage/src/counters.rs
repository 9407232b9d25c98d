//! The counter ledger.
//!
//! Per-collection counts maintained inside the same transaction as every
//! primary insert and delete, giving O(1) size queries without scanning.
//! Decrements saturate at zero: the ledger never goes negative, and an
//! attempted underflow is logged as drift.

use redb::{ReadableTable, Table};
use tracing::warn;

use crate::keys;

/// Identifies a counted collection in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Hook records.
    Hooks,
    /// Captured request records (across all hooks).
    Requests,
}

impl Collection {
    /// The ledger key and table name for this collection.
    pub const fn as_str(self) -> &'static str {
        match self {
            Collection::Hooks => "hooks",
            Collection::Requests => "requests",
        }
    }
}

type CountersTable<'txn> = Table<'txn, &'static str, &'static [u8]>;

/// Reads the current count; absent entries read as zero.
pub(crate) fn read(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    collection: Collection,
) -> Result<u64, redb::StorageError> {
    let count = table
        .get(collection.as_str())?
        .map_or(0, |guard| keys::decode_count(guard.value()));
    Ok(count)
}

/// Adds `n` to the collection's count. Caller's write transaction.
pub(crate) fn increment(
    table: &mut CountersTable<'_>,
    collection: Collection,
    n: u64,
) -> Result<(), redb::StorageError> {
    let current = read(table, collection)?;
    let updated = keys::encode_count(current.saturating_add(n));
    table.insert(collection.as_str(), &updated[..])?;
    Ok(())
}

/// Subtracts `n` from the collection's count, clamping at zero.
/// Caller's write transaction.
pub(crate) fn decrement(
    table: &mut CountersTable<'_>,
    collection: Collection,
    n: u64,
) -> Result<(), redb::StorageError> {
    if n == 0 {
        return Ok(());
    }

    let current = read(table, collection)?;
    if n > current {
        warn!(
            collection = collection.as_str(),
            ledger = current,
            delta = n,
            "counter underflow clamped to zero"
        );
    }

    let updated = keys::encode_count(current.saturating_sub(n));
    table.insert(collection.as_str(), &updated[..])?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::tables::Tables;

    fn with_counters<R>(f: impl FnOnce(&mut CountersTable<'_>) -> R) -> R {
        let engine = Engine::open_in_memory().expect("open");
        let txn = engine.begin_write().expect("write txn");
        let result = {
            let mut table = txn.open_table(Tables::COUNTERS).expect("table");
            f(&mut table)
        };
        txn.commit().expect("commit");
        result
    }

    #[test]
    fn absent_counter_reads_zero() {
        with_counters(|table| {
            assert_eq!(read(table, Collection::Hooks).unwrap(), 0);
        });
    }

    #[test]
    fn increment_accumulates() {
        with_counters(|table| {
            increment(table, Collection::Hooks, 1).unwrap();
            increment(table, Collection::Hooks, 2).unwrap();
            assert_eq!(read(table, Collection::Hooks).unwrap(), 3);
        });
    }

    #[test]
    fn collections_are_independent() {
        with_counters(|table| {
            increment(table, Collection::Hooks, 5).unwrap();
            increment(table, Collection::Requests, 2).unwrap();

            assert_eq!(read(table, Collection::Hooks).unwrap(), 5);
            assert_eq!(read(table, Collection::Requests).unwrap(), 2);
        });
    }

    #[test]
    fn decrement_subtracts() {
        with_counters(|table| {
            increment(table, Collection::Requests, 10).unwrap();
            decrement(table, Collection::Requests, 4).unwrap();
            assert_eq!(read(table, Collection::Requests).unwrap(), 6);
        });
    }

    #[test]
    fn decrement_clamps_at_zero() {
        with_counters(|table| {
            increment(table, Collection::Hooks, 2).unwrap();
            decrement(table, Collection::Hooks, 5).unwrap();
            assert_eq!(read(table, Collection::Hooks).unwrap(), 0);
        });
    }

    #[test]
    fn decrement_zero_is_noop() {
        with_counters(|table| {
            decrement(table, Collection::Hooks, 0).unwrap();
            assert_eq!(read(table, Collection::Hooks).unwrap(), 0);
        });
    }
}
