//! The TTL index: a secondary, chronologically ordered index used to find
//! entities older than a cutoff without scanning the primary collection.
//!
//! Index keys sort by creation time (see the keys module), so the expiry
//! scan is a single ascending cursor walk that stops at the first entry
//! younger than the cutoff. Entries matched by the scan must be deleted in
//! the same write transaction as their primary entities and the counter
//! adjustment; the scan therefore runs against the write transaction's own
//! view of the index table (collect, then delete).

use chrono::{DateTime, Utc};
use redb::{ReadableTable, Table};

use crate::keys;

/// One expired index entry: the index key to delete and the primary key
/// it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExpiredEntry {
    pub index_key: Vec<u8>,
    pub primary_key: Vec<u8>,
}

/// Writes the index entry for an entity created at `created`.
pub(crate) fn insert_entry(
    table: &mut Table<'_, &'static [u8], &'static [u8]>,
    created: DateTime<Utc>,
    primary_key: &[u8],
) -> Result<(), redb::StorageError> {
    let key = keys::encode_ttl_key(created, primary_key);
    table.insert(key.as_slice(), primary_key)?;
    Ok(())
}

/// Scans the index ascending from its oldest entry, collecting entries
/// whose timestamp prefix is lexicographically ≤ the cutoff's rendering
/// (inclusive boundary). Stops at the first younger key; bounded by
/// `max_batch`.
pub(crate) fn collect_expired<T>(
    table: &T,
    cutoff: DateTime<Utc>,
    max_batch: usize,
) -> Result<Vec<ExpiredEntry>, redb::StorageError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let cutoff_ts = keys::ttl_timestamp(cutoff);
    let mut expired = Vec::new();

    for item in table.iter()? {
        if expired.len() >= max_batch {
            break;
        }

        let (key, value) = item?;
        let key_bytes = key.value();

        match keys::ttl_prefix(key_bytes) {
            // Keys are chronologically ordered, so everything past the
            // cutoff is younger
            Some(prefix) if prefix > cutoff_ts.as_bytes() => break,
            Some(_) => expired.push(ExpiredEntry {
                index_key: key_bytes.to_vec(),
                primary_key: value.value().to_vec(),
            }),
            // Malformed key; never written by this store
            None => continue,
        }
    }

    Ok(expired)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    use crate::engine::Engine;
    use crate::tables::Tables;

    fn populate(engine: &Engine, entries: &[(DateTime<Utc>, &[u8])]) {
        let txn = engine.begin_write().expect("write txn");
        {
            let mut table = txn.open_table(Tables::HOOKS_TTL).expect("table");
            for (created, primary) in entries {
                insert_entry(&mut table, *created, primary).expect("insert");
            }
        }
        txn.commit().expect("commit");
    }

    fn expired_names(engine: &Engine, cutoff: DateTime<Utc>, max_batch: usize) -> Vec<Vec<u8>> {
        let txn = engine.begin_read().expect("read txn");
        let table = txn.open_table(Tables::HOOKS_TTL).expect("table");
        collect_expired(&table, cutoff, max_batch)
            .expect("scan")
            .into_iter()
            .map(|e| e.primary_key)
            .collect()
    }

    #[test]
    fn boundary_is_inclusive_of_cutoff_and_exclusive_of_younger() {
        let engine = Engine::open_in_memory().expect("open");
        let now = Utc::now();

        populate(
            &engine,
            &[
                (now - TimeDelta::hours(10), b"old"),
                (now - TimeDelta::hours(6), b"mid"),
                (now - TimeDelta::hours(2), b"new"),
            ],
        );

        let keys = expired_names(&engine, now - TimeDelta::hours(5), 100);
        assert_eq!(keys, vec![b"old".to_vec(), b"mid".to_vec()]);
    }

    #[test]
    fn entry_exactly_at_cutoff_is_expired() {
        let engine = Engine::open_in_memory().expect("open");
        let cutoff = Utc::now() - TimeDelta::hours(5);

        populate(&engine, &[(cutoff, b"boundary")]);

        let keys = expired_names(&engine, cutoff, 100);
        assert_eq!(keys, vec![b"boundary".to_vec()]);
    }

    #[test]
    fn empty_index_yields_nothing() {
        let engine = Engine::open_in_memory().expect("open");
        assert!(expired_names(&engine, Utc::now(), 100).is_empty());
    }

    #[test]
    fn batch_cap_respected_oldest_first() {
        let engine = Engine::open_in_memory().expect("open");
        let now = Utc::now();

        populate(
            &engine,
            &[
                (now - TimeDelta::hours(4), b"d"),
                (now - TimeDelta::hours(10), b"a"),
                (now - TimeDelta::hours(8), b"b"),
                (now - TimeDelta::hours(6), b"c"),
            ],
        );

        let keys = expired_names(&engine, now, 2);
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn same_instant_entries_all_collected() {
        let engine = Engine::open_in_memory().expect("open");
        let created = Utc::now() - TimeDelta::hours(6);

        populate(&engine, &[(created, b"one"), (created, b"two")]);

        let keys = expired_names(&engine, Utc::now(), 100);
        assert_eq!(keys.len(), 2);
    }
}
