//! The store facade.
//!
//! Every operation here is a single engine transaction: a hook or request
//! insert writes the primary record, its TTL index entry, and the counter
//! adjustment together, and a sweep deletes index entries, primary
//! entities, and counter adjustments together. Partial writes are never
//! observable, and a crash between sweeps cannot orphan primary data
//! behind a missing index entry.

use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};
use redb::{ReadableTable, ReadableTableMetadata};
use snafu::{ensure, OptionExt, ResultExt};

use hookbin_types::{codec, Hook, Request};

use crate::counters::{self, Collection};
use crate::engine::Engine;
use crate::error::{
    CodecSnafu, CommitSnafu, NotFoundSnafu, Result, StorageSnafu, TableSnafu, ValidationSnafu,
};
use crate::keys;
use crate::tables::Tables;
use crate::ttl;

/// Handle to the hookbin store. Cheap to clone; all clones share the
/// same underlying database.
#[derive(Clone)]
pub struct Store {
    engine: Engine,
}

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Hooks deleted by their own TTL.
    pub hooks_removed: u64,
    /// Requests deleted, by their own TTL or by hook cascade.
    pub requests_removed: u64,
}

impl SweepStats {
    /// Total entities removed.
    pub fn total(&self) -> u64 {
        self.hooks_removed + self.requests_removed
    }
}

/// A ledger entry that disagrees with the live key count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterDrift {
    /// The collection whose ledger drifted.
    pub collection: Collection,
    /// The ledger-recorded count.
    pub ledger: u64,
    /// The actual number of live keys.
    pub actual: u64,
}

impl Store {
    /// Opens (or creates) the store at `path`, ensuring all collections
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`](crate::StoreError::Open) if the
    /// database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self { engine: Engine::open(path)? })
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`](crate::StoreError::Open) if the
    /// in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self { engine: Engine::open_in_memory()? })
    }

    /// Saves a hook: primary record, TTL index entry, and counter
    /// increment in one transaction.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty or NUL-bearing name, a
    /// codec error if serialization fails, or an engine error if the
    /// transaction cannot complete — in which case nothing is persisted.
    pub fn put_hook(&self, hook: &Hook) -> Result<()> {
        validate_name("hook", &hook.name)?;
        let doc = codec::encode(hook).context(CodecSnafu { what: "hook" })?;

        let txn = self.engine.begin_write()?;
        {
            let mut hooks_table =
                txn.open_table(Tables::HOOKS).context(TableSnafu { table: "hooks" })?;
            let replaced = hooks_table
                .insert(hook.name.as_str(), doc.as_slice())
                .context(StorageSnafu { table: "hooks" })?
                .is_some();

            let mut ttl_table =
                txn.open_table(Tables::HOOKS_TTL).context(TableSnafu { table: "hooks_ttl" })?;
            ttl::insert_entry(&mut ttl_table, hook.created, hook.name.as_bytes())
                .context(StorageSnafu { table: "hooks_ttl" })?;

            // A name collision overwrites in place; only new keys count
            if !replaced {
                let mut counters_table = txn
                    .open_table(Tables::COUNTERS)
                    .context(TableSnafu { table: "counters" })?;
                counters::increment(&mut counters_table, Collection::Hooks, 1)
                    .context(StorageSnafu { table: "counters" })?;
            }
        }
        txn.commit().context(CommitSnafu)
    }

    /// Returns the hook named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`](crate::StoreError::NotFound) when
    /// the hook does not exist — distinguishable via
    /// [`StoreError::is_not_found`](crate::StoreError::is_not_found).
    pub fn hook(&self, name: &str) -> Result<Hook> {
        let txn = self.engine.begin_read()?;
        let table = txn.open_table(Tables::HOOKS).context(TableSnafu { table: "hooks" })?;

        let doc = table
            .get(name)
            .context(StorageSnafu { table: "hooks" })?
            .context(NotFoundSnafu { collection: "hooks", key: name })?;

        codec::decode(doc.value()).context(CodecSnafu { what: "hook" })
    }

    /// Returns the hook named `name` with its captured requests attached
    /// to the transient `requests` field, newest first. Both reads come
    /// from the same snapshot.
    ///
    /// # Errors
    ///
    /// As [`Store::hook`].
    pub fn hook_with_requests(&self, name: &str) -> Result<Hook> {
        let txn = self.engine.begin_read()?;
        let hooks_table =
            txn.open_table(Tables::HOOKS).context(TableSnafu { table: "hooks" })?;

        let doc = hooks_table
            .get(name)
            .context(StorageSnafu { table: "hooks" })?
            .context(NotFoundSnafu { collection: "hooks", key: name })?;
        let mut hook: Hook = codec::decode(doc.value()).context(CodecSnafu { what: "hook" })?;

        let requests_table =
            txn.open_table(Tables::REQUESTS).context(TableSnafu { table: "requests" })?;
        hook.requests = list_requests_in(&requests_table, name)?;

        Ok(hook)
    }

    /// Returns up to `max` public hooks, newest first. Private hooks
    /// never appear.
    ///
    /// Full scan of the hook collection — O(total hooks), acceptable
    /// because the collection is TTL-bounded.
    pub fn recent_hooks(&self, max: usize) -> Result<Vec<Hook>> {
        let txn = self.engine.begin_read()?;
        let table = txn.open_table(Tables::HOOKS).context(TableSnafu { table: "hooks" })?;

        let mut hooks = Vec::new();
        for item in table.iter().context(StorageSnafu { table: "hooks" })? {
            let (_, doc) = item.context(StorageSnafu { table: "hooks" })?;
            let hook: Hook =
                codec::decode(doc.value()).context(CodecSnafu { what: "hook" })?;
            if !hook.private {
                hooks.push(hook);
            }
        }

        hooks.sort_by(|a, b| b.created.cmp(&a.created));
        hooks.truncate(max);
        Ok(hooks)
    }

    /// Saves a captured request under `hook_name`: primary record, TTL
    /// index entry, and counter increment in one transaction. The hook's
    /// sub-collection comes into existence with its first request.
    ///
    /// The owning hook is deliberately not checked for existence — a
    /// capture never pays a lookup. A request stored for an absent or
    /// concurrently swept hook is unreachable through listings and is
    /// reclaimed by its own TTL entry.
    ///
    /// # Errors
    ///
    /// As [`Store::put_hook`].
    pub fn put_request(&self, hook_name: &str, request: &Request) -> Result<()> {
        validate_name("hook", hook_name)?;
        validate_name("request", &request.name)?;
        let doc = codec::encode(request).context(CodecSnafu { what: "request" })?;
        let key = keys::encode_request_key(hook_name, &request.name);

        let txn = self.engine.begin_write()?;
        {
            let mut requests_table =
                txn.open_table(Tables::REQUESTS).context(TableSnafu { table: "requests" })?;
            let replaced = requests_table
                .insert(key.as_slice(), doc.as_slice())
                .context(StorageSnafu { table: "requests" })?
                .is_some();

            let mut ttl_table = txn
                .open_table(Tables::REQUESTS_TTL)
                .context(TableSnafu { table: "requests_ttl" })?;
            ttl::insert_entry(&mut ttl_table, request.created, &key)
                .context(StorageSnafu { table: "requests_ttl" })?;

            if !replaced {
                let mut counters_table = txn
                    .open_table(Tables::COUNTERS)
                    .context(TableSnafu { table: "counters" })?;
                counters::increment(&mut counters_table, Collection::Requests, 1)
                    .context(StorageSnafu { table: "counters" })?;
            }
        }
        txn.commit().context(CommitSnafu)
    }

    /// Returns the requests captured for `hook_name`, newest first.
    /// A hook with no captures yields an empty vector, not an error.
    pub fn requests(&self, hook_name: &str) -> Result<Vec<Request>> {
        let txn = self.engine.begin_read()?;
        let table =
            txn.open_table(Tables::REQUESTS).context(TableSnafu { table: "requests" })?;
        list_requests_in(&table, hook_name)
    }

    /// Returns the ledger-backed count for a collection. O(1).
    pub fn count(&self, collection: Collection) -> Result<u64> {
        let txn = self.engine.begin_read()?;
        let table =
            txn.open_table(Tables::COUNTERS).context(TableSnafu { table: "counters" })?;
        counters::read(&table, collection).context(StorageSnafu { table: "counters" })
    }

    /// Deletes every hook and request older than `max_age`, measured from
    /// now (UTC). Callable on demand or from the background sweeper.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unrepresentable `max_age`, or the
    /// first engine error encountered; a failed sweep transaction leaves
    /// the store unchanged.
    pub fn sweep(&self, max_age: std::time::Duration) -> Result<SweepStats> {
        self.sweep_at(cutoff_for(max_age)?, crate::sweep::MAX_BATCH_SIZE)
    }

    /// Deletes entities created at or before `cutoff`, at most `max_batch`
    /// per collection. Hook and request lifetimes are swept independently;
    /// sweeping a hook also cascades over its request sub-collection.
    ///
    /// Each collection is swept in one transaction: TTL index entries,
    /// primary entities, and counter decrements commit together.
    pub fn sweep_at(&self, cutoff: DateTime<Utc>, max_batch: usize) -> Result<SweepStats> {
        let (hooks_removed, cascade_removed) = self.sweep_hooks_at(cutoff, max_batch)?;
        let expired_removed = self.sweep_requests_at(cutoff, max_batch)?;

        Ok(SweepStats {
            hooks_removed,
            requests_removed: cascade_removed + expired_removed,
        })
    }

    fn sweep_hooks_at(&self, cutoff: DateTime<Utc>, max_batch: usize) -> Result<(u64, u64)> {
        let txn = self.engine.begin_write()?;

        let expired = {
            let ttl_table = txn
                .open_table(Tables::HOOKS_TTL)
                .context(TableSnafu { table: "hooks_ttl" })?;
            ttl::collect_expired(&ttl_table, cutoff, max_batch)
                .context(StorageSnafu { table: "hooks_ttl" })?
        };
        if expired.is_empty() {
            return Ok((0, 0));
        }

        let mut hooks_removed = 0u64;
        let mut cascade_removed = 0u64;
        {
            let mut ttl_table = txn
                .open_table(Tables::HOOKS_TTL)
                .context(TableSnafu { table: "hooks_ttl" })?;
            let mut hooks_table =
                txn.open_table(Tables::HOOKS).context(TableSnafu { table: "hooks" })?;
            let mut requests_table =
                txn.open_table(Tables::REQUESTS).context(TableSnafu { table: "requests" })?;
            let mut requests_ttl_table = txn
                .open_table(Tables::REQUESTS_TTL)
                .context(TableSnafu { table: "requests_ttl" })?;
            let mut counters_table =
                txn.open_table(Tables::COUNTERS).context(TableSnafu { table: "counters" })?;

            for entry in &expired {
                ttl_table
                    .remove(entry.index_key.as_slice())
                    .context(StorageSnafu { table: "hooks_ttl" })?;

                let Ok(name) = std::str::from_utf8(&entry.primary_key) else {
                    continue;
                };

                if hooks_table
                    .remove(name)
                    .context(StorageSnafu { table: "hooks" })?
                    .is_some()
                {
                    hooks_removed += 1;
                }

                // Cascade: the hook's request range and those requests'
                // own TTL entries go with it
                let prefix = keys::request_prefix(name);
                let owned: Vec<(Vec<u8>, DateTime<Utc>)> = {
                    let mut collected = Vec::new();
                    for item in requests_table
                        .range(prefix.as_slice()..)
                        .context(StorageSnafu { table: "requests" })?
                    {
                        let (key, doc) = item.context(StorageSnafu { table: "requests" })?;
                        if !key.value().starts_with(&prefix) {
                            break;
                        }
                        let request: Request = codec::decode(doc.value())
                            .context(CodecSnafu { what: "request" })?;
                        collected.push((key.value().to_vec(), request.created));
                    }
                    collected
                };

                for (key, created) in owned {
                    requests_table
                        .remove(key.as_slice())
                        .context(StorageSnafu { table: "requests" })?;
                    let ttl_key = keys::encode_ttl_key(created, &key);
                    requests_ttl_table
                        .remove(ttl_key.as_slice())
                        .context(StorageSnafu { table: "requests_ttl" })?;
                    cascade_removed += 1;
                }
            }

            counters::decrement(&mut counters_table, Collection::Hooks, hooks_removed)
                .context(StorageSnafu { table: "counters" })?;
            counters::decrement(&mut counters_table, Collection::Requests, cascade_removed)
                .context(StorageSnafu { table: "counters" })?;
        }
        txn.commit().context(CommitSnafu)?;

        Ok((hooks_removed, cascade_removed))
    }

    fn sweep_requests_at(&self, cutoff: DateTime<Utc>, max_batch: usize) -> Result<u64> {
        let txn = self.engine.begin_write()?;

        let expired = {
            let ttl_table = txn
                .open_table(Tables::REQUESTS_TTL)
                .context(TableSnafu { table: "requests_ttl" })?;
            ttl::collect_expired(&ttl_table, cutoff, max_batch)
                .context(StorageSnafu { table: "requests_ttl" })?
        };
        if expired.is_empty() {
            return Ok(0);
        }

        let mut removed = 0u64;
        {
            let mut ttl_table = txn
                .open_table(Tables::REQUESTS_TTL)
                .context(TableSnafu { table: "requests_ttl" })?;
            let mut requests_table =
                txn.open_table(Tables::REQUESTS).context(TableSnafu { table: "requests" })?;
            let mut counters_table =
                txn.open_table(Tables::COUNTERS).context(TableSnafu { table: "counters" })?;

            for entry in &expired {
                ttl_table
                    .remove(entry.index_key.as_slice())
                    .context(StorageSnafu { table: "requests_ttl" })?;

                // The primary may already be gone if its hook cascaded in
                // an earlier cycle; only live removals count
                if requests_table
                    .remove(entry.primary_key.as_slice())
                    .context(StorageSnafu { table: "requests" })?
                    .is_some()
                {
                    removed += 1;
                }
            }

            counters::decrement(&mut counters_table, Collection::Requests, removed)
                .context(StorageSnafu { table: "counters" })?;
        }
        txn.commit().context(CommitSnafu)?;

        Ok(removed)
    }

    /// Recomputes live key counts and compares them against the ledger.
    /// Returns one entry per drifted collection; empty means consistent.
    ///
    /// Maintenance/test operation — full scan, never hot-path.
    pub fn verify_counters(&self) -> Result<Vec<CounterDrift>> {
        let txn = self.engine.begin_read()?;

        let hooks_len = txn
            .open_table(Tables::HOOKS)
            .context(TableSnafu { table: "hooks" })?
            .len()
            .context(StorageSnafu { table: "hooks" })?;
        let requests_len = txn
            .open_table(Tables::REQUESTS)
            .context(TableSnafu { table: "requests" })?
            .len()
            .context(StorageSnafu { table: "requests" })?;
        let counters_table =
            txn.open_table(Tables::COUNTERS).context(TableSnafu { table: "counters" })?;

        let mut drift = Vec::new();
        for (collection, actual) in
            [(Collection::Hooks, hooks_len), (Collection::Requests, requests_len)]
        {
            let ledger = counters::read(&counters_table, collection)
                .context(StorageSnafu { table: "counters" })?;
            if ledger != actual {
                drift.push(CounterDrift { collection, ledger, actual });
            }
        }

        Ok(drift)
    }
}

/// Expiry cutoff for entities older than `max_age`, measured from now.
pub(crate) fn cutoff_for(max_age: std::time::Duration) -> Result<DateTime<Utc>> {
    TimeDelta::from_std(max_age)
        .ok()
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .context(ValidationSnafu { message: "max_age out of range" })
}

fn list_requests_in<T>(table: &T, hook_name: &str) -> Result<Vec<Request>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let prefix = keys::request_prefix(hook_name);
    let mut requests = Vec::new();

    for item in table.range(prefix.as_slice()..).context(StorageSnafu { table: "requests" })? {
        let (key, doc) = item.context(StorageSnafu { table: "requests" })?;
        if !key.value().starts_with(&prefix) {
            break;
        }
        requests
            .push(codec::decode(doc.value()).context(CodecSnafu { what: "request" })?);
    }

    requests.sort_by(|a: &Request, b: &Request| b.created.cmp(&a.created));
    Ok(requests)
}

fn validate_name(what: &str, name: &str) -> Result<()> {
    ensure!(
        !name.is_empty(),
        ValidationSnafu { message: format!("{what} name must not be empty") }
    );
    ensure!(
        !name.contains('\0'),
        ValidationSnafu { message: format!("{what} name must not contain NUL") }
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use hookbin_types::IdSource;

    #[test]
    fn put_and_get_roundtrip() {
        let store = Store::open_in_memory().expect("open");
        let mut ids = IdSource::seeded(1);
        let hook = Hook::generate(&mut ids, true);

        store.put_hook(&hook).expect("put");
        let found = store.hook(&hook.name).expect("get");

        assert_eq!(found, hook);
    }

    #[test]
    fn missing_hook_is_not_found() {
        let store = Store::open_in_memory().expect("open");
        let err = store.hook("nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn empty_names_rejected() {
        let store = Store::open_in_memory().expect("open");
        let mut ids = IdSource::seeded(1);

        let mut hook = Hook::generate(&mut ids, false);
        hook.name.clear();
        assert!(matches!(
            store.put_hook(&hook).unwrap_err(),
            crate::StoreError::Validation { .. }
        ));

        let request = Request::capture(&mut ids, hookbin_types::RawCapture::default());
        assert!(store.put_request("", &request).is_err());
    }

    #[test]
    fn nul_in_name_rejected() {
        let store = Store::open_in_memory().expect("open");
        let mut ids = IdSource::seeded(1);

        let mut hook = Hook::generate(&mut ids, false);
        hook.name = "bad\0name".to_string();
        assert!(matches!(
            store.put_hook(&hook).unwrap_err(),
            crate::StoreError::Validation { .. }
        ));
    }

    #[test]
    fn overwriting_hook_does_not_inflate_counter() {
        let store = Store::open_in_memory().expect("open");
        let mut ids = IdSource::seeded(1);
        let hook = Hook::generate(&mut ids, false);

        store.put_hook(&hook).expect("first put");
        store.put_hook(&hook).expect("second put");

        assert_eq!(store.count(Collection::Hooks).expect("count"), 1);
        assert!(store.verify_counters().expect("verify").is_empty());
    }

    #[test]
    fn hook_with_requests_attaches_newest_first() {
        let store = Store::open_in_memory().expect("open");
        let mut ids = IdSource::seeded(1);
        let hook = Hook::generate(&mut ids, false);
        store.put_hook(&hook).expect("put hook");

        for age_hours in [3, 1, 2] {
            let mut request =
                Request::capture(&mut ids, hookbin_types::RawCapture::default());
            request.created = Utc::now() - TimeDelta::hours(age_hours);
            store.put_request(&hook.name, &request).expect("put request");
        }

        let found = store.hook_with_requests(&hook.name).expect("get");
        assert_eq!(found.requests.len(), 3);
        assert!(found.requests.windows(2).all(|w| w[0].created >= w[1].created));
    }
}
