//! Single-file transactional storage core for hookbin.
//!
//! This crate provides:
//! - redb-backed persistent storage with a fixed set of five tables
//! - a [`Store`] facade for hook and request reads/writes, each expressed
//!   as a single engine transaction
//! - a chronologically ordered TTL index per collection and an atomic,
//!   bounded expiry sweep
//! - a denormalized counter ledger kept consistent with primary data
//! - a periodic, cancellable background [`Sweeper`]
//!
//! ## Layout
//!
//! One database file, five tables: `hooks` (name → JSON document),
//! `hooks_ttl` and `requests_ttl` (ordered timestamp keys → primary key),
//! `requests` (hook-prefixed composite keys → JSON document, realizing a
//! per-hook nested sub-collection as a prefix range), and `counters`
//! (collection name → big-endian count).
//!
//! ## Concurrency
//!
//! redb serializes write transactions and gives readers a consistent
//! snapshot; partial writes are never observable. The sweeper competes
//! with caller writes on the same serialization point, with bounded
//! batches so a large expiry backlog cannot starve writers.
//!
//! ## Quick start
//!
//! ```no_run
//! use hookbin_storage::{Collection, Store};
//! use hookbin_types::{Hook, IdSource};
//!
//! let store = Store::open("hooks.db")?;
//! let mut ids = IdSource::new();
//!
//! let hook = Hook::generate(&mut ids, false);
//! store.put_hook(&hook)?;
//!
//! let found = store.hook(&hook.name)?;
//! assert_eq!(found.name, hook.name);
//! assert_eq!(store.count(Collection::Hooks)?, 1);
//! # Ok::<(), hookbin_storage::StoreError>(())
//! ```

pub mod config;
mod counters;
mod engine;
mod error;
mod keys;
mod store;
mod sweep;
mod tables;
mod ttl;

pub use config::{StoreConfig, SweepConfig};
pub use counters::Collection;
pub use engine::Engine;
pub use error::{Result, StoreError};
pub use store::{CounterDrift, Store, SweepStats};
pub use sweep::Sweeper;
pub use tables::Tables;
