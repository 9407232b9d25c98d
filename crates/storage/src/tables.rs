//! Table definitions for redb storage.
//!
//! All five tables are created on open; key encoding is handled by the
//! keys module.

use redb::TableDefinition;

/// Table definitions for hookbin storage.
pub struct Tables;

impl Tables {
    /// Hook records: name → JSON document.
    pub const HOOKS: TableDefinition<'static, &'static str, &'static [u8]> =
        TableDefinition::new("hooks");

    /// Hook TTL index: fixed-width UTC timestamp ++ 0x00 ++ name → name.
    pub const HOOKS_TTL: TableDefinition<'static, &'static [u8], &'static [u8]> =
        TableDefinition::new("hooks_ttl");

    /// Request records: hook name ++ 0x00 ++ request name → JSON document.
    ///
    /// The hook-name prefix realizes a per-hook nested sub-collection as a
    /// contiguous key range.
    pub const REQUESTS: TableDefinition<'static, &'static [u8], &'static [u8]> =
        TableDefinition::new("requests");

    /// Request TTL index: fixed-width UTC timestamp ++ 0x00 ++ composite
    /// key → composite key.
    pub const REQUESTS_TTL: TableDefinition<'static, &'static [u8], &'static [u8]> =
        TableDefinition::new("requests_ttl");

    /// Counter ledger: collection name → 8-byte big-endian count.
    pub const COUNTERS: TableDefinition<'static, &'static str, &'static [u8]> =
        TableDefinition::new("counters");
}
