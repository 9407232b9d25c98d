//! Key encoding for the storage tables.
//!
//! Two composite encodings keep byte-lexicographic order aligned with the
//! orders the store needs:
//!
//! ```text
//! TTL index key:    | timestamp (30 bytes, fixed width) | 0x00 | primary key |
//! request key:      | hook name                         | 0x00 | request name |
//! ```
//!
//! Timestamps are rendered as zero-padded UTC text with nanosecond
//! resolution, so byte order equals chronological order. The primary-key
//! suffix keeps TTL index keys unique when two entities are created in
//! the same nanosecond; cutoff comparison only looks at the fixed-width
//! prefix. Hook and request names are base-36, so `0x00` never occurs in
//! them and the separator is unambiguous.

use chrono::{DateTime, Utc};

/// Rendered width of a TTL timestamp in bytes.
pub const TS_WIDTH: usize = 30;

/// Separator between key components.
pub const KEY_SEP: u8 = 0x00;

/// Fixed-width, lexicographically sortable timestamp format.
const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

/// Renders a timestamp in the fixed-width TTL index format.
pub fn ttl_timestamp(at: DateTime<Utc>) -> String {
    at.format(TS_FORMAT).to_string()
}

/// Encodes a TTL index key for an entity created at `created`.
pub fn encode_ttl_key(created: DateTime<Utc>, primary_key: &[u8]) -> Vec<u8> {
    let ts = ttl_timestamp(created);
    let mut key = Vec::with_capacity(TS_WIDTH + 1 + primary_key.len());
    key.extend_from_slice(ts.as_bytes());
    key.push(KEY_SEP);
    key.extend_from_slice(primary_key);
    key
}

/// Returns the fixed-width timestamp prefix of a TTL index key, or `None`
/// for keys too short to carry one.
pub fn ttl_prefix(index_key: &[u8]) -> Option<&[u8]> {
    index_key.get(..TS_WIDTH)
}

/// Encodes the composite storage key for a request under its hook.
pub fn encode_request_key(hook: &str, request: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(hook.len() + 1 + request.len());
    key.extend_from_slice(hook.as_bytes());
    key.push(KEY_SEP);
    key.extend_from_slice(request.as_bytes());
    key
}

/// Returns the key-range prefix covering every request owned by `hook`.
pub fn request_prefix(hook: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(hook.len() + 1);
    prefix.extend_from_slice(hook.as_bytes());
    prefix.push(KEY_SEP);
    prefix
}

/// Splits a composite request key into `(hook, request)` names.
///
/// Returns `None` if the key has no separator or a component is not UTF-8.
pub fn split_request_key(key: &[u8]) -> Option<(&str, &str)> {
    let sep = key.iter().position(|&b| b == KEY_SEP)?;
    let hook = std::str::from_utf8(&key[..sep]).ok()?;
    let request = std::str::from_utf8(&key[sep + 1..]).ok()?;
    Some((hook, request))
}

/// Encodes a counter value as fixed-width big-endian bytes.
pub fn encode_count(count: u64) -> [u8; 8] {
    count.to_be_bytes()
}

/// Decodes a counter value; absent or malformed values read as zero.
pub fn decode_count(bytes: &[u8]) -> u64 {
    match bytes.try_into() {
        Ok(fixed) => u64::from_be_bytes(fixed),
        Err(_) => 0,
    }
}
