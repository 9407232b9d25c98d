//! Error types for the storage core.
//!
//! The taxonomy distinguishes four families the caller can act on:
//! `NotFound` (mappable to a 404-equivalent), codec failures, engine
//! failures (open/transaction/table/storage/commit, each carrying enough
//! context to diagnose without retrying blindly), and validation failures.

use hookbin_types::codec::CodecError;
use snafu::Snafu;

/// Result type for storage operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Errors returned by the storage core.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    /// Key absent on point lookup. Distinct from all other errors so
    /// callers can map it to a "not found" response.
    #[snafu(display("`{key}` not found in `{collection}`"))]
    NotFound {
        /// Collection that was searched.
        collection: &'static str,
        /// The key that was absent.
        key: String,
    },

    /// The database file could not be opened or created.
    #[snafu(display("failed to open database at {path}: {source}"))]
    Open {
        /// Filesystem path that failed to open.
        path: String,
        /// The underlying redb error.
        source: redb::DatabaseError,
    },

    /// A transaction could not be started.
    #[snafu(display("failed to begin transaction: {source}"))]
    Begin {
        /// The underlying redb error.
        source: redb::TransactionError,
    },

    /// A table could not be opened inside a transaction.
    #[snafu(display("failed to open table `{table}`: {source}"))]
    Table {
        /// Name of the table.
        table: &'static str,
        /// The underlying redb error.
        source: redb::TableError,
    },

    /// A read or write against an open table failed.
    #[snafu(display("storage error in `{table}`: {source}"))]
    Storage {
        /// Name of the table.
        table: &'static str,
        /// The underlying redb error.
        source: redb::StorageError,
    },

    /// A transaction failed to commit; none of its writes are visible.
    #[snafu(display("failed to commit transaction: {source}"))]
    Commit {
        /// The underlying redb error.
        source: redb::CommitError,
    },

    /// An entity document could not be serialized or deserialized.
    #[snafu(display("failed to encode or decode {what}: {source}"))]
    Codec {
        /// What was being (de)serialized.
        what: &'static str,
        /// The underlying codec error.
        source: CodecError,
    },

    /// The caller passed an invalid entity.
    #[snafu(display("{message}"))]
    Validation {
        /// Why the entity was rejected.
        message: String,
    },
}

impl StoreError {
    /// True when the error is a point-lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinguishable() {
        let err = StoreError::NotFound { collection: "hooks", key: "abc".to_string() };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "`abc` not found in `hooks`");

        let other = StoreError::Validation { message: "nope".to_string() };
        assert!(!other.is_not_found());
    }
}
