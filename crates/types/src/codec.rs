//! Centralized serialization and deserialization functions.
//!
//! This module provides a unified interface for encoding and decoding
//! entity documents as UTF-8 JSON, with consistent error handling via snafu.

use serde::{de::DeserializeOwned, Serialize};
use snafu::Snafu;

/// Error type for codec operations.
#[derive(Debug, Snafu)]
pub enum CodecError {
    /// Encoding failed.
    #[snafu(display("encoding failed: {source}"))]
    Encode {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// Decoding failed.
    #[snafu(display("decoding failed: {source}"))]
    Decode {
        /// The underlying serde_json error.
        source: serde_json::Error,
    },
}

/// Encodes a value to JSON bytes.
///
/// # Errors
///
/// Returns `CodecError::Encode` if serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(|source| CodecError::Encode { source })
}

/// Decodes JSON bytes to a value.
///
/// # Errors
///
/// Returns `CodecError::Decode` if deserialization fails.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|source| CodecError::Decode { source })
}
