//! Entity models for the hookbin storage core.
//!
//! This crate provides:
//! - [`Hook`] and [`Request`] documents (serialized as UTF-8 JSON)
//! - [`RawCapture`] plus the normalization rules applied when a request
//!   is captured (body truncation, header deny-list, media-type cleanup)
//! - [`IdSource`], an owned, seedable random source for tiny IDs and colors
//! - a centralized JSON codec with consistent error handling

pub mod codec;
mod hook;
mod id;
mod request;

pub use hook::Hook;
pub use id::IdSource;
pub use request::{RawCapture, Request, FORM_MEDIA_TYPE, MAX_BODY_BYTES};

/// Current document schema version written into every persisted entity.
///
/// Documents written before the field existed deserialize with this value;
/// because all data is TTL-bounded, older-format documents age out of the
/// file without migration tooling.
pub const SCHEMA_VERSION: u16 = 1;

pub(crate) fn default_schema() -> u16 {
    SCHEMA_VERSION
}
