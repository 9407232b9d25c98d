//! The Hook document: a named, disposable endpoint that captures requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::IdSource;
use crate::request::Request;

/// A hook record.
///
/// Created once and never mutated afterwards; destroyed only by the sweep
/// scheduler once older than the configured maximum age. The `requests`
/// field is transient: it is populated in memory when a hook is read
/// together with its captured requests and is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    /// Document schema version.
    #[serde(default = "crate::default_schema")]
    pub schema: u16,
    /// Opaque unique identifier (short random base-36 string).
    pub name: String,
    /// Opaque identifier, present only on private hooks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Private hooks are excluded from recent-hook listings.
    #[serde(default)]
    pub private: bool,
    /// Informational RGBA color.
    pub color: [u8; 4],
    /// Creation timestamp, normalized to UTC.
    pub created: DateTime<Utc>,
    /// Captured requests, attached on combined reads only.
    #[serde(skip)]
    pub requests: Vec<Request>,
}

impl Hook {
    /// Generates a new hook with identity drawn from `ids`.
    ///
    /// Private hooks additionally receive a secret.
    pub fn generate(ids: &mut IdSource, private: bool) -> Self {
        Self {
            schema: crate::SCHEMA_VERSION,
            name: ids.tiny_id(),
            secret: private.then(|| ids.tiny_id()),
            private,
            color: ids.color(),
            created: Utc::now(),
            requests: Vec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::codec;

    #[test]
    fn public_hook_has_no_secret() {
        let mut ids = IdSource::seeded(1);
        let hook = Hook::generate(&mut ids, false);

        assert!(!hook.name.is_empty());
        assert!(hook.secret.is_none());
        assert!(!hook.private);
    }

    #[test]
    fn private_hook_has_secret() {
        let mut ids = IdSource::seeded(1);
        let hook = Hook::generate(&mut ids, true);

        assert!(hook.private);
        let secret = hook.secret.expect("private hook carries a secret");
        assert!(!secret.is_empty());
        assert_ne!(secret, hook.name);
    }

    #[test]
    fn created_is_utc() {
        let mut ids = IdSource::seeded(1);
        let before = Utc::now();
        let hook = Hook::generate(&mut ids, false);
        let after = Utc::now();

        assert!(hook.created >= before && hook.created <= after);
    }

    #[test]
    fn json_roundtrip_preserves_fields() {
        let mut ids = IdSource::seeded(9);
        let hook = Hook::generate(&mut ids, true);

        let bytes = codec::encode(&hook).expect("encode");
        let decoded: Hook = codec::decode(&bytes).expect("decode");

        assert_eq!(hook, decoded);
    }

    #[test]
    fn requests_field_never_serialized() {
        let mut ids = IdSource::seeded(2);
        let mut hook = Hook::generate(&mut ids, false);
        hook.requests.push(Request::capture(&mut ids, crate::RawCapture::default()));

        let bytes = codec::encode(&hook).expect("encode");
        let decoded: Hook = codec::decode(&bytes).expect("decode");

        assert!(decoded.requests.is_empty());
    }

    #[test]
    fn schema_defaults_for_preversion_documents() {
        // A document written before the schema field existed
        let json = br#"{"name":"abc123","private":false,"color":[50,100,150,255],"created":"2026-01-02T03:04:05.000000006Z"}"#;
        let decoded: Hook = codec::decode(json).expect("decode");

        assert_eq!(decoded.schema, crate::SCHEMA_VERSION);
        assert!(decoded.secret.is_none());
    }
}
