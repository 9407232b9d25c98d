//! The Request document and capture-time normalization.
//!
//! A [`Request`] is built from a [`RawCapture`] — a framework-free carrier
//! of the raw HTTP pieces — so the HTTP layer stays an external
//! collaborator. Normalization applied at capture time:
//!
//! - body truncated to [`MAX_BODY_BYTES`], lossy-UTF-8
//! - media type stripped of parameters, trimmed, lowercased
//! - proxy/infra headers removed case-insensitively
//! - query string and form body reduced to name → first-value maps

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::id::IdSource;

/// Maximum number of body bytes kept on a captured request.
pub const MAX_BODY_BYTES: usize = 10 * 1024;

/// Media type that triggers form-data extraction from the body.
pub const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

/// Proxy and platform headers dropped from captures.
const IGNORED_HEADERS: &[&str] = &[
    "x-varnish",
    "x-forwarded-for",
    "x-heroku-dynos-in-use",
    "x-request-start",
    "x-heroku-queue-wait-time",
    "x-heroku-queue-depth",
    "x-real-ip",
    "x-forwarded-proto",
    "x-via",
    "x-forwarded-port",
];

/// Raw pieces of an inbound HTTP request, prior to normalization.
#[derive(Debug, Clone, Default)]
pub struct RawCapture {
    pub remote_addr: String,
    pub method: String,
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query: String,
    /// Header pairs in arrival order; repeated names keep the first value.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub content_length: i64,
}

/// A captured request record.
///
/// Created once per captured call; destroyed either by its own TTL sweep
/// or when the owning hook's sub-collection is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Document schema version.
    #[serde(default = "crate::default_schema")]
    pub schema: u16,
    /// Opaque identifier, unique within the owning hook's sub-collection.
    pub name: String,
    pub remote_addr: String,
    pub method: String,
    pub path: String,
    /// Raw query string.
    pub query: String,
    /// Payload, truncated to [`MAX_BODY_BYTES`].
    pub body: String,
    /// Normalized media type, stripped of parameters.
    pub content_type: String,
    pub content_length: i64,
    /// Header name → first value, deny-list filtered.
    pub headers: BTreeMap<String, String>,
    /// Form field → first value; populated for form-encoded bodies.
    pub form_data: BTreeMap<String, String>,
    /// Query parameter → first value.
    pub query_data: BTreeMap<String, String>,
    /// Creation timestamp, normalized to UTC.
    pub created: DateTime<Utc>,
}

impl Request {
    /// Builds a request record from raw capture data, applying all
    /// normalization rules and drawing a fresh name from `ids`.
    pub fn capture(ids: &mut IdSource, raw: RawCapture) -> Self {
        let content_type = normalize_media_type(header_value(&raw.headers, "content-type"));

        let form_data = if content_type == FORM_MEDIA_TYPE {
            parse_pairs(&raw.body)
        } else {
            BTreeMap::new()
        };

        Self {
            schema: crate::SCHEMA_VERSION,
            name: ids.tiny_id(),
            remote_addr: raw.remote_addr,
            method: raw.method,
            path: raw.path,
            query_data: parse_pairs(raw.query.as_bytes()),
            query: raw.query,
            body: truncate_body(&raw.body),
            content_type,
            content_length: raw.content_length,
            headers: filter_headers(raw.headers),
            form_data,
            created: Utc::now(),
        }
    }
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> &'a str {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map_or("", |(_, v)| v.as_str())
}

fn truncate_body(body: &[u8]) -> String {
    let cut = body.len().min(MAX_BODY_BYTES);
    String::from_utf8_lossy(&body[..cut]).into_owned()
}

fn normalize_media_type(raw: &str) -> String {
    let media = raw.split(';').next().unwrap_or("").trim();
    media.to_ascii_lowercase()
}

fn filter_headers(raw: Vec<(String, String)>) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();

    for (name, value) in raw {
        if IGNORED_HEADERS.iter().any(|ignored| name.eq_ignore_ascii_case(ignored)) {
            continue;
        }
        out.entry(name).or_insert(value);
    }

    out
}

fn parse_pairs(input: &[u8]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();

    for (name, value) in form_urlencoded::parse(input) {
        out.entry(name.into_owned()).or_insert_with(|| value.into_owned());
    }

    out
}
