//! Cache key derivation.
//!
//! A cache key identifies a request: the URL plus everything in the
//! request configuration that could change the response. Two logically
//! identical requests must always derive the same key, so headers are
//! kept in a `BTreeMap` (canonical iteration order) and the whole
//! (method, url, headers, body) tuple is JSON-encoded, making the
//! derivation both deterministic and injective.

use std::collections::BTreeMap;
use std::fmt;

use reqwest::Method;

/// Request configuration that participates in cache identity.
///
/// Staleness is deliberately not part of this struct: it is freshness
/// policy, not request identity, and is passed to `resolve` separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    /// HTTP method (GET by default).
    pub method: Method,

    /// Request headers. Sorted map so key derivation is order-independent.
    pub headers: BTreeMap<String, String>,

    /// Optional JSON request body.
    pub body: Option<serde_json::Value>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: BTreeMap::new(),
            body: None,
        }
    }
}

impl RequestConfig {
    /// Create a default (GET, no headers, no body) configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the JSON request body.
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Deterministic identifier for a cached request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for (url, config).
    ///
    /// Pure function: same inputs always yield the same key, and any
    /// difference in method, URL, headers, or body changes the key.
    /// The components are JSON-encoded as a tuple, so delimiter
    /// characters inside a URL or header value cannot make two
    /// different configurations collide.
    pub fn derive(url: &str, config: &RequestConfig) -> Self {
        // serde_json's maps are BTreeMaps, so the encoding is
        // deterministic as well as unambiguous.
        let key = serde_json::json!([
            config.method.as_str(),
            url,
            &config.headers,
            &config.body,
        ])
        .to_string();

        Self(key)
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
