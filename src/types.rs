//! Domain types shared across the tracking pipeline.
//!
//! The HTTP framework hosting this library is a black box: it hands the
//! pipeline immutable snapshots of the inbound request and (once the
//! handler returns) the outbound response. [`RequestInfo`] and
//! [`ResponseInfo`] are those snapshots. Cookies scheduled by the pipeline
//! are collected on the response snapshot for the host to apply before the
//! response is sent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Snapshot of an inbound HTTP request.
///
/// Header names are stored lowercased so lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    /// HTTP method (GET, POST, ...)
    pub method: String,
    /// Request path, without query string (used for URL exclusion)
    pub path: String,
    /// Absolute URL including the query string
    pub url: String,
    /// Request headers, keys lowercased
    pub headers: HashMap<String, String>,
    /// Request cookies
    pub cookies: HashMap<String, String>,
}

impl RequestInfo {
    /// Create a request snapshot from method, path and absolute URL.
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            url: url.into(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
        }
    }

    /// Add a header (name is lowercased for case-insensitive lookup).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Add a cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Cookie lookup by exact name.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// The `User-Agent` header, if present.
    pub fn user_agent(&self) -> Option<&str> {
        self.header("user-agent")
    }

    /// The `Referer` header, if present.
    pub fn referer(&self) -> Option<&str> {
        self.header("referer")
    }
}

/// A cookie scheduled on the response by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Max-Age attribute in seconds
    pub max_age_secs: i64,
}

/// Snapshot of the outbound HTTP response.
#[derive(Debug, Clone, Default)]
pub struct ResponseInfo {
    /// Numeric status code
    pub status: u16,
    /// `Content-Type` header value, if any
    pub content_type: Option<String>,
    /// Response body, when available synchronously. A streaming or
    /// bodyless response is represented as `None`.
    pub body: Option<String>,
    /// Cookies scheduled by the pipeline; the host applies these before
    /// the response is sent.
    pub cookies: Vec<Cookie>,
}

impl ResponseInfo {
    /// Create a response snapshot with the given status code.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: None,
            cookies: Vec::new(),
        }
    }

    /// Set the `Content-Type` value.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the body content.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Whether the content type starts with `text/html`.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.starts_with("text/html"))
            .unwrap_or(false)
    }

    /// Schedule a cookie on this response.
    pub fn set_cookie(&mut self, cookie: Cookie) {
        self.cookies.push(cookie);
    }
}

/// A named analytics event with free-form parameters.
///
/// Events are immutable once the payload is built and are cleared in bulk
/// with the request context, never deleted individually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Non-empty event name (e.g. `page_view`, `signup`)
    pub name: String,
    /// Event parameters
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl EventRecord {
    /// Create an event with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Map::new(),
        }
    }

    /// Builder-style parameter insertion.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set a parameter only when it is not already present.
    ///
    /// Values recorded by application code always take precedence over
    /// defaults computed by the payload builder.
    pub fn set_if_absent(&mut self, key: &str, value: Value) {
        if !self.params.contains_key(key) {
            self.params.insert(key.to_string(), value);
        }
    }
}

/// The complete analytics payload for one request.
///
/// Shared parameters are merged flat into each event's params at build
/// time, so the wire form is just the event list.
#[derive(Debug, Clone, Serialize)]
pub struct Payload {
    /// Events in recording order, except a synthesized `page_view` which
    /// always comes first.
    pub events: Vec<EventRecord>,
}

/// Durable per-visitor identifier resolved from (or issued to) a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Identifier in the format `"<uint32>.<unix_seconds>"`
    pub id: String,
    /// True when generated this request (no prior cookie)
    pub is_new: bool,
}

/// Page metadata derived from an HTML response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    /// Absolute request URL including the query string
    pub page_location: String,
    /// Text of the first `<title>` element, trimmed; empty when absent
    pub page_title: String,
}
