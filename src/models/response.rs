//! HTTP response model exposed to scripts as `res`.
//!
//! The response is optional: pre-request scripts run without one. It is
//! read-mostly; scripts may replace the body with `setBody`. Besides the
//! accessor surface the model supports path queries over the parsed body
//! ([`HttpResponse::query`]), which scripts reach through `res(path)`.

use super::body::{safe_parse_json, BodyOptions};
use super::query;
use crate::transport::ResponseSpec;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Represents an HTTP response received from a server or supplied by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code. `0` marks a synthesized response for a failed send.
    pub status: u16,

    /// HTTP status text (e.g., "OK", "Network Error").
    pub status_text: Option<String>,

    /// Raw body exactly as received or last set.
    body: Value,

    /// Response headers as received. Lookups are case-insensitive.
    pub headers: BTreeMap<String, Value>,

    /// Final request URL.
    pub url: Option<String>,

    /// Body size in bytes.
    pub size: Option<u64>,

    /// Round-trip time in milliseconds.
    pub response_time: Option<u64>,
}

/// Serializable snapshot of a response, emitted in the output record.
///
/// Carries the *raw* body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSnapshot {
    pub status: u16,
    pub body: Value,
    pub headers: BTreeMap<String, Value>,
    pub url: Option<String>,
    pub status_text: Option<String>,
    pub size: Option<u64>,
}

impl HttpResponse {
    /// Creates a new HttpResponse with the given status code and text.
    ///
    /// # Arguments
    ///
    /// * `status` - HTTP status code
    /// * `status_text` - HTTP status text description
    pub fn new(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: Some(status_text.into()),
            body: Value::Null,
            headers: BTreeMap::new(),
            url: None,
            size: None,
            response_time: None,
        }
    }

    /// Builds the model from the transport/wire shape.
    pub fn from_spec(spec: ResponseSpec) -> Self {
        Self {
            status: spec.status,
            status_text: spec.status_text,
            body: spec.body,
            headers: spec.headers,
            url: spec.url,
            size: spec.size,
            response_time: spec.response_time,
        }
    }

    /// Adds a header to the response.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Case-insensitive header lookup.
    ///
    /// Servers vary header casing, so `Content-Type` is found by
    /// `content-type` as well.
    pub fn get_header(&self, name: &str) -> Option<&Value> {
        let lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| key.to_lowercase() == lower)
            .map(|(_, value)| value)
    }

    /// Gets the body of the response.
    ///
    /// A textual body is parsed as JSON whatever the headers say, falling
    /// back to the raw string when it does not parse; `options.raw` returns
    /// the stored body.
    pub fn get_body(&self, options: &BodyOptions) -> Value {
        if options.raw {
            return self.body.clone();
        }
        safe_parse_json(&self.body)
    }

    /// Replaces the body.
    ///
    /// Strings are stored verbatim; any other value is stored as its JSON text.
    pub fn set_body(&mut self, data: Value) {
        self.body = match data {
            Value::String(text) => Value::String(text),
            other => Value::String(other.to_string()),
        };
    }

    /// Path query over the parsed body, e.g. `data.items.0.id`.
    pub fn query(&self, path: &str) -> Option<Value> {
        query::query(&self.get_body(&BodyOptions::default()), path)
    }

    /// Produces the output snapshot with the raw body.
    pub fn to_map(&self) -> ResponseSnapshot {
        ResponseSnapshot {
            status: self.status,
            body: self.body.clone(),
            headers: self.headers.clone(),
            url: self.url.clone(),
            status_text: self.status_text.clone(),
            size: self.size,
        }
    }
}
