//! Outbound HTTP for `bru.runRequest` and `bru.sendRequest`.
//!
//! The sandbox only depends on the request/response shapes defined here and
//! on the [`Transport`] trait; [`ReqwestTransport`] is the production
//! implementation.

pub mod error;
pub mod native;

pub use error::TransportError;
pub use native::ReqwestTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::models::body::deserialize_header_map;
use std::collections::BTreeMap;

/// A request definition as found in the request map or passed to `sendRequest`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default, deserialize_with = "deserialize_header_map")]
    pub headers: BTreeMap<String, String>,
    /// Timeout in milliseconds.
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub body: Option<Value>,
    /// Query parameters appended to the URL.
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl RequestSpec {
    /// Creates a request definition for `method` and `url`.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            url: url.into(),
            ..Self::default()
        }
    }

    /// HTTP method, defaulting to `GET`.
    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or("GET")
    }

    /// The payload to send: `data` when truthy, otherwise a truthy `body`.
    pub fn payload(&self) -> Option<&Value> {
        self.data
            .as_ref()
            .filter(|data| is_truthy(data))
            .or_else(|| self.body.as_ref().filter(|body| is_truthy(body)))
    }
}

/// A response as produced by a [`Transport`] or supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSpec {
    pub status: u16,
    #[serde(default)]
    pub status_text: Option<String>,
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub headers: BTreeMap<String, Value>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub response_time: Option<u64>,
}

/// Sends HTTP requests on behalf of scripts.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns whatever response the server gave.
    async fn send(&self, request: &RequestSpec) -> Result<ResponseSpec, TransportError>;
}
