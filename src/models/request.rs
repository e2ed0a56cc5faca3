//! HTTP request model exposed to scripts as `req`.
//!
//! The request is built once from the driver input, mutated in place by the
//! script through its setters, and serialized back with [`HttpRequest::to_map`].
//! The body is always stored in raw form; JSON parsing happens on read.

use super::body::{deserialize_header_map, has_json_content_type, safe_parse_json, BodyOptions};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Whether the request runs on its own or as part of a collection run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Single request sent by the user.
    #[default]
    Standalone,
    /// Request executed by the collection runner.
    Runner,
}

impl ExecutionMode {
    /// Returns the wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Standalone => "standalone",
            ExecutionMode::Runner => "runner",
        }
    }
}

/// Which front end issued the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionPlatform {
    /// Desktop application.
    #[default]
    App,
    /// Command line runner.
    Cli,
}

impl ExecutionPlatform {
    /// Returns the wire name of the platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionPlatform::App => "app",
            ExecutionPlatform::Cli => "cli",
        }
    }
}

fn default_mode() -> String {
    "none".to_string()
}

fn default_vars() -> Value {
    Value::Array(Vec::new())
}

/// Represents the in-flight HTTP request a script can read and mutate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    /// HTTP method as supplied by the host (not validated).
    #[serde(default)]
    pub method: String,

    /// Target URL. May still contain `{{variable}}` placeholders.
    #[serde(default)]
    pub url: String,

    /// Body mode metadata (opaque pass-through).
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Request-level variable definitions (opaque pass-through).
    #[serde(default = "default_vars")]
    pub vars: Value,

    /// Auth configuration (opaque pass-through).
    #[serde(default)]
    pub auth: Value,

    /// Raw body: a string, a structured value, or `null`.
    #[serde(default)]
    pub body: Value,

    /// Display name of the request.
    #[serde(default)]
    pub name: Option<String>,

    /// Auth mode metadata (opaque pass-through).
    #[serde(default)]
    pub auth_mode: Option<String>,

    /// Request headers.
    ///
    /// Stored with the caller's casing; [`HttpRequest::get_header`] is an
    /// exact-name lookup. Non-string values are kept in their text form.
    #[serde(default, deserialize_with = "deserialize_header_map")]
    pub headers: BTreeMap<String, String>,

    /// Timeout in milliseconds.
    #[serde(default)]
    pub timeout: Option<i64>,

    /// Standalone or runner execution.
    #[serde(default)]
    pub execution_mode: ExecutionMode,

    /// App or CLI execution.
    #[serde(default)]
    pub execution_platform: ExecutionPlatform,
}

/// Serializable snapshot of a request, emitted in the output record.
///
/// Carries the *parsed* body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    pub mode: String,
    pub vars: Value,
    pub auth: Value,
    pub body: Value,
    pub name: Option<String>,
    pub auth_mode: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Option<i64>,
    pub execution_mode: ExecutionMode,
    pub execution_platform: ExecutionPlatform,
}

impl HttpRequest {
    /// Creates a new request with the given method and URL.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method
    /// * `url` - Target URL
    ///
    /// # Returns
    ///
    /// A new `HttpRequest` with default values for optional fields.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            mode: default_mode(),
            vars: default_vars(),
            auth: Value::Null,
            body: Value::Null,
            name: None,
            auth_mode: None,
            headers: BTreeMap::new(),
            timeout: None,
            execution_mode: ExecutionMode::default(),
            execution_platform: ExecutionPlatform::default(),
        }
    }

    /// Checks the fields every request must carry.
    ///
    /// # Returns
    ///
    /// `Ok(())` when method and URL are present, or `Err` naming the missing field.
    pub fn validate(&self) -> Result<(), String> {
        if self.method.trim().is_empty() {
            return Err("request.method is required".to_string());
        }
        if self.url.trim().is_empty() {
            return Err("request.url is required".to_string());
        }
        Ok(())
    }

    /// Exact-name header lookup.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Sets (or replaces) a header.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Replaces every header.
    pub fn set_headers(&mut self, headers: BTreeMap<String, String>) {
        self.headers = headers;
    }

    /// Returns `true` when the request declares a JSON content type.
    pub fn has_json_content_type(&self) -> bool {
        has_json_content_type(self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Gets the body of the request.
    ///
    /// The JSON body is parsed automatically when the content type is JSON.
    /// If parsing fails the raw string comes back unchanged. With
    /// `options.raw` the stored value is returned as-is.
    pub fn get_body(&self, options: &BodyOptions) -> Value {
        if options.raw {
            return self.body.clone();
        }

        if self.has_json_content_type() {
            return safe_parse_json(&self.body);
        }

        self.body.clone()
    }

    /// Sets the body of the request.
    ///
    /// With a JSON content type, structured data is stored as its JSON string
    /// since that is what goes over the wire; `get_body` parses it back.
    /// Anything else, or any data passed with `options.raw`, is stored verbatim.
    pub fn set_body(&mut self, data: Value, options: &BodyOptions) {
        if options.raw {
            self.body = data;
            return;
        }

        if self.has_json_content_type() && (data.is_object() || data.is_array()) {
            self.body = Value::String(data.to_string());
            return;
        }

        self.body = data;
    }

    /// Accepted for script compatibility; redirects are not configurable yet.
    pub fn set_max_redirects(&mut self, max_redirects: i64) {
        warn!(
            "setMaxRedirects({}) is not yet implemented and has no effect",
            max_redirects
        );
    }

    /// Accepted for script compatibility; failure callbacks are not wired yet.
    pub fn on_fail(&self) {
        warn!("onFail() is not yet implemented and the callback will never run");
    }

    /// Produces the output snapshot with the parsed body.
    pub fn to_map(&self) -> RequestSnapshot {
        RequestSnapshot {
            method: self.method.clone(),
            url: self.url.clone(),
            mode: self.mode.clone(),
            vars: self.vars.clone(),
            auth: self.auth.clone(),
            body: self.get_body(&BodyOptions::default()),
            name: self.name.clone(),
            auth_mode: self.auth_mode.clone(),
            headers: self.headers.clone(),
            timeout: self.timeout,
            execution_mode: self.execution_mode,
            execution_platform: self.execution_platform,
        }
    }
}
