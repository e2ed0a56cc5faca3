//! The `bru` facade handed to scripts.
//!
//! [`Bru`] wraps the execution's [`VariableStore`] together with the request
//! map, the transport, and the mock data provider. Clones share state, so
//! the handle registered in the script engine and the one the driver reads
//! results from observe the same variables.

use crate::models::HttpResponse;
use crate::transport::{RequestSpec, ResponseSpec, Transport, TransportError};
use crate::variables::{MockDataProvider, VariableSnapshot, VariableStore};
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Named request definitions available to `runRequest`.
pub type RequestMap = HashMap<String, RequestSpec>;

/// Errors raised by the facade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BruError {
    /// `runRequest` was called with a path missing from the request map.
    #[error("Request not found: {path}")]
    RequestNotFound { path: String },
}

/// Result of `sendRequest`: the response (synthesized on failure) and the
/// transport error if one occurred.
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub response: HttpResponse,
    pub error: Option<TransportError>,
}

/// Shared handle to one execution's variables and outbound HTTP.
#[derive(Clone)]
pub struct Bru {
    vars: Arc<RwLock<VariableStore>>,
    request_map: Arc<RequestMap>,
    transport: Arc<dyn Transport>,
    mock: Arc<dyn MockDataProvider>,
}

impl fmt::Debug for Bru {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bru")
            .field("vars", &self.vars)
            .field("requests", &self.request_map.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Bru {
    /// Creates the facade.
    ///
    /// # Arguments
    ///
    /// * `vars` - The execution's variable store
    /// * `request_map` - Request definitions reachable by path
    /// * `transport` - Outbound HTTP implementation
    /// * `mock` - Generator for `{{$name}}` placeholders
    pub fn new(
        vars: VariableStore,
        request_map: RequestMap,
        transport: Arc<dyn Transport>,
        mock: Arc<dyn MockDataProvider>,
    ) -> Self {
        Self {
            vars: Arc::new(RwLock::new(vars)),
            request_map: Arc::new(request_map),
            transport,
            mock,
        }
    }

    /// Shared read access to the store. A poisoned lock is recovered.
    pub fn vars(&self) -> RwLockReadGuard<'_, VariableStore> {
        self.vars.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Exclusive access to the store. A poisoned lock is recovered.
    pub fn vars_mut(&self) -> RwLockWriteGuard<'_, VariableStore> {
        self.vars.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_var(&self, name: &str, value: Value) {
        self.vars_mut().set_var(name, value);
    }

    pub fn get_var(&self, name: &str) -> Option<Value> {
        self.vars().get_var(name).cloned()
    }

    pub fn delete_var(&self, name: &str) {
        self.vars_mut().delete_var(name);
    }

    pub fn set_env_var(&self, name: &str, value: Value) {
        self.vars_mut().set_env_var(name, value);
    }

    pub fn get_env_var(&self, name: &str) -> Option<Value> {
        self.vars().get_env_var(name).cloned()
    }

    pub fn set_global_env_var(&self, name: &str, value: Value) {
        self.vars_mut().set_global_env_var(name, value);
    }

    pub fn get_global_env_var(&self, name: &str) -> Option<Value> {
        self.vars().get_global_env_var(name).cloned()
    }

    pub fn get_request_var(&self, name: &str) -> Option<Value> {
        self.vars().get_request_var(name).cloned()
    }

    pub fn get_folder_var(&self, name: &str) -> Option<Value> {
        self.vars().get_folder_var(name).cloned()
    }

    pub fn get_collection_var(&self, name: &str) -> Option<Value> {
        self.vars().get_collection_var(name).cloned()
    }

    pub fn get_process_env(&self, name: &str) -> Option<Value> {
        self.vars().get_process_env(name).cloned()
    }

    /// Interpolates a value through the store. Non-strings pass through.
    pub fn interpolate(&self, value: &Value) -> Value {
        self.vars().interpolate(value, self.mock.as_ref())
    }

    /// Interpolates text through the store.
    pub fn interpolate_str(&self, text: &str) -> String {
        self.vars().interpolate_str(text, self.mock.as_ref())
    }

    /// Exports the writable scopes.
    pub fn to_map(&self) -> VariableSnapshot {
        self.vars().to_map()
    }

    /// Looks a request definition up by path.
    pub fn request(&self, path: &str) -> Option<&RequestSpec> {
        self.request_map.get(path)
    }

    /// Runs the request stored under `path`.
    ///
    /// The definition's URL, header values and string body are interpolated
    /// first. A transport failure still yields a response (status `0` unless
    /// the error carried one) so scripts can inspect failed calls.
    ///
    /// # Returns
    ///
    /// The response, or [`BruError::RequestNotFound`] when `path` is unknown.
    pub async fn run_request(&self, path: &str) -> Result<HttpResponse, BruError> {
        let definition = self
            .request(path)
            .ok_or_else(|| BruError::RequestNotFound {
                path: path.to_string(),
            })?;

        let spec = self.interpolate_spec(definition);
        debug!("runRequest '{}' -> {} {}", path, spec.method(), spec.url);

        Ok(self.send(&spec).await.response)
    }

    /// Sends an ad-hoc request without interpolation.
    pub async fn send(&self, spec: &RequestSpec) -> SendOutcome {
        match self.transport.send(spec).await {
            Ok(response) => SendOutcome {
                response: HttpResponse::from_spec(response),
                error: None,
            },
            Err(err) => {
                warn!("Request to {} failed: {}", spec.url, err);
                SendOutcome {
                    response: failed_response(spec, &err),
                    error: Some(err),
                }
            }
        }
    }

    fn interpolate_spec(&self, definition: &RequestSpec) -> RequestSpec {
        let vars = self.vars();
        let mock = self.mock.as_ref();

        let mut spec = definition.clone();
        spec.url = vars.interpolate_str(&definition.url, mock);
        spec.headers = definition
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), vars.interpolate_str(value, mock)))
            .collect();
        spec.data = definition.data.as_ref().map(|v| vars.interpolate(v, mock));
        spec.body = definition.body.as_ref().map(|v| vars.interpolate(v, mock));
        spec
    }
}

fn failed_response(spec: &RequestSpec, err: &TransportError) -> HttpResponse {
    HttpResponse::from_spec(ResponseSpec {
        status: 0,
        status_text: Some("Network Error".to_string()),
        body: Value::String(err.to_string()),
        url: Some(spec.url.clone()),
        ..ResponseSpec::default()
    })
}
