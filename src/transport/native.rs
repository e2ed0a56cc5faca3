//! Native HTTP transport using reqwest.

use super::{RequestSpec, ResponseSpec, Transport, TransportError};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Default request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT_MS)
    }
}

impl ReqwestTransport {
    /// Creates a transport whose requests time out after `default_timeout_ms`
    /// unless the request carries its own timeout.
    pub fn new(default_timeout_ms: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            default_timeout: Duration::from_millis(default_timeout_ms),
        }
    }

    fn build(&self, request: &RequestSpec) -> Result<reqwest::RequestBuilder, TransportError> {
        let method = reqwest::Method::from_bytes(request.method().to_uppercase().as_bytes())
            .map_err(|e| TransportError::Build(e.to_string()))?;
        let url = url::Url::parse(&request.url)?;

        let timeout = request
            .timeout
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout);

        let mut builder = self.client.request(method, url).timeout(timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(params) = &request.params {
            let pairs: Vec<(&str, String)> = params
                .iter()
                .map(|(key, value)| (key.as_str(), param_text(value)))
                .collect();
            builder = builder.query(&pairs);
        }

        builder = match request.payload() {
            Some(Value::String(text)) => builder.body(text.clone()),
            Some(payload) => builder.json(payload),
            None => builder,
        };

        Ok(builder)
    }
}

fn param_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RequestSpec) -> Result<ResponseSpec, TransportError> {
        let builder = self.build(request)?;
        debug!("Sending {} {}", request.method(), request.url);

        let start = Instant::now();
        let response = builder.send().await?;

        let status = response.status();
        let final_url = response.url().to_string();

        let mut headers: BTreeMap<String, Value> = BTreeMap::new();
        for (name, value) in response.headers() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    if let Value::String(joined) = existing {
                        joined.push_str(", ");
                        joined.push_str(value);
                    }
                })
                .or_insert_with(|| Value::String(value.to_string()));
        }

        let bytes = response.bytes().await?;
        let elapsed = start.elapsed().as_millis() as u64;

        let text = String::from_utf8_lossy(&bytes).into_owned();
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(ResponseSpec {
            status: status.as_u16(),
            status_text: Some(status.canonical_reason().unwrap_or("Unknown").to_string()),
            body,
            headers,
            url: Some(final_url),
            size: Some(bytes.len() as u64),
            response_time: Some(elapsed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_parses_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::default();
        let response = transport
            .send(&RequestSpec::new("get", format!("{}/users/1", server.uri())))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.status_text.as_deref(), Some("OK"));
        assert_eq!(response.body, json!({"id": 1}));
        assert_eq!(response.size, Some(8));
        assert!(response.response_time.is_some());
    }

    #[tokio::test]
    async fn test_error_status_is_not_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let response = ReqwestTransport::default()
            .send(&RequestSpec::new("GET", server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.body, json!("missing"));
    }

    #[tokio::test]
    async fn test_structured_payload_and_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/items"))
            .and(query_param("page", "2"))
            .and(header("x-trace", "abc"))
            .and(body_json(json!({"name": "Ada"})))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let mut spec = RequestSpec::new("POST", format!("{}/items", server.uri()));
        spec.headers.insert("x-trace".to_string(), "abc".to_string());
        spec.data = Some(json!({"name": "Ada"}));
        spec.params = json!({"page": 2}).as_object().cloned();

        let response = ReqwestTransport::default().send(&spec).await.unwrap();
        assert_eq!(response.status, 201);
    }

    #[tokio::test]
    async fn test_string_payload_is_sent_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(body_string("a=1&b=2"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let mut spec = RequestSpec::new("PUT", server.uri());
        spec.body = Some(json!("a=1&b=2"));

        let response = ReqwestTransport::default().send(&spec).await.unwrap();
        assert_eq!(response.status, 204);
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let mut spec = RequestSpec::new("GET", server.uri());
        spec.timeout = Some(50);

        let err = ReqwestTransport::default().send(&spec).await.unwrap_err();
        assert_eq!(err, TransportError::Timeout);
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let err = ReqwestTransport::default()
            .send(&RequestSpec::new("GET", "not-a-valid-url"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let err = ReqwestTransport::new(2_000)
            .send(&RequestSpec::new("GET", "http://127.0.0.1:1/"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }
}
