//! Request chaining integration tests
//!
//! Scripts that call `bru.runRequest` and `bru.sendRequest` against a local
//! mock server, including transport failures.

use super::{input, runtime_var};
use bru_script::driver::run_script;
use serde_json::{json, Value};
use serial_test::serial;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// An address nothing listens on.
const UNREACHABLE: &str = "http://127.0.0.1:9";

fn output_json(output: &bru_script::driver::ScriptOutput) -> Value {
    serde_json::from_str(&output.to_json().unwrap()).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_run_request_interpolates_definition() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(header("x-env", "staging"))
        .and(body_json(json!({ "user": "ada" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "secret-xyz" })))
        .expect(1)
        .mount(&server)
        .await;

    let input = input(json!({
        "request": { "method": "GET", "url": "{{host}}/profile" },
        "requestMap": {
            "auth/login": {
                "method": "POST",
                "url": "{{host}}/auth/login",
                "headers": { "x-env": "{{env}}" },
                "data": { "user": "{{user}}" }
            }
        },
        "vars": {
            "envVars": [
                { "name": "host", "value": server.uri() },
                { "name": "env", "value": "staging" }
            ],
            "runtimeVars": [{ "name": "user", "value": "ada" }]
        }
    }));

    let output = run_script(
        input,
        r#"
        let login = bru.runRequest("auth/login");
        bru.setVar("status", login.getStatus());
        bru.setVar("token", login.getBody().token);
        req.setHeader("authorization", "Bearer " + login.query("token"));
        "#,
    )
    .await
    .unwrap();
    let json = output_json(&output);

    assert!(output.is_success(), "{:?}", output.failures);
    assert_eq!(runtime_var(&json, "status"), Some(&json!(200)));
    assert_eq!(runtime_var(&json, "token"), Some(&json!("secret-xyz")));
    assert_eq!(json["req"]["headers"]["authorization"], "Bearer secret-xyz");
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_run_request_unknown_path_fails() {
    let input = input(json!({
        "request": { "method": "GET", "url": "http://h" },
        "requestMap": {}
    }));

    let output = run_script(input, r#"bru.runRequest("missing-path");"#)
        .await
        .unwrap();

    assert_eq!(output.failures.len(), 1);
    assert!(output.failures[0]
        .message
        .contains("Request not found: missing-path"));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_run_request_transport_failure_yields_response() {
    let input = input(json!({
        "request": { "method": "GET", "url": "http://h" },
        "requestMap": { "down": { "url": format!("{}/health", UNREACHABLE) } }
    }));

    let output = run_script(
        input,
        r#"
        let r = bru.runRequest("down");
        bru.setVar("status", r.getStatus());
        bru.setVar("statusText", r.getStatusText());
        "#,
    )
    .await
    .unwrap();
    let json = output_json(&output);

    assert!(output.is_success(), "{:?}", output.failures);
    assert_eq!(runtime_var(&json, "status"), Some(&json!(0)));
    assert_eq!(runtime_var(&json, "statusText"), Some(&json!("Network Error")));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_send_request_with_callback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "{{raw}}"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "hits": 3 })))
        .mount(&server)
        .await;

    let input = input(json!({
        "request": { "method": "GET", "url": "http://h" },
        "requestMap": {},
        "vars": { "envVars": [{ "name": "base", "value": server.uri() }] }
    }));

    let output = run_script(
        input,
        r#"
        let base = bru.getEnvVar("base");
        bru.sendRequest(#{ url: base + "/search", params: #{ q: "{{raw}}" } }, |err, res| {
            bru.setVar("err", type_of(err));
            bru.setVar("hits", res.getBody().hits);
            bru.setVar("code", res.status);
        });
        bru.sendRequest(#{ url: "http://127.0.0.1:9/x" }, |err, res| {
            bru.setVar("failed", type_of(err) == "string");
            bru.setVar("failedStatus", res.getStatus());
        });
        "#,
    )
    .await
    .unwrap();
    let json = output_json(&output);

    assert!(output.is_success(), "{:?}", output.failures);
    assert_eq!(runtime_var(&json, "err"), Some(&json!("()")));
    assert_eq!(runtime_var(&json, "hits"), Some(&json!(3)));
    assert_eq!(runtime_var(&json, "code"), Some(&json!(202)));
    assert_eq!(runtime_var(&json, "failed"), Some(&json!(true)));
    assert_eq!(runtime_var(&json, "failedStatus"), Some(&json!(0)));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_send_request_without_callback_throws_on_failure() {
    let input = input(json!({
        "request": { "method": "GET", "url": "http://h" },
        "requestMap": {}
    }));

    let output = run_script(
        input,
        r#"
        try {
            bru.sendRequest(#{ url: "http://127.0.0.1:9/x" });
            bru.setVar("caught", false);
        } catch (e) {
            bru.setVar("caught", true);
        }
        "#,
    )
    .await
    .unwrap();
    let json = output_json(&output);

    assert!(output.is_success(), "{:?}", output.failures);
    assert_eq!(runtime_var(&json, "caught"), Some(&json!(true)));
}
