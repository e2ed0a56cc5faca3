//! End-to-end script execution tests
//!
//! These tests drive whole runs through the driver and the executor:
//! interpolation, model mutation, module imports, limits and cancellation.

use super::{input, runtime_var, write_module};
use bru_script::bru::Bru;
use bru_script::config::{self, SandboxConfig};
use bru_script::driver::{run_response_vars, run_script};
use bru_script::models::HttpRequest;
use bru_script::sandbox::{CancelHandle, FailureKind, SandboxExecutor, ScriptContext, ScriptError};
use bru_script::transport::ReqwestTransport;
use bru_script::variables::{FakeData, VariableStore};
use serde_json::{json, Value};
use serial_test::serial;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn output_json(output: &bru_script::driver::ScriptOutput) -> Value {
    serde_json::from_str(&output.to_json().unwrap()).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_interpolated_runtime_variable() {
    let input = input(json!({
        "request": { "method": "GET", "url": "http://host/{{base}}", "headers": {} },
        "requestMap": {},
        "vars": { "runtimeVars": [{ "name": "base", "value": "v1" }] }
    }));

    let output = run_script(input, r#"bru.setVar("x", bru.interpolate("{{base}}") + "-done")"#)
        .await
        .unwrap();
    let json = output_json(&output);

    assert!(output.is_success());
    assert_eq!(runtime_var(&json, "x"), Some(&json!("v1-done")));
    assert_eq!(runtime_var(&json, "base"), Some(&json!("v1")));
    assert_eq!(json["runtimeVars"].as_array().unwrap().len(), 2);
    // The request URL itself is left for the host to interpolate.
    assert_eq!(json["req"]["url"], "http://host/{{base}}");
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_precedence_and_missing_placeholders() {
    let input = input(json!({
        "request": { "method": "GET", "url": "http://h" },
        "requestMap": {},
        "vars": {
            "runtimeVars": [{ "name": "name", "value": "runtime" }],
            "envVars": [{ "name": "name", "value": "env" }, { "name": "only_env", "value": "e" }],
            "globalEnvVars": [{ "name": "only_env", "value": "global" }]
        }
    }));

    let output = run_script(
        input,
        r#"
        bru.setVar("a", bru.interpolate("{{name}}"));
        bru.setVar("b", bru.interpolate("{{only_env}}"));
        bru.setVar("c", bru.interpolate("{{missing}}"));
        bru.setVar("d", bru.interpolate("{{$randomUUID}}"));
        "#,
    )
    .await
    .unwrap();
    let json = output_json(&output);

    assert_eq!(runtime_var(&json, "a"), Some(&json!("runtime")));
    assert_eq!(runtime_var(&json, "b"), Some(&json!("e")));
    assert_eq!(runtime_var(&json, "c"), Some(&json!("{{missing}}")));
    assert_eq!(runtime_var(&json, "d").and_then(Value::as_str).map(str::len), Some(36));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_request_and_response_mutations_are_serialized() {
    let input = input(json!({
        "request": {
            "method": "POST",
            "url": "http://h/items",
            "headers": { "content-type": "application/json" },
            "body": "{\"draft\":true}"
        },
        "response": {
            "status": 201,
            "statusText": "Created",
            "headers": { "Content-Type": "application/json" },
            "body": { "id": 7 }
        },
        "requestMap": {}
    }));

    let output = run_script(
        input,
        r#"
        let body = req.getBody();
        body.draft = false;
        req.setBody(body);
        req.setHeader("x-trace", "abc");
        req.setMethod("PUT");
        bru.setEnvVar("created", res("id"));
        bru.setVar("ct", res.getHeader("content-type"));
        res.setBody(#{ id: res.getBody().id, seen: true });
        "#,
    )
    .await
    .unwrap();
    let json = output_json(&output);

    assert!(output.is_success(), "{:?}", output.failures);
    assert_eq!(json["req"]["method"], "PUT");
    assert_eq!(json["req"]["headers"]["x-trace"], "abc");
    assert_eq!(json["req"]["body"], json!({ "draft": false }));
    assert_eq!(json["res"]["status"], 201);
    // Response bodies are stored as text once a script replaces them.
    let body: Value = serde_json::from_str(json["res"]["body"].as_str().unwrap()).unwrap();
    assert_eq!(body, json!({ "id": 7, "seen": true }));
    assert_eq!(json["envVars"], json!([{ "name": "created", "value": 7 }]));
    assert_eq!(runtime_var(&json, "ct"), Some(&json!("application/json")));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_nested_modules_resolve_from_collection_root() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_module(root, "a.rhai", r#"import "./scripts/nested/b" as b; export const value = b::value + "a";"#);
    write_module(
        root,
        "scripts/nested/b.rhai",
        r#"import "./lib/c" as c; export const value = c::value + "b";"#,
    );
    write_module(root, "lib/c.rhai", r#"bru.setVar("loaded", "root-c"); export const value = "c";"#);
    write_module(root, "scripts/nested/lib/c.rhai", r#"export const value = "wrong";"#);
    write_module(
        root,
        "node_modules/greet/index.rhai",
        r#"fn hello(name) { `hello ${name}` }"#,
    );

    let input = input(json!({
        "request": { "method": "GET", "url": "http://h" },
        "requestMap": {},
        "collectionPath": root
    }));

    let output = run_script(
        input,
        r#"
        import "./a" as a;
        import "greet" as greet;
        import "uuid" as uuid;
        bru.setVar("chain", a::value);
        bru.setVar("greeting", greet::hello("bru"));
        bru.setVar("valid", uuid::validate(uuid::v4()));
        "#,
    )
    .await
    .unwrap();
    let json = output_json(&output);

    assert!(output.is_success(), "{:?}", output.failures);
    assert_eq!(runtime_var(&json, "chain"), Some(&json!("cba")));
    assert_eq!(runtime_var(&json, "loaded"), Some(&json!("root-c")));
    assert_eq!(runtime_var(&json, "greeting"), Some(&json!("hello bru")));
    assert_eq!(runtime_var(&json, "valid"), Some(&json!(true)));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_missing_module_is_reported() {
    let dir = TempDir::new().unwrap();
    let input = input(json!({
        "request": { "method": "GET", "url": "http://h" },
        "requestMap": {},
        "collectionPath": dir.path()
    }));

    let output = run_script(input, r#"import "./nowhere" as n;"#).await.unwrap();

    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].kind, FailureKind::ModuleResolution);
    assert!(output.failures[0].message.contains("./nowhere"));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_infinite_loop_is_stopped_by_budget() {
    let input = input(json!({
        "request": { "method": "GET", "url": "http://h" },
        "requestMap": {},
        "settings": { "script-runner": { "timeout": 200 } }
    }));

    let started = Instant::now();
    let output = run_script(input, r#"bru.setVar("before", 1); loop { }"#)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    // Per-run settings do not leak into the process-wide configuration.
    assert_eq!(config::get_config(), SandboxConfig::default());
    assert_eq!(output.failures[0].kind, FailureKind::Timeout);
    assert_eq!(output.failures[0].message, "Script timeout after 200ms");
    // Mutations made before the timeout survive.
    assert_eq!(output.runtime_vars.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_cancellation_stops_a_running_script() {
    let bru = Bru::new(
        VariableStore::default(),
        HashMap::new(),
        Arc::new(ReqwestTransport::default()),
        Arc::new(FakeData),
    );
    let ctx = ScriptContext::new(HttpRequest::new("GET", "http://h"), None, bru, ".");
    let executor = SandboxExecutor::new(SandboxConfig::default());

    let cancel = CancelHandle::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = executor
        .execute_with_cancel("bru.setVar(\"started\", true); bru.sleep(60000);", &ctx, cancel)
        .await
        .unwrap_err();

    assert_eq!(err, ScriptError::Cancelled);
    assert_eq!(ctx.bru.get_var("started"), Some(json!(true)));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_console_and_host_services() {
    let dir = TempDir::new().unwrap();
    let input = input(json!({
        "request": { "method": "GET", "url": "http://h" },
        "requestMap": {},
        "collectionPath": dir.path(),
        "vars": { "collectionVars": [{ "name": "process.env.API_KEY", "value": "k-1" }] }
    }));

    let output = run_script(
        input,
        r#"
        console.log("writing", 1);
        print("print goes to the log");
        fs.writeFile("out/data.txt", "payload");
        bru.setVar("read", fs.readFile(path.join("out", "data.txt")));
        bru.setVar("ext", path.extname("x/y.json"));
        bru.setVar("key", process.env("API_KEY"));
        "#,
    )
    .await
    .unwrap();
    let json = output_json(&output);

    assert!(output.is_success(), "{:?}", output.failures);
    assert_eq!(runtime_var(&json, "read"), Some(&json!("payload")));
    assert_eq!(runtime_var(&json, "ext"), Some(&json!(".json")));
    assert_eq!(runtime_var(&json, "key"), Some(&json!("k-1")));
    assert!(dir.path().join("out/data.txt").exists());
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_response_vars_pipeline() {
    let input = input(json!({
        "request": { "method": "GET", "url": "http://h" },
        "response": {
            "status": 200,
            "headers": { "content-type": "application/json" },
            "body": "{\"data\":{\"token\":\"t-1\",\"count\":3}}"
        },
        "requestMap": {},
        "vars": {
            "responseVars": [
                { "name": "token", "value": "res(\"data.token\")" },
                { "name": "bad", "value": "undefined_fn()" },
                { "name": "count", "value": "res(\"data.count\") + 1" }
            ]
        }
    }));

    let output = run_response_vars(input).await.unwrap();
    let json = output_json(&output);

    assert_eq!(runtime_var(&json, "token"), Some(&json!("t-1")));
    assert_eq!(runtime_var(&json, "count"), Some(&json!("4")));
    assert_eq!(output.failures.len(), 1);
    assert_eq!(json["failures"][0]["variable"], "bad");
    assert_eq!(json["failures"][0]["kind"], "runtime");
}
