//! Boundary glue between a host process and the sandbox.
//!
//! The driver turns a [`ScriptInput`] into models, a variable store and a
//! capability context, runs the script (or the response variables) through
//! a [`SandboxExecutor`], and snapshots the mutated state into a
//! [`ScriptOutput`]. Input validation errors are returned before anything
//! runs; every failure after that becomes a [`FailureRecord`] in the output.

pub mod input;
pub mod output;

pub use input::{ResponseVar, ScriptInput, ScriptVars};
pub use output::{FailureRecord, ScriptOutput};

use crate::bru::Bru;
use crate::config::{self, SandboxConfig};
use crate::error::{Error, Result};
use crate::models::HttpResponse;
use crate::sandbox::{SandboxExecutor, ScriptContext};
use crate::transport::{ReqwestTransport, Transport};
use crate::variables::{FakeData, VariableStore};
use log::{debug, warn};
use serde_json::Value;
use std::sync::Arc;

/// Per-run configuration: the input's own settings when present, otherwise
/// the process-wide configuration. Never writes the global.
fn resolve_config(input: &ScriptInput) -> Result<SandboxConfig> {
    match &input.settings {
        Some(settings) => config::parse_config(Some(settings)).map_err(Error::InputValidation),
        None => Ok(config::get_config()),
    }
}

fn build_context(input: ScriptInput, transport: Arc<dyn Transport>) -> ScriptContext {
    let root = input.collection_root();
    let bru = Bru::new(
        VariableStore::new(input.vars.seed),
        input.request_map.unwrap_or_default(),
        transport,
        Arc::new(FakeData),
    );
    ScriptContext::new(
        input.request,
        input.response.map(HttpResponse::from_spec),
        bru,
        root,
    )
}

/// Runs one pre-request or post-response script.
///
/// # Arguments
///
/// * `input` - Models, variables and settings for the run
/// * `script` - Script source
///
/// # Returns
///
/// The output record (check [`ScriptOutput::is_success`]), or an
/// [`Error::InputValidation`] if the input is unusable.
pub async fn run_script(input: ScriptInput, script: &str) -> Result<ScriptOutput> {
    input.validate()?;
    let config = resolve_config(&input)?;
    let transport = Arc::new(ReqwestTransport::new(config.request_timeout));
    execute_script(input, script, config, transport).await
}

/// [`run_script`] with a caller-supplied transport.
pub async fn run_script_with_transport(
    input: ScriptInput,
    script: &str,
    transport: Arc<dyn Transport>,
) -> Result<ScriptOutput> {
    input.validate()?;
    let config = resolve_config(&input)?;
    execute_script(input, script, config, transport).await
}

async fn execute_script(
    input: ScriptInput,
    script: &str,
    config: SandboxConfig,
    transport: Arc<dyn Transport>,
) -> Result<ScriptOutput> {
    let executor = SandboxExecutor::new(config);
    let context = build_context(input, transport);

    let mut failures = Vec::new();
    match executor.execute(script, &context).await {
        Ok(outcome) => debug!("Script finished in {:?}", outcome.elapsed),
        Err(err) => {
            warn!("Script failed: {}", err);
            failures.push(FailureRecord::from_script_error(&err, None));
        }
    }

    Ok(ScriptOutput::collect(&context, failures))
}

/// Evaluates the input's response variables against its response.
///
/// Each enabled entry's `value` is evaluated as an expression. A result
/// other than `()` is stored as a runtime variable: strings as-is, anything
/// else as its JSON text. A failing entry is recorded and the remaining
/// entries still run.
pub async fn run_response_vars(input: ScriptInput) -> Result<ScriptOutput> {
    validate_response_vars(&input)?;
    let config = resolve_config(&input)?;
    let transport = Arc::new(ReqwestTransport::new(config.request_timeout));
    execute_response_vars(input, config, transport).await
}

/// [`run_response_vars`] with a caller-supplied transport.
pub async fn run_response_vars_with_transport(
    input: ScriptInput,
    transport: Arc<dyn Transport>,
) -> Result<ScriptOutput> {
    validate_response_vars(&input)?;
    let config = resolve_config(&input)?;
    execute_response_vars(input, config, transport).await
}

fn validate_response_vars(input: &ScriptInput) -> Result<()> {
    input.validate()?;
    if input.response.is_none() {
        return Err(Error::InputValidation(
            "config must contain a response to evaluate response variables".to_string(),
        ));
    }
    Ok(())
}

async fn execute_response_vars(
    input: ScriptInput,
    config: SandboxConfig,
    transport: Arc<dyn Transport>,
) -> Result<ScriptOutput> {
    let executor = SandboxExecutor::new(config);
    let response_vars = input.vars.response_vars.clone();
    let context = build_context(input, transport);

    let mut failures = Vec::new();
    for var in response_vars.iter().filter(|var| var.enabled) {
        match executor.execute(&var.value, &context).await {
            Ok(outcome) => match outcome.value {
                Value::Null => debug!("Response variable '{}' evaluated to nothing", var.name),
                Value::String(text) => context.bru.set_var(&var.name, Value::String(text)),
                other => context.bru.set_var(&var.name, Value::String(other.to_string())),
            },
            Err(err) => {
                warn!("Response variable '{}' failed: {}", var.name, err);
                failures.push(FailureRecord::from_script_error(&err, Some(&var.name)));
            }
        }
    }

    Ok(ScriptOutput::collect(&context, failures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::FailureKind;
    use serde_json::json;
    use serial_test::serial;

    fn input(json: Value) -> ScriptInput {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn test_script_output_shape() {
        let input = input(json!({
            "request": { "method": "GET", "url": "http://host/{{base}}", "headers": {} },
            "requestMap": {},
            "vars": { "runtimeVars": [{ "name": "base", "value": "v1" }] }
        }));

        let output = run_script(input, r#"bru.setVar("x", bru.interpolate("{{base}}") + "-done");"#)
            .await
            .unwrap();

        assert!(output.is_success());
        let text = output.to_json().unwrap();
        let positions: Vec<usize> = ["\"req\"", "\"runtimeVars\"", "\"envVars\"", "\"globalEnvVars\""]
            .iter()
            .map(|key| text.find(key).unwrap())
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));

        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            json["runtimeVars"],
            json!([{ "name": "base", "value": "v1" }, { "name": "x", "value": "v1-done" }])
        );
        assert!(json.get("res").is_none());
        assert!(json.get("failures").is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn test_script_failure_is_recorded() {
        let input = input(json!({
            "request": { "method": "GET", "url": "http://h" },
            "requestMap": {}
        }));

        let output = run_script(input, r#"bru.setVar("a", 1); throw "nope";"#)
            .await
            .unwrap();

        assert!(!output.is_success());
        assert_eq!(output.failures[0].kind, FailureKind::Runtime);
        assert_eq!(output.runtime_vars.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn test_response_vars_continue_after_failure() {
        let input = input(json!({
            "request": { "method": "GET", "url": "http://h" },
            "response": {
                "status": 200,
                "headers": { "content-type": "application/json" },
                "body": { "id": 42, "name": "ada", "tags": ["a"] }
            },
            "requestMap": {},
            "vars": {
                "responseVars": [
                    { "name": "id", "value": "res(\"id\")" },
                    { "name": "broken", "value": "res(" },
                    { "name": "name", "value": "res.getBody().name" },
                    { "name": "tags", "value": "res(\"tags\")" },
                    { "name": "missing", "value": "res(\"nope\")" },
                    { "name": "skipped", "value": "\"x\"", "enabled": false }
                ]
            }
        }));

        let output = run_response_vars(input).await.unwrap();

        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.failures[0].variable.as_deref(), Some("broken"));
        assert_eq!(output.failures[0].kind, FailureKind::Compilation);

        let vars: Vec<(&str, &Value)> = output
            .runtime_vars
            .iter()
            .map(|v| (v.name.as_str(), &v.value))
            .collect();
        assert_eq!(
            vars,
            vec![
                ("id", &json!("42")),
                ("name", &json!("ada")),
                ("tags", &json!("[\"a\"]")),
            ]
        );
        assert!(output.res.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn test_response_vars_require_response() {
        let input = input(json!({
            "request": { "method": "GET", "url": "http://h" },
            "requestMap": {}
        }));
        assert!(matches!(
            run_response_vars(input).await.unwrap_err(),
            Error::InputValidation(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn test_settings_apply_to_their_own_run_only() {
        config::reset_config();
        let limited = input(json!({
            "request": { "method": "GET", "url": "http://h" },
            "requestMap": {},
            "settings": { "script-runner": { "timeout": 100 } }
        }));

        let output = run_script(limited, "loop { }").await.unwrap();
        assert_eq!(output.failures[0].kind, FailureKind::Timeout);
        assert_eq!(config::get_config().timeout, 30000);

        let plain = input(json!({
            "request": { "method": "GET", "url": "http://h" },
            "requestMap": {}
        }));
        let output = run_script(plain, r#"bru.sleep(300); bru.setVar("slept", true);"#)
            .await
            .unwrap();
        assert!(output.is_success(), "{:?}", output.failures);
        assert_eq!(output.runtime_vars.len(), 1);
    }
}
