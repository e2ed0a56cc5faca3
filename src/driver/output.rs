//! The output record written after a run.

use crate::error::{Error, Result};
use crate::models::{RequestSnapshot, ResponseSnapshot};
use crate::sandbox::{FailureKind, ScriptContext, ScriptError};
use crate::variables::Variable;
use serde::Serialize;

/// One failure observed during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub kind: FailureKind,
    pub message: String,
    /// Response variable being evaluated, for `run_response_vars`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
}

impl FailureRecord {
    pub fn from_script_error(err: &ScriptError, variable: Option<&str>) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            variable: variable.map(str::to_string),
        }
    }
}

/// Mutated state after a run, in its fixed field order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptOutput {
    pub req: RequestSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub res: Option<ResponseSnapshot>,
    pub runtime_vars: Vec<Variable>,
    pub env_vars: Vec<Variable>,
    pub global_env_vars: Vec<Variable>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureRecord>,
}

impl ScriptOutput {
    /// Snapshots the context after execution.
    pub fn collect(context: &ScriptContext, failures: Vec<FailureRecord>) -> Self {
        let vars = context.bru.to_map();
        Self {
            req: context.req.read().to_map(),
            res: context.res.as_ref().map(|res| res.read().to_map()),
            runtime_vars: vars.runtime_vars,
            env_vars: vars.env_vars,
            global_env_vars: vars.global_env_vars,
            failures,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Compact JSON rendering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::from)
    }
}
