//! The input record a script run is built from.

use crate::bru::RequestMap;
use crate::error::{Error, Result};
use crate::models::HttpRequest;
use crate::transport::ResponseSpec;
use crate::variables::VariableSeed;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

/// A response variable: `name` receives the value of the expression in
/// `value`, evaluated against the response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Variable seeds plus the response variable definitions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptVars {
    #[serde(flatten)]
    pub seed: VariableSeed,
    #[serde(default)]
    pub response_vars: Vec<ResponseVar>,
}

/// Everything needed to run one script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptInput {
    pub request: HttpRequest,
    #[serde(default)]
    pub response: Option<ResponseSpec>,
    /// Request definitions reachable through `bru.runRequest`. Required,
    /// but may be empty.
    #[serde(default)]
    pub request_map: Option<RequestMap>,
    #[serde(default)]
    pub vars: ScriptVars,
    /// Collection root for module resolution; defaults to the working
    /// directory.
    #[serde(default)]
    pub collection_path: Option<PathBuf>,
    /// Settings value carrying an optional `"script-runner"` section.
    #[serde(default)]
    pub settings: Option<Value>,
}

impl ScriptInput {
    /// Parses and validates an input record.
    ///
    /// # Returns
    ///
    /// The input, or [`Error::InputValidation`] when the JSON is malformed
    /// or a required field is missing.
    pub fn from_json(json: &str) -> Result<Self> {
        let input: ScriptInput = serde_json::from_str(json)
            .map_err(|e| Error::InputValidation(format!("config is not valid: {}", e)))?;
        input.validate()?;
        Ok(input)
    }

    /// Checks the fields every run needs.
    pub fn validate(&self) -> Result<()> {
        self.request.validate().map_err(Error::InputValidation)?;
        if self.request_map.is_none() {
            return Err(Error::InputValidation(
                "config must contain a requestMap field".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory that module imports resolve against.
    pub fn collection_root(&self) -> PathBuf {
        self.collection_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
