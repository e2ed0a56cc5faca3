//! Configuration schema for the script runner.
//!
//! Defines the tunable limits of the sandbox and the transport defaults used
//! by `bru.runRequest` / `bru.sendRequest`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sandbox configuration.
///
/// Read from the `"script-runner"` key of a settings value. Missing fields
/// fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxConfig {
    /// Script time budget in milliseconds.
    ///
    /// Covers compilation, module loading and evaluation, including time
    /// spent waiting on outbound requests. Defaults to 30000ms.
    ///
    /// Must be greater than 0.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Maximum number of engine operations, 0 for no limit.
    #[serde(default)]
    pub max_operations: u64,

    /// Maximum function call depth. Defaults to 64.
    #[serde(default = "default_max_call_levels")]
    pub max_call_levels: usize,

    /// Maximum string length in characters, 0 for no limit.
    #[serde(default)]
    pub max_string_size: usize,

    /// Directory under the collection root holding collection-local
    /// packages. Defaults to "node_modules".
    #[serde(default = "default_packages_dir")]
    pub packages_dir: String,

    /// Extension appended to module ids during resolution, without the dot.
    /// Defaults to "rhai".
    #[serde(default = "default_script_extension")]
    pub script_extension: String,

    /// Default timeout for outbound requests in milliseconds.
    ///
    /// Used when a request definition carries no timeout of its own.
    /// Defaults to 30000ms.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_operations: 0,
            max_call_levels: default_max_call_levels(),
            max_string_size: 0,
            packages_dir: default_packages_dir(),
            script_extension: default_script_extension(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl SandboxConfig {
    /// Validates the configuration.
    ///
    /// # Returns
    ///
    /// `Ok(())` if all settings are valid, or `Err` with a descriptive error message.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout == 0 {
            return Err("timeout must be greater than 0".to_string());
        }

        if self.request_timeout == 0 {
            return Err("requestTimeout must be greater than 0".to_string());
        }

        if self.max_call_levels == 0 {
            return Err("maxCallLevels must be greater than 0".to_string());
        }

        if self.packages_dir.trim().is_empty() {
            return Err("packagesDir must not be empty".to_string());
        }

        if self.script_extension.trim_start_matches('.').is_empty() {
            return Err("scriptExtension must not be empty".to_string());
        }

        Ok(())
    }

    /// Script budget as a `Duration`.
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Merges this configuration with another, using values from `other` where present.
    ///
    /// # Arguments
    ///
    /// * `other` - Configuration to merge with (takes precedence)
    ///
    /// # Returns
    ///
    /// A new `SandboxConfig` with merged values.
    pub fn merge(&self, other: &SandboxConfig) -> Self {
        Self {
            timeout: other.timeout,
            max_operations: other.max_operations,
            max_call_levels: other.max_call_levels,
            max_string_size: other.max_string_size,
            packages_dir: other.packages_dir.clone(),
            script_extension: other.script_extension.clone(),
            request_timeout: other.request_timeout,
        }
    }
}

fn default_timeout() -> u64 {
    30000
}

fn default_max_call_levels() -> usize {
    64
}

fn default_packages_dir() -> String {
    "node_modules".to_string()
}

fn default_script_extension() -> String {
    "rhai".to_string()
}

fn default_request_timeout() -> u64 {
    30000
}
