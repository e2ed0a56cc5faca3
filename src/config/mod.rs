//! Configuration management for the script runner.
//!
//! This module provides configuration loading, validation, and access through a singleton pattern.
//! Configuration is read from the "script-runner" key of a settings value and merged with defaults.

pub mod schema;

pub use schema::SandboxConfig;

use log::warn;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::RwLock;

/// Settings key the configuration is read from.
pub const SETTINGS_KEY: &str = "script-runner";

/// Global configuration instance.
///
/// This is lazily initialized on first access and can be updated when settings change.
static CONFIG: Lazy<RwLock<SandboxConfig>> = Lazy::new(|| RwLock::new(SandboxConfig::default()));

/// Loads configuration from a settings JSON value.
///
/// Reads the "script-runner" settings, merges them with defaults, validates
/// the result, and updates the global configuration.
///
/// # Arguments
///
/// * `settings_json` - Optional JSON value containing user settings under "script-runner" key
///
/// # Returns
///
/// `Ok(SandboxConfig)` with the loaded configuration, or `Err` if validation fails.
///
/// # Example
///
/// ```no_run
/// use bru_script::config::load_config;
/// use serde_json::json;
///
/// let settings = json!({
///     "script-runner": {
///         "timeout": 5000
///     }
/// });
///
/// let config = load_config(Some(settings)).unwrap();
/// assert_eq!(config.timeout, 5000);
/// ```
pub fn load_config(settings_json: Option<Value>) -> Result<SandboxConfig, String> {
    let config = parse_config(settings_json.as_ref())?;

    if let Ok(mut global_config) = CONFIG.write() {
        *global_config = config.clone();
    }

    Ok(config)
}

/// Builds a configuration from a settings JSON value without touching the
/// global configuration.
///
/// Same merge and validation rules as [`load_config`]; used for per-run
/// settings.
pub fn parse_config(settings_json: Option<&Value>) -> Result<SandboxConfig, String> {
    let mut config = SandboxConfig::default();

    if let Some(section) = settings_json.and_then(|s| s.get(SETTINGS_KEY)) {
        match serde_json::from_value::<SandboxConfig>(section.clone()) {
            Ok(user_config) => {
                config = config.merge(&user_config);
            }
            Err(e) => {
                warn!(
                    "Failed to parse {} settings: {}. Using defaults.",
                    SETTINGS_KEY, e
                );
            }
        }
    }

    config
        .validate()
        .map_err(|e| format!("Invalid configuration: {}", e))?;

    Ok(config)
}

/// Gets the current global configuration.
///
/// Returns a clone of the current configuration, or the defaults if nothing
/// has been loaded yet.
pub fn get_config() -> SandboxConfig {
    CONFIG
        .read()
        .map(|c| c.clone())
        .unwrap_or_else(|_| SandboxConfig::default())
}

/// Updates the configuration in place.
///
/// Reverts to defaults if the result does not validate.
///
/// # Arguments
///
/// * `updater` - A closure that modifies the configuration
pub fn update_config<F>(updater: F)
where
    F: FnOnce(&mut SandboxConfig),
{
    if let Ok(mut config) = CONFIG.write() {
        updater(&mut config);

        if let Err(e) = config.validate() {
            warn!("Configuration validation failed after update: {}", e);
            *config = SandboxConfig::default();
        }
    }
}

/// Resets the configuration to defaults.
pub fn reset_config() {
    if let Ok(mut config) = CONFIG.write() {
        *config = SandboxConfig::default();
    }
}
