//! Integration tests module for the script runner
//!
//! Shared helpers for building driver inputs and collection directories.

pub mod end_to_end_test;
pub mod request_chaining_test;

use bru_script::driver::ScriptInput;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test environment (run once)
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Builds a driver input from JSON, panicking on malformed fixtures.
pub fn input(json: Value) -> ScriptInput {
    init_test_env();
    let input: ScriptInput = serde_json::from_value(json).expect("fixture must be a valid input");
    input.validate().expect("fixture must validate");
    input
}

/// Writes a file below `root`, creating parent directories.
pub fn write_module(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create module directory");
    }
    fs::write(path, contents).expect("Failed to write module");
}

/// Value of a runtime variable in a serialized output record.
pub fn runtime_var<'a>(output: &'a Value, name: &str) -> Option<&'a Value> {
    output["runtimeVars"]
        .as_array()?
        .iter()
        .find(|var| var["name"] == name)
        .map(|var| &var["value"])
}
