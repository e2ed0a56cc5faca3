//! Conversions between script values and JSON.

use rhai::{Dynamic, EvalAltResult, Map};
use serde_json::Value;

/// Converts JSON into a script value. `null` becomes `()`.
pub fn to_dynamic(value: &Value) -> Dynamic {
    rhai::serde::to_dynamic(value).unwrap_or(Dynamic::UNIT)
}

/// Converts an optional JSON value; `None` becomes `()`.
pub fn opt_to_dynamic(value: Option<Value>) -> Dynamic {
    value.as_ref().map(to_dynamic).unwrap_or(Dynamic::UNIT)
}

/// Converts a script value into JSON.
///
/// `()` becomes `null`. Values with no JSON form (host objects, function
/// pointers) are rendered as their display text.
pub fn from_dynamic(value: &Dynamic) -> Value {
    if value.is_unit() {
        return Value::Null;
    }
    rhai::serde::from_dynamic::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

/// Deserializes a script object map into `T`, reporting shape errors as
/// script runtime errors.
pub fn map_into<T: serde::de::DeserializeOwned>(map: Map) -> Result<T, Box<EvalAltResult>> {
    let value = from_dynamic(&Dynamic::from_map(map));
    serde_json::from_value(value).map_err(|e| e.to_string().into())
}

/// Text form used when a script value is written into a string slot
/// (headers, log lines, response variables).
pub fn to_text(value: &Dynamic) -> String {
    if let Some(text) = value.read_lock::<rhai::ImmutableString>() {
        return text.to_string();
    }
    match from_dynamic(value) {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Reads the `raw` flag out of an options map such as `#{ raw: true }`.
pub fn raw_flag(options: &Map) -> bool {
    options
        .get("raw")
        .map(|flag| flag.as_bool().unwrap_or(!flag.is_unit()))
        .unwrap_or(false)
}
