//! Body helpers shared by the request and response models.
//!
//! Both models store the raw body and compute the parsed form on read. The
//! helpers here decide when a body counts as JSON and perform the lenient
//! parse used by `getBody`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Options accepted by `getBody` / `setBody`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BodyOptions {
    /// Bypass JSON handling and work with the stored raw body.
    pub raw: bool,
}

impl BodyOptions {
    /// Options requesting the raw body.
    pub fn raw() -> Self {
        Self { raw: true }
    }
}

/// Returns `true` when the `Content-Type` header (matched case-insensitively)
/// contains the substring `json`.
///
/// # Arguments
///
/// * `headers` - Iterator over `(name, value)` header pairs
pub fn has_json_content_type<'a, I>(headers: I) -> bool
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    headers
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .map_or(false, |(_, value)| value.contains("json"))
}

/// Parses a textual body as JSON, falling back to the original value.
///
/// Non-string values are returned unchanged. Parse failures never surface as
/// errors; the caller receives the raw string instead.
pub fn safe_parse_json(value: &Value) -> Value {
    match value {
        Value::String(text) => serde_json::from_str(text).unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

/// Renders a value the way it is substituted into text.
///
/// Strings are used verbatim, everything else is rendered as compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Deserializes a header map whose values may be any JSON value.
///
/// Hosts send numbers and booleans as header values (`"X-Retry": 3`); they
/// are stored in their text form.
pub fn deserialize_header_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, value)| (name, value_to_text(&value)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_content_type_is_case_insensitive() {
        assert!(has_json_content_type([("content-type", "application/json")]));
        assert!(has_json_content_type([("CONTENT-TYPE", "application/vnd.api+json")]));
        assert!(!has_json_content_type([("Content-Type", "text/plain")]));
        assert!(!has_json_content_type([("Accept", "application/json")]));
    }

    #[test]
    fn test_safe_parse_json() {
        assert_eq!(safe_parse_json(&json!("{\"a\":1}")), json!({"a": 1}));
        assert_eq!(safe_parse_json(&json!("not json")), json!("not json"));
        assert_eq!(safe_parse_json(&json!({"b": 2})), json!({"b": 2}));
        assert_eq!(safe_parse_json(&Value::Null), Value::Null);
    }

    #[test]
    fn test_header_map_accepts_scalars() {
        #[derive(Deserialize)]
        struct Headers {
            #[serde(deserialize_with = "deserialize_header_map")]
            headers: BTreeMap<String, String>,
        }

        let parsed: Headers = serde_json::from_value(json!({
            "headers": { "X-Retry": 3, "X-Debug": true, "Accept": "*/*" }
        }))
        .unwrap();

        assert_eq!(parsed.headers["X-Retry"], "3");
        assert_eq!(parsed.headers["X-Debug"], "true");
        assert_eq!(parsed.headers["Accept"], "*/*");
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!("v1")), "v1");
        assert_eq!(value_to_text(&json!(0)), "0");
        assert_eq!(value_to_text(&json!(true)), "true");
        assert_eq!(value_to_text(&json!({"a": [1]})), "{\"a\":[1]}");
    }
}
