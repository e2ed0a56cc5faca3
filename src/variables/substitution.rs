//! Placeholder substitution.
//!
//! Replaces `{{name}}` patterns in text with resolved values. Substitution
//! is a single pass: values are inserted verbatim and never rescanned, so a
//! value containing `{{other}}` stays literal. Names are matched exactly as
//! written between the braces, without trimming.

use super::mock::MockDataProvider;
use crate::models::body::value_to_text;
use log::warn;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

/// Sigil that routes a placeholder to the mock data provider.
pub const MOCK_SIGIL: char = '$';

/// Cached regex pattern for matching `{{variableName}}`.
static VARIABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("Failed to compile variable regex"));

/// Substitutes every `{{name}}` in `text`.
///
/// # Arguments
///
/// * `text` - The input text containing placeholders
/// * `resolve` - Looks a plain name up across variable scopes
/// * `mock` - Generates values for `{{$name}}` placeholders
///
/// # Returns
///
/// The substituted text. Unresolvable placeholders are left as written.
///
/// # Examples
///
/// ```
/// use bru_script::variables::mock::FakeData;
/// use bru_script::variables::substitution::substitute_variables;
/// use serde_json::json;
///
/// let text = substitute_variables(
///     "GET {{host}}/users/{{id}}",
///     |name| (name == "host").then(|| json!("https://api.example.com")),
///     &FakeData,
/// );
/// assert_eq!(text, "GET https://api.example.com/users/{{id}}");
/// ```
pub fn substitute_variables<F>(text: &str, resolve: F, mock: &dyn MockDataProvider) -> String
where
    F: Fn(&str) -> Option<Value>,
{
    if !text.contains("{{") {
        return text.to_string();
    }

    VARIABLE_REGEX
        .replace_all(text, |caps: &Captures<'_>| {
            let placeholder = &caps[0];
            let name = &caps[1];

            if let Some(mock_name) = name.strip_prefix(MOCK_SIGIL) {
                return match mock.generate(mock_name) {
                    Some(value) => value,
                    None => {
                        warn!("Unknown mock data function '{}', leaving placeholder", mock_name);
                        placeholder.to_string()
                    }
                };
            }

            match resolve(name) {
                Some(value) => value_to_text(&value),
                None => placeholder.to_string(),
            }
        })
        .into_owned()
}
