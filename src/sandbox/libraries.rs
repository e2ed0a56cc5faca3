//! Allow-listed utility libraries available through `import`.
//!
//! Each library is a pre-built native module. Ids on this list never touch
//! the file system.

use super::convert::{from_dynamic, to_dynamic};
use crate::models::query::query;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::format::{Item, StrftimeItems};
use chrono::Utc;
use once_cell::sync::Lazy;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rhai::{Dynamic, EvalAltResult, ImmutableString, Module, Shared, INT};
use serde_json::Value;
use sha2::{Digest, Sha256, Sha512};
use std::collections::HashMap;

type FnResult<T> = Result<T, Box<EvalAltResult>>;

/// Ids resolved without consulting the collection.
pub const ALLOWED_LIBRARIES: &[&str] = &[
    "uuid", "nanoid", "crypto-js", "atob", "btoa", "moment", "lodash", "chai",
];

const NANOID_DEFAULT_SIZE: usize = 21;

static LIBRARIES: Lazy<HashMap<&'static str, Shared<Module>>> = Lazy::new(|| {
    ALLOWED_LIBRARIES
        .iter()
        .filter_map(|&id| build_library(id).map(|module| (id, Shared::new(module))))
        .collect()
});

fn build_library(id: &str) -> Option<Module> {
    let module = match id {
        "uuid" => uuid_module(),
        "nanoid" => nanoid_module(),
        "crypto-js" => crypto_module(),
        "atob" => atob_module(),
        "btoa" => btoa_module(),
        "moment" => moment_module(),
        "lodash" => lodash_module(),
        "chai" => chai_module(),
        _ => return None,
    };
    Some(module)
}

/// Returns the library module for `id`, if it is allow-listed.
pub fn library(id: &str) -> Option<Shared<Module>> {
    LIBRARIES.get(id).cloned()
}

fn finish(mut module: Module, id: &str) -> Module {
    module.set_id(id);
    module.build_index();
    module
}

fn uuid_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("v4", || -> FnResult<String> { Ok(uuid::Uuid::new_v4().to_string()) });
    module.set_native_fn("validate", |s: ImmutableString| -> FnResult<bool> {
        Ok(uuid::Uuid::parse_str(&s).is_ok())
    });
    finish(module, "uuid")
}

fn nanoid(size: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(size)
        .map(char::from)
        .collect()
}

fn nanoid_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("nanoid", || -> FnResult<String> { Ok(nanoid(NANOID_DEFAULT_SIZE)) });
    module.set_native_fn("nanoid", |size: INT| -> FnResult<String> {
        let size = usize::try_from(size).map_err(|_| "nanoid size must not be negative")?;
        Ok(nanoid(size))
    });
    finish(module, "nanoid")
}

fn decode_base64(s: &str) -> FnResult<String> {
    let bytes = STANDARD
        .decode(s.trim())
        .map_err(|e| format!("invalid base64: {}", e))?;
    String::from_utf8(bytes).map_err(|e| format!("decoded base64 is not UTF-8: {}", e).into())
}

fn crypto_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("sha256", |s: ImmutableString| -> FnResult<String> {
        Ok(hex(&Sha256::digest(s.as_bytes())))
    });
    module.set_native_fn("sha512", |s: ImmutableString| -> FnResult<String> {
        Ok(hex(&Sha512::digest(s.as_bytes())))
    });
    module.set_native_fn("base64_encode", |s: ImmutableString| -> FnResult<String> {
        Ok(STANDARD.encode(s.as_bytes()))
    });
    module.set_native_fn("base64_decode", |s: ImmutableString| -> FnResult<String> {
        decode_base64(&s)
    });
    finish(module, "crypto-js")
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn atob_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("atob", |s: ImmutableString| -> FnResult<String> { decode_base64(&s) });
    finish(module, "atob")
}

fn btoa_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("btoa", |s: ImmutableString| -> FnResult<String> {
        Ok(STANDARD.encode(s.as_bytes()))
    });
    finish(module, "btoa")
}

fn moment_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("now", || -> FnResult<String> { Ok(Utc::now().to_rfc3339()) });
    module.set_native_fn("unix", || -> FnResult<INT> { Ok(Utc::now().timestamp()) });
    module.set_native_fn("format", |pattern: ImmutableString| -> FnResult<String> {
        let items: Vec<Item<'_>> = StrftimeItems::new(pattern.as_str()).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(format!("invalid date format '{}'", pattern).into());
        }
        Ok(Utc::now().format_with_items(items.into_iter()).to_string())
    });
    finish(module, "moment")
}

fn lodash_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("get", |value: Dynamic, path: ImmutableString| -> FnResult<Dynamic> {
        Ok(query(&from_dynamic(&value), &path)
            .map(|found| to_dynamic(&found))
            .unwrap_or(Dynamic::UNIT))
    });
    module.set_native_fn("has", |value: Dynamic, path: ImmutableString| -> FnResult<bool> {
        Ok(query(&from_dynamic(&value), &path).is_some())
    });
    module.set_native_fn("is_empty", |value: Dynamic| -> FnResult<bool> {
        Ok(match from_dynamic(&value) {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Bool(_) | Value::Number(_) => true,
        })
    });
    finish(module, "lodash")
}

fn assertion(passed: bool, message: impl FnOnce() -> String) -> FnResult<()> {
    if passed {
        Ok(())
    } else {
        Err(format!("AssertionError: {}", message()).into())
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn chai_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("ok", |value: Dynamic| -> FnResult<()> {
        let value = from_dynamic(&value);
        assertion(truthy(&value), || format!("expected {} to be truthy", value))
    });
    module.set_native_fn("equal", |actual: Dynamic, expected: Dynamic| -> FnResult<()> {
        let (actual, expected) = (from_dynamic(&actual), from_dynamic(&expected));
        assertion(actual == expected, || {
            format!("expected {} to equal {}", actual, expected)
        })
    });
    module.set_native_fn("not_equal", |actual: Dynamic, expected: Dynamic| -> FnResult<()> {
        let (actual, expected) = (from_dynamic(&actual), from_dynamic(&expected));
        assertion(actual != expected, || {
            format!("expected {} to not equal {}", actual, expected)
        })
    });
    module.set_native_fn("include", |haystack: Dynamic, needle: Dynamic| -> FnResult<()> {
        let (haystack, needle) = (from_dynamic(&haystack), from_dynamic(&needle));
        let found = match (&haystack, &needle) {
            (Value::String(h), Value::String(n)) => h.contains(n.as_str()),
            (Value::Array(items), _) => items.contains(&needle),
            (Value::Object(map), Value::String(key)) => map.contains_key(key),
            _ => false,
        };
        assertion(found, || format!("expected {} to include {}", haystack, needle))
    });
    finish(module, "chai")
}
