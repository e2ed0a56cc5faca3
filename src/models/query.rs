//! Path queries over parsed bodies.
//!
//! Backs the `res(path)` shorthand and `res.query(path)`. Supported syntax:
//!
//! - `data.items.0.id` / `data.items[0].id` - field and index access
//! - `items[-1]` - negative indexes count from the end
//! - `items.id` - a field applied to an array maps over its elements
//! - `..id` - collects every `id` at any depth
//!
//! A leading `$` is accepted and ignored.

use serde_json::Value;

/// One step of a parsed query path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(i64),
    Deep(String),
}

/// Evaluates `path` against `root`.
///
/// # Returns
///
/// The selected value, or `None` when the path does not match.
///
/// # Examples
///
/// ```
/// use bru_script::models::query::query;
/// use serde_json::json;
///
/// let body = json!({"data": {"items": [{"id": 1}, {"id": 2}]}});
/// assert_eq!(query(&body, "data.items.0.id"), Some(json!(1)));
/// assert_eq!(query(&body, "data.items.id"), Some(json!([1, 2])));
/// ```
pub fn query(root: &Value, path: &str) -> Option<Value> {
    let path = path.trim();
    let path = path.strip_prefix('$').unwrap_or(path);

    let mut current = root.clone();
    for segment in parse_segments(path) {
        current = apply(&current, &segment)?;
    }
    Some(current)
}

fn apply(value: &Value, segment: &Segment) -> Option<Value> {
    match segment {
        Segment::Index(index) => match value {
            Value::Array(items) => {
                let resolved = if *index < 0 {
                    items.len() as i64 + index
                } else {
                    *index
                };
                usize::try_from(resolved)
                    .ok()
                    .and_then(|i| items.get(i))
                    .cloned()
            }
            Value::Object(map) => map.get(&index.to_string()).cloned(),
            _ => None,
        },
        Segment::Field(name) => match value {
            Value::Object(map) => map.get(name).cloned(),
            Value::Array(items) => {
                let mapped: Vec<Value> = items.iter().filter_map(|item| apply(item, segment)).collect();
                if mapped.is_empty() {
                    None
                } else {
                    Some(Value::Array(mapped))
                }
            }
            _ => None,
        },
        Segment::Deep(name) => {
            let mut found = Vec::new();
            collect_deep(value, name, &mut found);
            if found.is_empty() {
                None
            } else {
                Some(Value::Array(found))
            }
        }
    }
}

fn collect_deep(value: &Value, name: &str, found: &mut Vec<Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == name {
                    found.push(child.clone());
                }
                collect_deep(child, name, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_deep(item, name, found);
            }
        }
        _ => {}
    }
}

/// Parses a path into segments.
///
/// - "user.name" -> [Field("user"), Field("name")]
/// - "items[0].id" -> [Field("items"), Index(0), Field("id")]
/// - "..id" -> [Deep("id")]
fn parse_segments(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut deep = false;
    let mut chars = path.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                push_segment(&mut segments, &mut current, &mut deep);
                if chars.peek() == Some(&'.') {
                    chars.next();
                    deep = true;
                }
            }
            '[' => {
                push_segment(&mut segments, &mut current, &mut deep);

                let mut inner = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    inner.push(c);
                }

                let inner = inner.trim().trim_matches(|c| c == '\'' || c == '"');
                if let Ok(index) = inner.parse::<i64>() {
                    segments.push(Segment::Index(index));
                } else if !inner.is_empty() {
                    segments.push(Segment::Field(inner.to_string()));
                }
            }
            _ => current.push(ch),
        }
    }

    push_segment(&mut segments, &mut current, &mut deep);
    segments
}

fn push_segment(segments: &mut Vec<Segment>, current: &mut String, deep: &mut bool) {
    if current.is_empty() {
        return;
    }

    let name = std::mem::take(current);
    if std::mem::take(deep) {
        segments.push(Segment::Deep(name));
    } else if let Ok(index) = name.parse::<i64>() {
        segments.push(Segment::Index(index));
    } else {
        segments.push(Segment::Field(name));
    }
}
