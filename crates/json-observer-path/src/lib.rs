//! Segmented path strings over plain JSON.
//!
//! A path string such as `"a.b.0"`, `"a/b/0"` or `"a\\b\\0"` names a
//! location inside a `serde_json::Value`. This crate parses and formats
//! such strings and reads or writes the location they name. It knows
//! nothing about observation: it works on plain, unwrapped data.
//!
//! # Example
//!
//! ```
//! use json_observer_path::{deep_get, deep_set, parse_path};
//! use serde_json::json;
//!
//! let mut doc = json!({"a": {"list": [1, 2]}});
//! let path = parse_path("a.list.1");
//! assert_eq!(deep_get(&doc, &path), Some(&json!(2)));
//!
//! deep_set(&mut doc, &parse_path("a.b.c"), json!(true), true).unwrap();
//! assert_eq!(doc["a"]["b"]["c"], json!(true));
//! ```

use serde_json::{Map, Value};
use thiserror::Error;

pub mod validate;
pub use validate::{validate_path, ValidationError, MAX_PATH_DEPTH};

const SEPARATORS: [char; 3] = ['.', '/', '\\'];

/// Array step that addresses the position one past the last element.
pub const APPEND_STEP: &str = "-";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path does not exist")]
    NotFound,
    #[error("cannot step into a value that is neither an object nor an array")]
    NotAContainer,
    #[error("invalid array index")]
    InvalidIndex,
    #[error("cannot assign to the root")]
    EmptyPath,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Split a path string into steps.
///
/// Steps are separated by `.`, `/` or `\`. One leading separator is
/// ignored and the empty string is the root.
///
/// ```
/// use json_observer_path::parse_path;
///
/// assert_eq!(parse_path(""), Vec::<String>::new());
/// assert_eq!(parse_path("a.b.0"), vec!["a", "b", "0"]);
/// assert_eq!(parse_path("/a/b"), vec!["a", "b"]);
/// assert_eq!(parse_path("a\\b.c"), vec!["a", "b", "c"]);
/// ```
pub fn parse_path(path: &str) -> Vec<String> {
    let path = path.strip_prefix(SEPARATORS).unwrap_or(path);
    if path.is_empty() {
        return Vec::new();
    }
    path.split(SEPARATORS).map(str::to_string).collect()
}

/// Join steps with `.`. The root formats as the empty string.
pub fn format_path(path: &[String]) -> String {
    path.join(".")
}

/// Check if a string is a canonical non-negative integer index.
///
/// ```
/// use json_observer_path::is_valid_index;
///
/// assert!(is_valid_index("0"));
/// assert!(is_valid_index("42"));
/// assert!(!is_valid_index("01"));
/// assert!(!is_valid_index("-1"));
/// assert!(!is_valid_index("1.5"));
/// ```
pub fn is_valid_index(index: &str) -> bool {
    let bytes = index.as_bytes();
    if bytes.is_empty() || (bytes.len() > 1 && bytes[0] == b'0') {
        return false;
    }
    bytes.iter().all(u8::is_ascii_digit)
}

/// Resolve an array step against an array of length `len`.
fn array_index(step: &str, len: usize) -> Result<usize, PathError> {
    if step == APPEND_STEP {
        return Ok(len);
    }
    if !is_valid_index(step) {
        return Err(PathError::InvalidIndex);
    }
    step.parse().map_err(|_| PathError::InvalidIndex)
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Read the value at `path`.
///
/// Returns `None` if any step is missing or cannot be taken.
pub fn deep_get<'a>(doc: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = doc;
    for step in path {
        current = match current {
            Value::Object(map) => map.get(step)?,
            Value::Array(items) => {
                if !is_valid_index(step) {
                    return None;
                }
                items.get(step.parse::<usize>().ok()?)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Read the value at `path`, or `default` when it is missing or `null`.
pub fn deep_get_or(doc: &Value, path: &[String], default: Value) -> Value {
    match deep_get(doc, path) {
        Some(Value::Null) | None => default,
        Some(found) => found.clone(),
    }
}

/// Write `value` at `path`.
///
/// With `create`, missing or non-container intermediate steps are
/// replaced by empty objects. Without it, they are errors. An array step
/// may be an index no greater than the length, or [`APPEND_STEP`].
///
/// # Errors
///
/// - `PathError::EmptyPath` if `path` names the root
/// - `PathError::NotFound` if an intermediate step is missing
/// - `PathError::NotAContainer` if an intermediate value cannot be entered
/// - `PathError::InvalidIndex` if an array step is not a usable index
pub fn deep_set(doc: &mut Value, path: &[String], value: Value, create: bool) -> Result<(), PathError> {
    validate_path(path)?;
    let Some((last, parents)) = path.split_last() else {
        return Err(PathError::EmptyPath);
    };
    let mut current = doc;
    for step in parents {
        current = step_into(current, step, create)?;
    }
    match current {
        Value::Object(map) => {
            map.insert(last.clone(), value);
        }
        Value::Array(items) => {
            let index = array_index(last, items.len())?;
            match index.cmp(&items.len()) {
                std::cmp::Ordering::Less => items[index] = value,
                std::cmp::Ordering::Equal => items.push(value),
                std::cmp::Ordering::Greater => return Err(PathError::InvalidIndex),
            }
        }
        _ => return Err(PathError::NotAContainer),
    }
    Ok(())
}

fn step_into<'a>(current: &'a mut Value, step: &str, create: bool) -> Result<&'a mut Value, PathError> {
    let slot = match current {
        Value::Object(map) => {
            if create {
                map.entry(step.to_string()).or_insert(Value::Null)
            } else {
                map.get_mut(step).ok_or(PathError::NotFound)?
            }
        }
        Value::Array(items) => {
            let index = array_index(step, items.len())?;
            if index == items.len() && create {
                items.push(Value::Null);
            }
            items.get_mut(index).ok_or(PathError::NotFound)?
        }
        _ => return Err(PathError::NotAContainer),
    };
    if !is_container(slot) {
        if !create {
            return Err(PathError::NotAContainer);
        }
        *slot = Value::Object(Map::new());
    }
    Ok(slot)
}
