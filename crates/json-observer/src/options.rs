//! Observer registration options.
//!
//! Options are either built in code ([`ObserveOptions::path`],
//! [`ObserveOptions::paths_from`]) or loaded from untrusted JSON with
//! [`ObserveOptions::from_json`], which rejects anything malformed before
//! a registration happens.

use serde_json::Value;

use crate::error::ConfigurationError;

const PATH: &str = "path";
const PATHS_FROM: &str = "pathsFrom";
const VALID_OPTIONS: [&str; 2] = [PATH, PATHS_FROM];

/// Restricts which change records an observer receives.
///
/// `path` selects records whose `.`-joined path equals it; `paths_from`
/// selects records whose joined path starts with it. They are mutually
/// exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub path: Option<String>,
    pub paths_from: Option<String>,
}

impl ObserveOptions {
    /// No filter: every record is delivered.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self { path: Some(path.into()), paths_from: None }
    }

    pub fn paths_from(prefix: impl Into<String>) -> Self {
        Self { path: None, paths_from: Some(prefix.into()) }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if matches!(&self.path, Some(p) if p.is_empty()) {
            return Err(ConfigurationError::InvalidPath { option: PATH });
        }
        if self.path.is_some() && self.paths_from.is_some() {
            return Err(ConfigurationError::ExclusiveOptions);
        }
        if matches!(&self.paths_from, Some(p) if p.is_empty()) {
            return Err(ConfigurationError::InvalidPath { option: PATHS_FROM });
        }
        Ok(())
    }

    /// Load options from a JSON object such as `{"pathsFrom": "a"}`.
    ///
    /// `null` means no options. Fails on a non-object, an unknown key,
    /// `path` together with `pathsFrom`, or a value that is not a
    /// non-empty string.
    pub fn from_json(options: &Value) -> Result<Self, ConfigurationError> {
        let map = match options {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            _ => return Err(ConfigurationError::NotAnObject),
        };
        let path = string_option(map.get(PATH), PATH)?;
        if map.contains_key(PATHS_FROM) && path.is_some() {
            return Err(ConfigurationError::ExclusiveOptions);
        }
        let paths_from = string_option(map.get(PATHS_FROM), PATHS_FROM)?;
        if let Some(unknown) = map.keys().find(|k| !VALID_OPTIONS.contains(&k.as_str())) {
            return Err(ConfigurationError::UnknownOption(unknown.clone()));
        }
        Ok(Self { path, paths_from })
    }
}

fn string_option(
    value: Option<&Value>,
    option: &'static str,
) -> Result<Option<String>, ConfigurationError> {
    match value {
        None => Ok(None),
        Some(Value::String(s)) if !s.is_empty() => Ok(Some(s.clone())),
        Some(_) => Err(ConfigurationError::InvalidPath { option }),
    }
}
