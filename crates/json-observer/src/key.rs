//! Keys and paths addressing values inside an observed graph.

use std::fmt;

use json_observer_path::is_valid_index;

/// A property name within a record, or a position within a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Field(String),
    Index(usize),
}

/// Ordered keys from the observed root to a location.
pub type Path = Vec<Key>;

impl Key {
    /// The sequence position this key addresses, if any.
    ///
    /// A field qualifies when it is a canonical non-negative integer
    /// (`"0"`, `"12"`, but not `"01"` or `"-1"`).
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Field(s) if is_valid_index(s) => s.parse().ok(),
            Key::Field(_) => None,
        }
    }

    /// The record property name this key addresses. Indices name their
    /// decimal form, so `Key::Index(0)` and `Key::from("0")` are the same
    /// property.
    pub fn into_field(self) -> String {
        match self {
            Key::Field(s) => s,
            Key::Index(i) => i.to_string(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Field(s) => f.write_str(s),
            Key::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Field(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Field(s)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

/// Join a path with `.`, the form observer filters match against.
pub fn path_string(path: &[Key]) -> String {
    let mut out = String::new();
    for (i, key) in path.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push_str(&key.to_string());
    }
    out
}

pub(crate) fn child_path(base: &[Key], key: Key) -> Path {
    let mut path = Vec::with_capacity(base.len() + 1);
    path.extend_from_slice(base);
    path.push(key);
    path
}
