//! Change records delivered to observers.

use serde_json::json;

use crate::key::{path_string, Key, Path};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// The whole sequence at `path` was reversed.
    Reverse,
    /// The whole sequence at `path` was reordered.
    Shuffle,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
            ChangeKind::Reverse => "reverse",
            ChangeKind::Shuffle => "shuffle",
        }
    }
}

/// One logical change at one location.
///
/// `value` and `old_value` are always plain data, never live handles.
/// `Reverse` and `Shuffle` carry neither: any index below `path` may have
/// moved, so observers should re-read the sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub kind: ChangeKind,
    pub path: Path,
    pub value: Option<Value>,
    pub old_value: Option<Value>,
}

impl Change {
    pub fn insert(path: Path, value: Value) -> Self {
        Self { kind: ChangeKind::Insert, path, value: Some(value), old_value: None }
    }

    pub fn update(path: Path, value: Value, old_value: Value) -> Self {
        Self { kind: ChangeKind::Update, path, value: Some(value), old_value: Some(old_value) }
    }

    pub fn delete(path: Path, old_value: Value) -> Self {
        Self { kind: ChangeKind::Delete, path, value: None, old_value: Some(old_value) }
    }

    pub fn reverse(path: Path) -> Self {
        Self { kind: ChangeKind::Reverse, path, value: None, old_value: None }
    }

    pub fn shuffle(path: Path) -> Self {
        Self { kind: ChangeKind::Shuffle, path, value: None, old_value: None }
    }

    /// The path joined with `.`.
    pub fn path_string(&self) -> String {
        path_string(&self.path)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let path: Vec<serde_json::Value> = self
            .path
            .iter()
            .map(|key| match key {
                Key::Field(s) => json!(s),
                Key::Index(i) => json!(i),
            })
            .collect();
        let mut out = json!({ "type": self.kind.as_str(), "path": path });
        if let Some(value) = &self.value {
            out["value"] = value.to_json();
        }
        if let Some(old) = &self.old_value {
            out["oldValue"] = old.to_json();
        }
        out
    }
}

/// Records produced by one mutation.
///
/// Disabled batches skip building records altogether; a graph with no
/// observers pays nothing for them.
#[derive(Debug)]
pub(crate) struct ChangeBatch {
    enabled: bool,
    changes: Vec<Change>,
}

impl ChangeBatch {
    pub(crate) fn new(enabled: bool) -> Self {
        Self { enabled, changes: Vec::new() }
    }

    pub(crate) fn push_with(&mut self, make: impl FnOnce() -> Change) {
        if self.enabled {
            self.changes.push(make());
        }
    }

    pub(crate) fn into_changes(self) -> Vec<Change> {
        self.changes
    }
}
