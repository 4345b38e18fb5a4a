//! Plain value model.
//!
//! A [`Value`] is JSON data extended with a closed set of atomic leaves
//! ([`Atom`]). Records and sequences are the only trackable composites;
//! primitives and atoms are stored as-is when a graph is wrapped.

use std::cmp::Ordering;

use base64::Engine as _;
use indexmap::IndexMap;
use serde_json::{json, Number};

/// Keyed record storage. Keys keep insertion order.
pub type Record = IndexMap<String, Value>;

// ── Atom ───────────────────────────────────────────────────────────────────

/// Atomic leaf values.
///
/// Some of these are structured, but none are ever wrapped or descended
/// into: an atom is replaced or removed as a whole.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    /// Milliseconds since the Unix epoch.
    Date(i64),
    Binary(Vec<u8>),
    BoxedNumber(Number),
    BoxedString(String),
    BoxedBool(bool),
    /// Error message.
    Error(String),
    /// Opaque named callable.
    Function(String),
    /// Opaque pending-result handle.
    Promise(u64),
    RegExp { source: String, flags: String },
}

impl Atom {
    pub fn type_name(&self) -> &'static str {
        match self {
            Atom::Date(_) => "date",
            Atom::Binary(_) => "binary",
            Atom::BoxedNumber(_) => "boxed number",
            Atom::BoxedString(_) => "boxed string",
            Atom::BoxedBool(_) => "boxed boolean",
            Atom::Error(_) => "error",
            Atom::Function(_) => "function",
            Atom::Promise(_) => "promise",
            Atom::RegExp { .. } => "regexp",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Atom::Date(_) => 0,
            Atom::Binary(_) => 1,
            Atom::BoxedNumber(_) => 2,
            Atom::BoxedString(_) => 3,
            Atom::BoxedBool(_) => 4,
            Atom::Error(_) => 5,
            Atom::Function(_) => 6,
            Atom::Promise(_) => 7,
            Atom::RegExp { .. } => 8,
        }
    }

    /// Tagged JSON form, e.g. `{"$date": 0}`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Atom::Date(ms) => json!({ "$date": ms }),
            Atom::Binary(bytes) => json!({
                "$binary": base64::engine::general_purpose::STANDARD.encode(bytes)
            }),
            Atom::BoxedNumber(n) => json!({ "$number": n }),
            Atom::BoxedString(s) => json!({ "$string": s }),
            Atom::BoxedBool(b) => json!({ "$boolean": b }),
            Atom::Error(msg) => json!({ "$error": msg }),
            Atom::Function(name) => json!({ "$function": name }),
            Atom::Promise(id) => json!({ "$promise": id }),
            Atom::RegExp { source, flags } => json!({ "$regexp": source, "flags": flags }),
        }
    }
}

fn compare_atoms(a: &Atom, b: &Atom) -> Ordering {
    match (a, b) {
        (Atom::Date(x), Atom::Date(y)) => x.cmp(y),
        (Atom::Binary(x), Atom::Binary(y)) => x.cmp(y),
        (Atom::BoxedNumber(x), Atom::BoxedNumber(y)) => compare_numbers(x, y),
        (Atom::BoxedString(x), Atom::BoxedString(y)) => x.cmp(y),
        (Atom::BoxedBool(x), Atom::BoxedBool(y)) => x.cmp(y),
        (Atom::Error(x), Atom::Error(y)) | (Atom::Function(x), Atom::Function(y)) => x.cmp(y),
        (Atom::Promise(x), Atom::Promise(y)) => x.cmp(y),
        (
            Atom::RegExp { source: s1, flags: f1 },
            Atom::RegExp { source: s2, flags: f2 },
        ) => s1.cmp(s2).then_with(|| f1.cmp(f2)),
        _ => a.rank().cmp(&b.rank()),
    }
}

// ── Value ──────────────────────────────────────────────────────────────────

/// Plain (unwrapped) data.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Atom(Atom),
    Array(Vec<Value>),
    Object(Record),
}

/// Classification of a value, decided once when it is wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Primitive,
    Atom,
    Record,
    Sequence,
}

impl ValueKind {
    /// Only records and sequences get their own tracked node.
    pub fn is_trackable(self) -> bool {
        matches!(self, ValueKind::Record | ValueKind::Sequence)
    }
}

/// A trackable value, split out of [`Value`] so wrapping never has to
/// handle the non-composite case.
#[derive(Debug)]
pub(crate) enum Composite {
    Record(Record),
    Sequence(Vec<Value>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                ValueKind::Primitive
            }
            Value::Atom(_) => ValueKind::Atom,
            Value::Array(_) => ValueKind::Sequence,
            Value::Object(_) => ValueKind::Record,
        }
    }

    pub fn is_trackable(&self) -> bool {
        self.kind().is_trackable()
    }

    /// Human-readable type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Atom(atom) => atom.type_name(),
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub(crate) fn into_composite(self) -> Result<Composite, Value> {
        match self {
            Value::Object(map) => Ok(Composite::Record(map)),
            Value::Array(items) => Ok(Composite::Sequence(items)),
            other => Err(other),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Record> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Convert to `serde_json::Value`. Atoms become tagged objects, so the
    /// conversion is lossy in the other direction.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Atom(atom) => atom.to_json(),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

// ── Conversions ────────────────────────────────────────────────────────────

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Number(Number::from(n))
            }
        })*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<f64> for Value {
    /// Non-finite floats have no JSON number form and become `Null`.
    fn from(f: f64) -> Self {
        Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Atom> for Value {
    fn from(atom: Atom) -> Self {
        Value::Atom(atom)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Record> for Value {
    fn from(map: Record) -> Self {
        Value::Object(map)
    }
}

// ── Ordering ───────────────────────────────────────────────────────────────

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Atom(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x.cmp(&y);
    }
    let x = a.as_f64().unwrap_or(0.0);
    let y = b.as_f64().unwrap_or(0.0);
    x.total_cmp(&y)
}

/// Total order used by the default sequence sort.
///
/// Values of different types order by type: null, boolean, number, string,
/// atom, sequence, record. Sequences and records compare element-wise.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Atom(x), Value::Atom(y)) => compare_atoms(x, y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            for ((lk, lv), (rk, rv)) in x.iter().zip(y) {
                let ord = lk.cmp(rk).then_with(|| compare_values(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
