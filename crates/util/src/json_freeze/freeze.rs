use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::json_clone::clone;

/// A deeply immutable JSON value.
///
/// `Frozen` derefs to `&Value` and offers no way to get a `&mut Value`,
/// so neither the top level nor anything nested can change. Clones share
/// the same underlying data.
#[derive(Clone, PartialEq)]
pub struct Frozen {
    inner: Arc<Value>,
}

impl Frozen {
    /// An owned, mutable deep copy.
    pub fn thaw(&self) -> Value {
        clone(&self.inner)
    }

    /// Whether both views share the same frozen data.
    pub fn ptr_eq(&self, other: &Frozen) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Freeze `value`, taking ownership of it.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use json_observer_util::freeze;
///
/// let frozen = freeze(json!({"a": [1, 2]}));
/// assert_eq!(frozen["a"][1], json!(2));
///
/// let mut thawed = frozen.thaw();
/// thawed["a"][1] = json!(3);
/// assert_eq!(frozen["a"][1], json!(2));
/// ```
pub fn freeze(value: Value) -> Frozen {
    Frozen { inner: Arc::new(value) }
}

impl Deref for Frozen {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.inner
    }
}

impl AsRef<Value> for Frozen {
    fn as_ref(&self) -> &Value {
        &self.inner
    }
}

impl From<Value> for Frozen {
    fn from(value: Value) -> Self {
        freeze(value)
    }
}

impl fmt::Debug for Frozen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Frozen").field(&*self.inner).finish()
    }
}

impl Serialize for Frozen {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.serialize(serializer)
    }
}
