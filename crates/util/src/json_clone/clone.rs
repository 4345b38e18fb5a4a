use serde_json::{Map, Value};

/// Creates a deep structural copy of a JSON value.
///
/// Objects keep their key order; arrays keep their length and order.
/// Nothing in the copy is shared with the source.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use json_observer_util::json_clone::clone;
///
/// let original = json!({"list": [1, {"deep": true}]});
/// let mut copy = clone(&original);
/// copy["list"][1]["deep"] = json!(false);
///
/// assert_eq!(original["list"][1]["deep"], json!(true));
/// ```
pub fn clone(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(clone).collect()),
        Value::Object(map) => {
            let mut copy = Map::with_capacity(map.len());
            for (key, item) in map {
                copy.insert(key.clone(), clone(item));
            }
            Value::Object(copy)
        }
        scalar => scalar.clone(),
    }
}
