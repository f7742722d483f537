//! Raw field bags
//!
//! Every record keeps the raw key/value map it was decoded from. Encoding
//! writes modeled fields back into that map, so keys the typed model does not
//! know about survive a load/save cycle untouched.
//!
//! Old-style property lists have no numbers or booleans; converted documents
//! carry them as strings (`"4"`, `"0"`). The writers below keep whatever shape
//! a value already has when it still means the same thing, and fall back to
//! the string form for new values.

use crate::handle::Handle;
use serde_json::Value;

/// Raw key/value map of one record or document
pub type Fields = serde_json::Map<String, Value>;

/// Interpret a raw value as a boolean
#[must_use]
pub fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.as_str() {
            "1" | "YES" | "true" => Some(true),
            "0" | "NO" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Interpret a raw value as an integer
#[must_use]
pub fn value_as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Interpret a raw value as a list of strings
#[must_use]
pub fn value_as_strings(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

pub(crate) fn put_string(fields: &mut Fields, key: &str, value: &str) {
    if fields.get(key).and_then(Value::as_str) == Some(value) {
        return;
    }
    fields.insert(key.to_string(), Value::String(value.to_string()));
}

pub(crate) fn put_optional_string(fields: &mut Fields, key: &str, value: Option<&str>) {
    match value {
        Some(value) => put_string(fields, key, value),
        None => {
            fields.shift_remove(key);
        }
    }
}

pub(crate) fn put_strings(fields: &mut Fields, key: &str, values: &[String]) {
    let list = values.iter().cloned().map(Value::String).collect();
    fields.insert(key.to_string(), Value::Array(list));
}

/// Write a list, but leave an absent key absent while the list is empty
pub(crate) fn put_sparse_strings(fields: &mut Fields, key: &str, values: &[String]) {
    if values.is_empty() && !fields.contains_key(key) {
        return;
    }
    put_strings(fields, key, values);
}

pub(crate) fn put_int(fields: &mut Fields, key: &str, value: i64) {
    let replacement = match fields.get(key) {
        Some(existing) if value_as_int(existing) == Some(value) => return,
        Some(Value::Number(_)) => Value::from(value),
        _ => Value::String(value.to_string()),
    };
    fields.insert(key.to_string(), replacement);
}

pub(crate) fn put_optional_int(fields: &mut Fields, key: &str, value: Option<i64>) {
    match value {
        Some(value) => put_int(fields, key, value),
        None => {
            fields.shift_remove(key);
        }
    }
}

pub(crate) fn put_bool(fields: &mut Fields, key: &str, value: bool) {
    let replacement = match fields.get(key) {
        Some(existing) if value_as_bool(existing) == Some(value) => return,
        Some(Value::Bool(_)) => Value::Bool(value),
        _ => Value::String(if value { "1" } else { "0" }.to_string()),
    };
    fields.insert(key.to_string(), replacement);
}

pub(crate) fn put_id<T>(fields: &mut Fields, key: &str, handle: &Handle<T>) {
    put_string(fields, key, handle.id().as_str());
}

pub(crate) fn put_optional_id<T>(fields: &mut Fields, key: &str, handle: Option<&Handle<T>>) {
    put_optional_string(fields, key, handle.map(|h| h.id().as_str()));
}

pub(crate) fn put_ids<T>(fields: &mut Fields, key: &str, handles: &[Handle<T>]) {
    let list = handles
        .iter()
        .map(|h| Value::String(h.id().to_string()))
        .collect();
    fields.insert(key.to_string(), Value::Array(list));
}

pub(crate) fn put_optional_value(fields: &mut Fields, key: &str, value: Option<&Value>) {
    match value {
        Some(value) => {
            fields.insert(key.to_string(), value.clone());
        }
        None => {
            fields.shift_remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ObjectId;
    use serde_json::json;

    fn bag(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn bool_and_int_parsing() {
        assert_eq!(value_as_bool(&json!("1")), Some(true));
        assert_eq!(value_as_bool(&json!("NO")), Some(false));
        assert_eq!(value_as_bool(&json!(true)), Some(true));
        assert_eq!(value_as_bool(&json!("maybe")), None);
        assert_eq!(value_as_int(&json!("4")), Some(4));
        assert_eq!(value_as_int(&json!(4)), Some(4));
        assert_eq!(value_as_int(&json!("four")), None);
    }

    #[test]
    fn put_int_preserves_shape() {
        let mut fields = bag(json!({"a": 4, "b": "4"}));
        put_int(&mut fields, "a", 5);
        put_int(&mut fields, "b", 5);
        put_int(&mut fields, "c", 5);
        assert_eq!(fields["a"], json!(5));
        assert_eq!(fields["b"], json!("5"));
        assert_eq!(fields["c"], json!("5"));
    }

    #[test]
    fn put_bool_keeps_equivalent_spelling() {
        let mut fields = bag(json!({"flag": "YES"}));
        put_bool(&mut fields, "flag", true);
        assert_eq!(fields["flag"], json!("YES"));
        put_bool(&mut fields, "flag", false);
        assert_eq!(fields["flag"], json!("0"));
    }

    #[test]
    fn optional_none_removes_key_in_place() {
        let mut fields = bag(json!({"isa": "X", "name": "n", "path": "p"}));
        put_optional_string(&mut fields, "name", None);
        let keys: Vec<_> = fields.keys().cloned().collect();
        assert_eq!(keys, vec!["isa", "path"]);
    }

    #[test]
    fn sparse_lists_stay_absent() {
        let mut fields = Fields::new();
        put_sparse_strings(&mut fields, "inputPaths", &[]);
        assert!(!fields.contains_key("inputPaths"));
        put_sparse_strings(&mut fields, "inputPaths", &["a".to_string()]);
        assert_eq!(fields["inputPaths"], json!(["a"]));
    }

    #[test]
    fn ids_flatten_to_strings() {
        struct Kind;
        let handles: Vec<Handle<Kind>> = vec![
            Handle::detached(ObjectId::from("A")),
            Handle::detached(ObjectId::from("B")),
        ];
        let mut fields = Fields::new();
        put_ids(&mut fields, "children", &handles);
        assert_eq!(fields["children"], json!(["A", "B"]));
    }
}
