//! Deterministic leaf traversal of structured documents.
//!
//! A [`serde_json::Value`] is flattened into an ordered sequence of
//! `(property, value-bytes)` tuples: object fields in lexicographic key
//! order, array elements by index, scalars as leaves. Two traversals of
//! equal values yield identical sequences, which is what makes tree roots
//! reproducible across replicas (and what the salt sequence is aligned
//! against).

use serde_json::Value;

use crate::property::Property;

/// Flatten `value` into leaf tuples, namespaced under `prefix`.
pub fn flatten_value(prefix: &Property, value: &Value) -> Vec<(Property, Vec<u8>)> {
    let mut out = Vec::new();
    walk(prefix, value, &mut out);
    out
}

/// Number of leaves `value` flattens to. Used to size salt sequences.
pub fn count_leaves(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.values().map(count_leaves).sum(),
        Value::Array(items) => items.iter().map(count_leaves).sum(),
        _ => 1,
    }
}

fn walk(prop: &Property, value: &Value, out: &mut Vec<(Property, Vec<u8>)>) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (ordinal, key) in keys.into_iter().enumerate() {
                walk(&prop.field(key, ordinal as u16), &map[key], out);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                walk(&prop.index(index as u16), item, out);
            }
        }
        scalar => out.push((prop.clone(), scalar_bytes(scalar))),
    }
}

fn scalar_bytes(value: &Value) -> Vec<u8> {
    match value {
        Value::Null => Vec::new(),
        Value::Bool(b) => vec![u8::from(*b)],
        Value::Number(n) => n.to_string().into_bytes(),
        Value::String(s) => s.as_bytes().to_vec(),
        // walk() never passes containers here
        Value::Object(_) | Value::Array(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn root() -> Property {
        Property::new("doc", vec![0, 1, 0, 0])
    }

    #[test]
    fn traversal_is_deterministic() {
        let value = json!({"b": 1, "a": "x", "c": [true, null]});
        let first = flatten_value(&root(), &value);
        let second = flatten_value(&root(), &value);
        assert_eq!(first, second);
    }

    #[test]
    fn object_keys_sorted() {
        let value = json!({"zeta": 1, "alpha": 2});
        let leaves = flatten_value(&root(), &value);
        assert_eq!(leaves[0].0.readable(), "doc.alpha");
        assert_eq!(leaves[1].0.readable(), "doc.zeta");
    }

    #[test]
    fn arrays_by_index() {
        let value = json!({"items": ["x", "y"]});
        let leaves = flatten_value(&root(), &value);
        assert_eq!(leaves[0].0.readable(), "doc.items[0]");
        assert_eq!(leaves[1].0.readable(), "doc.items[1]");
    }

    #[test]
    fn nested_objects_flatten() {
        let value = json!({"order": {"city": "Berlin", "amount": 42}});
        let leaves = flatten_value(&root(), &value);
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].0.readable(), "doc.order.amount");
        assert_eq!(leaves[0].1, b"42".to_vec());
        assert_eq!(leaves[1].0.readable(), "doc.order.city");
    }

    #[test]
    fn count_matches_flatten() {
        let value = json!({
            "a": {"b": [1, 2, 3]},
            "c": "s",
            "d": null,
        });
        assert_eq!(count_leaves(&value), flatten_value(&root(), &value).len());
    }

    #[test]
    fn scalar_encodings() {
        assert_eq!(scalar_bytes(&json!(null)), Vec::<u8>::new());
        assert_eq!(scalar_bytes(&json!(true)), vec![1]);
        assert_eq!(scalar_bytes(&json!(false)), vec![0]);
        assert_eq!(scalar_bytes(&json!(100)), b"100".to_vec());
        assert_eq!(scalar_bytes(&json!("abc")), b"abc".to_vec());
    }

    #[test]
    fn compact_paths_extend_prefix() {
        let value = json!({"amount": 7});
        let leaves = flatten_value(&root(), &value);
        let compact = leaves[0].0.compact();
        assert!(compact.starts_with(&[0, 1, 0, 0]));
        assert!(compact.len() > 4);
    }
}
