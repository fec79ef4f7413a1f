//! Field path construction and record flattening

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Extend a field path with a mapping key
pub fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Extend a field path with a sequence index
pub fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

/// Synthetic path holding a sequence's length, scored independently of its
/// elements so a length mismatch doesn't suppress per-element scoring.
pub fn count_path(parent: &str) -> String {
    format!("{}.count", parent)
}

/// Top-level entity name of a field path (`patient.name.family` -> `patient`,
/// `insured_objects[0].year` -> `insured_objects`)
pub fn root_group(path: &str) -> &str {
    let end = path.find(|c| c == '.' || c == '[').unwrap_or(path.len());
    &path[..end]
}

/// Whether a sequence is recursed per index: non-empty and all elements are
/// mappings. Anything else (scalars, mixed, empty) stays a single leaf.
pub fn is_indexed_sequence(items: &[Value]) -> bool {
    !items.is_empty() && items.iter().all(Value::is_object)
}

/// Flatten a record into an ordered field path -> value map.
///
/// Scalars become single leaves, mappings recurse with `.key`, sequences of
/// mappings recurse with `[index]` followed by a `.count` entry holding the
/// length. Order is the record's own field order, so flattening is
/// deterministic and idempotent.
pub fn flatten(record: &Map<String, Value>) -> IndexMap<String, Value> {
    let mut out = IndexMap::new();
    flatten_object("", record, &mut out);
    out
}

fn flatten_object(prefix: &str, object: &Map<String, Value>, out: &mut IndexMap<String, Value>) {
    for (key, value) in object {
        let path = child_path(prefix, key);
        flatten_value(&path, value, out);
    }
}

fn flatten_value(path: &str, value: &Value, out: &mut IndexMap<String, Value>) {
    match value {
        Value::Object(object) => flatten_object(path, object, out),
        Value::Array(items) if is_indexed_sequence(items) => {
            for (index, item) in items.iter().enumerate() {
                if let Value::Object(object) = item {
                    flatten_object(&index_path(path, index), object, out);
                }
            }
            out.insert(count_path(path), Value::from(items.len()));
        }
        leaf => {
            out.insert(path.to_string(), leaf.clone());
        }
    }
}
