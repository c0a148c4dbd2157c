//! Step data flattening.
//!
//! Connectors receive deeply nested responses from external APIs but the
//! engine only routes flat variables between steps. [`rename`] keeps the
//! leaves a connector cares about (under user-facing names) and
//! [`flatten`] collapses what is left into a single level.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::{Variable, VariableValue};

/// Relabel and prune `source` according to `name_map`.
///
/// `name_map` mirrors the shape of `source`:
/// - a string at the position of a scalar leaf renames that leaf;
/// - an object at the position of a nested object recurses into it;
/// - anything else (missing entry, arrays, shape mismatch) drops the leaf.
pub fn rename(source: &Value, name_map: &Value) -> Value {
    let (Some(source), Some(names)) = (source.as_object(), name_map.as_object()) else {
        return Value::Object(Map::new());
    };

    let mut out = Map::new();
    for (key, value) in source {
        match (names.get(key), value) {
            (Some(Value::String(label)), leaf) if is_scalar(leaf) => {
                out.insert(label.clone(), leaf.clone());
            }
            (Some(nested_names @ Value::Object(_)), nested @ Value::Object(_)) => {
                out.insert(key.clone(), rename(nested, nested_names));
            }
            _ => {}
        }
    }
    Value::Object(out)
}

/// Merge every scalar leaf of `value` into one string-keyed map.
///
/// Arrays are dropped rather than flattened. When two leaves share a name
/// the one visited last wins.
pub fn flatten(value: &Value) -> BTreeMap<String, VariableValue> {
    let mut out = BTreeMap::new();
    if let Some(obj) = value.as_object() {
        collect_leaves(obj, &mut out);
    }
    out
}

/// [`rename`] followed by [`flatten`], returned as engine variables.
pub fn to_variables(source: &Value, name_map: &Value) -> Vec<Variable> {
    flatten(&rename(source, name_map))
        .into_iter()
        .map(|(key, value)| Variable { key, value })
        .collect()
}

fn collect_leaves(obj: &Map<String, Value>, out: &mut BTreeMap<String, VariableValue>) {
    for (key, value) in obj {
        match value {
            Value::Object(nested) => collect_leaves(nested, out),
            Value::Array(_) => {}
            leaf => {
                if let Some(v) = VariableValue::from_json(leaf) {
                    out.insert(key.clone(), v);
                }
            }
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}
