//! Shared structure analysis for the JSON and YAML extractors.
//!
//! Both extractors report the same structural facts about a parsed
//! document; only the vocabulary differs (`object`/`array` for JSON,
//! `mapping`/`sequence` for YAML).

use serde_json::{json, Value};

const SAMPLE_LIMIT: usize = 5;

/// Naming vocabulary for container types.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StructureVocab {
    pub mapping: &'static str,
    pub sequence: &'static str,
}

pub(crate) const JSON_VOCAB: StructureVocab = StructureVocab {
    mapping: "object",
    sequence: "array",
};

pub(crate) const YAML_VOCAB: StructureVocab = StructureVocab {
    mapping: "mapping",
    sequence: "sequence",
};

/// Describe the shape of the root value.
pub(crate) fn analyze_structure(data: &Value, vocab: StructureVocab) -> Value {
    match data {
        Value::Object(map) => json!({
            "type": vocab.mapping,
            "key_count": map.len(),
            "sample_keys": map.keys().take(SAMPLE_LIMIT).collect::<Vec<_>>(),
        }),
        Value::Array(items) => json!({
            "type": vocab.sequence,
            "length": items.len(),
            "sample_item_types": sample_item_types(items, vocab),
        }),
        Value::String(s) => json!({"type": "string", "length": s.chars().count()}),
        Value::Number(_) => json!({"type": "number"}),
        Value::Bool(_) => json!({"type": "boolean"}),
        Value::Null => json!({"type": "null"}),
    }
}

/// Distinct type names among the first few items of a sequence.
pub(crate) fn sample_item_types(items: &[Value], vocab: StructureVocab) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for item in items.iter().take(SAMPLE_LIMIT) {
        let name = match item {
            Value::Object(_) => vocab.mapping,
            Value::Array(_) => vocab.sequence,
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
        };
        if !types.iter().any(|t| t == name) {
            types.push(name.to_string());
        }
    }
    types
}

/// Root keys of a mapping; empty for any other shape.
pub(crate) fn root_keys(data: &Value) -> Vec<String> {
    match data {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

/// Maximum nesting depth. Scalars sit at depth 0 below their container;
/// an empty container counts its own level without descending further.
pub(crate) fn max_depth(data: &Value, current_depth: usize) -> usize {
    match data {
        Value::Object(map) => {
            if map.is_empty() {
                current_depth
            } else {
                map.values()
                    .map(|v| max_depth(v, current_depth + 1))
                    .max()
                    .unwrap_or(current_depth)
            }
        }
        Value::Array(items) => {
            if items.is_empty() {
                current_depth
            } else {
                items
                    .iter()
                    .map(|v| max_depth(v, current_depth + 1))
                    .max()
                    .unwrap_or(current_depth)
            }
        }
        _ => current_depth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_mapping() {
        let value = json!({"a": 1, "b": 2});
        let shape = analyze_structure(&value, JSON_VOCAB);
        assert_eq!(shape["type"], "object");
        assert_eq!(shape["key_count"], 2);
        assert_eq!(shape["sample_keys"], json!(["a", "b"]));

        let shape = analyze_structure(&value, YAML_VOCAB);
        assert_eq!(shape["type"], "mapping");
    }

    #[test]
    fn test_analyze_sequence() {
        let value = json!([1, "two", null]);
        let shape = analyze_structure(&value, JSON_VOCAB);
        assert_eq!(shape["type"], "array");
        assert_eq!(shape["length"], 3);
        assert_eq!(shape["sample_item_types"], json!(["number", "string", "null"]));
    }

    #[test]
    fn test_analyze_scalars() {
        assert_eq!(analyze_structure(&json!("hi"), JSON_VOCAB)["length"], 2);
        assert_eq!(analyze_structure(&json!(3.5), JSON_VOCAB)["type"], "number");
        assert_eq!(analyze_structure(&json!(true), JSON_VOCAB)["type"], "boolean");
        assert_eq!(analyze_structure(&Value::Null, JSON_VOCAB)["type"], "null");
    }

    #[test]
    fn test_max_depth() {
        assert_eq!(max_depth(&json!(1), 0), 0);
        assert_eq!(max_depth(&json!({"a": 1}), 0), 1);
        assert_eq!(max_depth(&json!({"a": 1, "b": [1, 2, 3]}), 0), 2);
        assert_eq!(max_depth(&json!({"a": {"b": {"c": 1}}}), 0), 3);
    }

    #[test]
    fn test_max_depth_empty_containers() {
        assert_eq!(max_depth(&json!({}), 0), 0);
        assert_eq!(max_depth(&json!({"a": {}}), 0), 1);
        assert_eq!(max_depth(&json!({"a": []}), 0), 1);
    }

    #[test]
    fn test_root_keys() {
        assert_eq!(root_keys(&json!({"x": 1, "y": 2})), vec!["x", "y"]);
        assert!(root_keys(&json!([1, 2])).is_empty());
    }
}
