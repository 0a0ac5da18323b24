//! The merged metadata document.
//!
//! A [`MetadataDocument`] is the composition of every applicable extractor's
//! output for one file: an insertion-ordered mapping from field names to
//! JSON-compatible values. Extractor outputs are folded in with
//! [`MetadataDocument::merge_fragment`], which enforces the one reserved-key
//! rule of the document model: the `"file"` block is merged field-by-field
//! and existing fields are never overwritten, while every other top-level
//! key is last-writer-wins.

use serde::Serialize;
use serde_json::{Map, Value};

/// A single extractor's contribution to a document.
pub type Fragment = Map<String, Value>;

/// Reserved key holding the canonical common file metadata.
pub const FILE_KEY: &str = "file";

/// Merged metadata for one file.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct MetadataDocument {
    fields: Map<String, Value>,
}

impl MetadataDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a top-level field, replacing any existing value.
    pub fn insert<K: Into<String>>(&mut self, key: K, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Get a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Whether the document has a top-level field with this name.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the document has no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge one extractor's output into the document.
    ///
    /// The reserved `"file"` key is merged field-by-field: fields already
    /// present keep their value, fields the fragment adds are appended. This
    /// protects the canonical common metadata (filename, directory,
    /// extension, size) from being clobbered by an ad hoc extractor. Every
    /// other key is overwritten by the fragment's value.
    pub fn merge_fragment(&mut self, fragment: Fragment) {
        for (key, value) in fragment {
            if key == FILE_KEY {
                match (self.fields.get_mut(FILE_KEY), value) {
                    (Some(Value::Object(existing)), Value::Object(incoming)) => {
                        for (sub_key, sub_value) in incoming {
                            existing.entry(sub_key).or_insert(sub_value);
                        }
                    }
                    (Some(_), _) => {
                        // Existing non-object "file" value wins outright.
                    }
                    (None, value) => {
                        self.fields.insert(FILE_KEY.to_string(), value);
                    }
                }
            } else {
                self.fields.insert(key, value);
            }
        }
    }

    /// Consume the document, returning the underlying mapping.
    pub fn into_inner(self) -> Map<String, Value> {
        self.fields
    }

    /// Borrow the underlying mapping.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl From<Fragment> for MetadataDocument {
    fn from(fields: Fragment) -> Self {
        Self { fields }
    }
}

impl From<MetadataDocument> for Value {
    fn from(doc: MetadataDocument) -> Self {
        Value::Object(doc.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fragment(value: Value) -> Fragment {
        match value {
            Value::Object(map) => map,
            _ => panic!("fragment fixtures must be objects"),
        }
    }

    #[test]
    fn test_file_block_fields_are_never_overwritten() {
        let mut doc = MetadataDocument::new();
        doc.merge_fragment(fragment(json!({
            "file": {"filename": "a.txt", "size_bytes": 10}
        })));
        doc.merge_fragment(fragment(json!({
            "file": {"filename": "SHOULD_NOT_WIN", "checksum": "abc"}
        })));

        let file = doc.get("file").unwrap();
        assert_eq!(file["filename"], "a.txt");
        assert_eq!(file["size_bytes"], 10);
        // Non-conflicting extras are appended.
        assert_eq!(file["checksum"], "abc");
    }

    #[test]
    fn test_other_keys_are_last_writer_wins() {
        let mut doc = MetadataDocument::new();
        doc.merge_fragment(fragment(json!({"language": "en", "line_count": 3})));
        doc.merge_fragment(fragment(json!({"language": "fr"})));

        assert_eq!(doc.get("language").unwrap(), "fr");
        assert_eq!(doc.get("line_count").unwrap(), 3);
    }

    #[test]
    fn test_file_block_from_single_fragment_is_kept_whole() {
        let mut doc = MetadataDocument::new();
        doc.merge_fragment(fragment(json!({"file": {"filename": "x"}})));
        assert_eq!(doc.get("file").unwrap()["filename"], "x");
    }

    #[test]
    fn test_serializes_transparently() {
        let mut doc = MetadataDocument::new();
        doc.insert("path", json!("/tmp/a"));
        let out = serde_json::to_string(&doc).unwrap();
        assert_eq!(out, r#"{"path":"/tmp/a"}"#);
    }
}
