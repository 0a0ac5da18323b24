//! JSON file metadata extractor.

use crate::document::Fragment;
use crate::extractors::basic::common_file_fragment;
use crate::extractors::structured::{analyze_structure, max_depth, root_keys, JSON_VOCAB};
use crate::registry::MetadataExtractor;
use crate::Result;
use serde_json::{json, Value};
use std::path::Path;
use tracing::error;

const DEFAULT_MAX_CONTENT_LENGTH: usize = 10_000_000;
const PREVIEW_LENGTH: usize = 1_000;

/// Extract structural metadata from JSON files.
///
/// Malformed content is a normal, expected outcome: it is reported through
/// `json_valid: false` and `json_error`, never as an `Err`.
pub struct JsonExtractor {
    max_content_length: usize,
}

impl JsonExtractor {
    pub fn new() -> Self {
        Self {
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

impl Default for JsonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor for JsonExtractor {
    fn name(&self) -> &str {
        "json-extractor"
    }

    fn supported_extensions(&self) -> &[&str] {
        &[".json"]
    }

    fn supported_mime_prefixes(&self) -> &[&str] {
        &["application/json"]
    }

    fn extract(&self, path: &Path) -> Result<Fragment> {
        let mut fragment = common_file_fragment(path)?;

        let bytes = std::fs::read(path)?;
        let capped: &[u8] = if bytes.len() > self.max_content_length {
            &bytes[..self.max_content_length]
        } else {
            &bytes
        };
        let content = String::from_utf8_lossy(capped);

        match serde_json::from_str::<Value>(&content) {
            Ok(data) => {
                let keys = root_keys(&data);
                fragment.insert("json_valid".to_string(), json!(true));
                fragment.insert(
                    "json_structure".to_string(),
                    analyze_structure(&data, JSON_VOCAB),
                );
                fragment.insert("json_root_keys".to_string(), json!(keys));
                fragment.insert("json_root_key_count".to_string(), json!(keys.len()));
                fragment.insert("json_depth".to_string(), json!(max_depth(&data, 0)));
                fragment.insert("json_size".to_string(), json!(content.chars().count()));
                fragment.insert(
                    "content_preview".to_string(),
                    json!(content.chars().take(PREVIEW_LENGTH).collect::<String>()),
                );
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "invalid JSON");
                fragment.insert("json_valid".to_string(), json!(false));
                fragment.insert("json_error".to_string(), json!(e.to_string()));
            }
        }

        Ok(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_json(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::File::create(&path)
            .unwrap()
            .write_all(content.as_bytes())
            .unwrap();
        path
    }

    #[test]
    fn test_valid_json() {
        let dir = tempdir().unwrap();
        let path = write_json(&dir, "data.json", r#"{"a":1,"b":[1,2,3]}"#);

        let fragment = JsonExtractor::new().extract(&path).unwrap();
        assert_eq!(fragment["json_valid"], true);
        assert_eq!(fragment["json_root_keys"], json!(["a", "b"]));
        assert_eq!(fragment["json_root_key_count"], 2);
        assert_eq!(fragment["json_depth"], 2);
        assert_eq!(fragment["json_structure"]["type"], "object");
        assert_eq!(fragment["json_size"], 19);
        assert_eq!(fragment["content_preview"], r#"{"a":1,"b":[1,2,3]}"#);
    }

    #[test]
    fn test_malformed_json() {
        let dir = tempdir().unwrap();
        let path = write_json(&dir, "bad.json", "{not json");

        let fragment = JsonExtractor::new().extract(&path).unwrap();
        assert_eq!(fragment["json_valid"], false);
        assert!(!fragment["json_error"].as_str().unwrap().is_empty());
        assert!(fragment.get("json_depth").is_none());
    }

    #[test]
    fn test_array_root() {
        let dir = tempdir().unwrap();
        let path = write_json(&dir, "arr.json", r#"[1, 2, {"x": true}]"#);

        let fragment = JsonExtractor::new().extract(&path).unwrap();
        assert_eq!(fragment["json_structure"]["type"], "array");
        assert_eq!(fragment["json_root_key_count"], 0);
        assert_eq!(fragment["json_depth"], 2);
    }

    #[test]
    fn test_includes_file_block() {
        let dir = tempdir().unwrap();
        let path = write_json(&dir, "d.json", "{}");

        let fragment = JsonExtractor::new().extract(&path).unwrap();
        assert_eq!(fragment["file"]["extension"], ".json");
    }
}
