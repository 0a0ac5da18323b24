//! YAML file metadata extractor.

use crate::document::Fragment;
use crate::extractors::basic::common_file_fragment;
use crate::extractors::structured::{analyze_structure, max_depth, root_keys, YAML_VOCAB};
use crate::registry::MetadataExtractor;
use crate::Result;
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::error;

const DEFAULT_MAX_CONTENT_LENGTH: usize = 10_000_000;
const PREVIEW_LENGTH: usize = 1_000;

/// Extract structural metadata from YAML files.
///
/// Malformed content is reported through `yaml_valid: false` and
/// `yaml_error`, never as an `Err`.
pub struct YamlExtractor {
    max_content_length: usize,
}

impl YamlExtractor {
    pub fn new() -> Self {
        Self {
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

impl Default for YamlExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a YAML value into the JSON value model used by the shared
/// structure analysis. Non-string mapping keys are stringified.
fn yaml_to_json(value: serde_yaml_ng::Value) -> Value {
    use serde_yaml_ng::Value as Yaml;
    match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => serde_json::to_value(n).unwrap_or(Value::Null),
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, val) in mapping {
                let key = match key {
                    Yaml::String(s) => s,
                    other => serde_yaml_ng::to_string(&other)
                        .map(|s| s.trim_end().to_string())
                        .unwrap_or_default(),
                };
                map.insert(key, yaml_to_json(val));
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

impl MetadataExtractor for YamlExtractor {
    fn name(&self) -> &str {
        "yaml-extractor"
    }

    fn supported_extensions(&self) -> &[&str] {
        &[".yaml", ".yml"]
    }

    fn supported_mime_prefixes(&self) -> &[&str] {
        &["application/x-yaml", "text/yaml"]
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

        match serde_yaml_ng::from_str::<serde_yaml_ng::Value>(&content) {
            Ok(data) => {
                let data = yaml_to_json(data);
                let keys = root_keys(&data);
                fragment.insert("yaml_valid".to_string(), json!(true));
                fragment.insert(
                    "yaml_structure".to_string(),
                    analyze_structure(&data, YAML_VOCAB),
                );
                fragment.insert("yaml_root_keys".to_string(), json!(keys));
                fragment.insert("yaml_root_key_count".to_string(), json!(keys.len()));
                fragment.insert("yaml_depth".to_string(), json!(max_depth(&data, 0)));
                fragment.insert("yaml_size".to_string(), json!(content.chars().count()));
                fragment.insert(
                    "content_preview".to_string(),
                    json!(content.chars().take(PREVIEW_LENGTH).collect::<String>()),
                );
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "invalid YAML");
                fragment.insert("yaml_valid".to_string(), json!(false));
                fragment.insert("yaml_error".to_string(), json!(e.to_string()));
            }
        }

        Ok(fragment)
    }
}
