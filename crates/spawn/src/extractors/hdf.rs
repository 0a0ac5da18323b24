//! HDF5 file metadata extractor.
//!
//! Walks the group/dataset hierarchy to a bounded depth, sampling a capped
//! number of datasets per group and a capped number of attributes per item.
//! Small numeric datasets also get min/max/mean/std summaries.

use crate::document::Fragment;
use crate::extractors::basic::common_file_fragment;
use crate::registry::MetadataExtractor;
use crate::{Result, SpawnError};
use hdf5::types::TypeDescriptor;
use hdf5::{Attribute, Dataset, Group};
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::{debug, error};

const DEFAULT_MAX_DATASETS_TO_SAMPLE: usize = 10;
const DEFAULT_MAX_ATTRS_PER_ITEM: usize = 20;
const MAX_GROUP_DEPTH: usize = 3;
const STATISTICS_ELEMENT_LIMIT: usize = 1_000;

/// Extract metadata from HDF5 files.
pub struct HdfExtractor {
    max_datasets_to_sample: usize,
    max_attrs_per_item: usize,
}

impl HdfExtractor {
    pub fn new() -> Self {
        Self {
            max_datasets_to_sample: DEFAULT_MAX_DATASETS_TO_SAMPLE,
            max_attrs_per_item: DEFAULT_MAX_ATTRS_PER_ITEM,
        }
    }
}

impl Default for HdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor for HdfExtractor {
    fn name(&self) -> &str {
        "hdf-extractor"
    }

    fn supported_extensions(&self) -> &[&str] {
        &[".h5", ".hdf", ".hdf5", ".he5", ".h4", ".hdf4"]
    }

    fn supported_mime_prefixes(&self) -> &[&str] {
        &["application/x-hdf", "application/x-hdf5"]
    }

    fn extract(&self, path: &Path) -> Result<Fragment> {
        let mut fragment = common_file_fragment(path)?;

        if let Err(e) = self.extract_impl(path, &mut fragment) {
            error!(path = %path.display(), error = %e, "error extracting HDF metadata");
            fragment.insert("error".to_string(), json!(e.to_string()));
        }

        Ok(fragment)
    }
}

impl HdfExtractor {
    fn extract_impl(&self, path: &Path, fragment: &mut Fragment) -> Result<()> {
        let file = hdf5::File::open(path)
            .map_err(|e| SpawnError::parsing(format!("Failed to open HDF5 file: {}", e)))?;

        fragment.insert("format".to_string(), json!("HDF5"));
        fragment.insert(
            "root_groups".to_string(),
            json!(file.member_names().unwrap_or_default()),
        );

        // File-level attributes are stringified wholesale.
        let mut file_attrs = Map::new();
        for name in file.attr_names().unwrap_or_default() {
            if let Ok(attr) = file.attr(&name) {
                file_attrs.insert(name, json!(value_to_string(&attr_value(&attr))));
            }
        }
        fragment.insert("file_attributes".to_string(), Value::Object(file_attrs));

        let mut datasets_info = Map::new();
        self.extract_group_info(&file, &mut datasets_info, "", 0);

        let mut total_datasets = 0usize;
        let mut total_size_bytes = 0u64;
        for info in datasets_info.values() {
            if info.get("type").and_then(Value::as_str) == Some("dataset") {
                total_datasets += 1;
                total_size_bytes += info
                    .get("size_bytes")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
            }
        }

        fragment.insert("datasets".to_string(), Value::Object(datasets_info));
        fragment.insert("total_datasets".to_string(), json!(total_datasets));
        fragment.insert("total_size_bytes".to_string(), json!(total_size_bytes));

        Ok(())
    }

    fn extract_group_info(
        &self,
        group: &Group,
        info: &mut Map<String, Value>,
        prefix: &str,
        depth: usize,
    ) {
        if depth > MAX_GROUP_DEPTH {
            return;
        }

        let mut datasets_processed = 0usize;

        for name in group.member_names().unwrap_or_default() {
            let item_path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", prefix, name)
            };

            if let Ok(subgroup) = group.group(&name) {
                info.insert(
                    item_path.clone(),
                    json!({
                        "type": "group",
                        "num_items": subgroup.member_names().map(|n| n.len()).unwrap_or(0),
                        "attributes": self.extract_attributes(&subgroup),
                    }),
                );
                self.extract_group_info(&subgroup, info, &item_path, depth + 1);
            } else if let Ok(dataset) = group.dataset(&name) {
                if datasets_processed >= self.max_datasets_to_sample {
                    continue;
                }
                datasets_processed += 1;
                info.insert(item_path.clone(), self.dataset_info(&dataset, &item_path));
            }
        }
    }

    fn dataset_info(&self, dataset: &Dataset, item_path: &str) -> Value {
        let shape = dataset.shape();
        let descriptor = dataset.dtype().and_then(|dt| dt.to_descriptor()).ok();
        let item_size = dataset.dtype().map(|dt| dt.size()).unwrap_or(0);
        let size_bytes = dataset.size() as u64 * item_size as u64;

        let mut out = Map::new();
        out.insert("type".to_string(), json!("dataset"));
        out.insert("shape".to_string(), json!(shape_string(&shape)));
        out.insert(
            "dtype".to_string(),
            json!(descriptor
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_else(|| "unknown".to_string())),
        );
        out.insert("size_bytes".to_string(), json!(size_bytes));
        out.insert(
            "attributes".to_string(),
            Value::Object(self.extract_attributes_of(dataset)),
        );

        let numeric = matches!(
            descriptor,
            Some(TypeDescriptor::Integer(_))
                | Some(TypeDescriptor::Unsigned(_))
                | Some(TypeDescriptor::Float(_))
        );
        if numeric && dataset.size() > 0 && dataset.size() < STATISTICS_ELEMENT_LIMIT {
            match dataset.read_raw::<f64>() {
                Ok(data) => {
                    out.insert("statistics".to_string(), statistics(&data));
                }
                Err(e) => {
                    debug!(path = item_path, error = %e, "could not compute statistics");
                }
            }
        }

        Value::Object(out)
    }

    fn extract_attributes(&self, group: &Group) -> Value {
        Value::Object(self.extract_attributes_of(group))
    }

    fn extract_attributes_of(&self, item: &hdf5::Location) -> Map<String, Value> {
        let mut attributes = Map::new();
        for name in item.attr_names().unwrap_or_default() {
            if attributes.len() >= self.max_attrs_per_item {
                break;
            }
            if let Ok(attr) = item.attr(&name) {
                attributes.insert(name, attr_value(&attr));
            }
        }
        attributes
    }
}

/// Best-effort attribute decoding: numeric scalars and arrays become JSON
/// numbers/lists, strings are decoded to UTF-8, anything else falls back to
/// the type description.
fn attr_value(attr: &Attribute) -> Value {
    let Ok(descriptor) = attr.dtype().and_then(|dt| dt.to_descriptor()) else {
        return Value::Null;
    };
    let scalar = attr.shape().is_empty();

    match descriptor {
        TypeDescriptor::Integer(_) => {
            if scalar {
                attr.read_scalar::<i64>().map(|v| json!(v)).unwrap_or(Value::Null)
            } else {
                attr.read_raw::<i64>().map(|v| json!(v)).unwrap_or(Value::Null)
            }
        }
        TypeDescriptor::Unsigned(_) => {
            if scalar {
                attr.read_scalar::<u64>().map(|v| json!(v)).unwrap_or(Value::Null)
            } else {
                attr.read_raw::<u64>().map(|v| json!(v)).unwrap_or(Value::Null)
            }
        }
        TypeDescriptor::Float(_) => {
            if scalar {
                attr.read_scalar::<f64>().map(|v| json!(v)).unwrap_or(Value::Null)
            } else {
                attr.read_raw::<f64>().map(|v| json!(v)).unwrap_or(Value::Null)
            }
        }
        TypeDescriptor::Boolean => attr
            .read_scalar::<bool>()
            .map(|v| json!(v))
            .unwrap_or(Value::Null),
        TypeDescriptor::VarLenUnicode => attr
            .read_scalar::<hdf5::types::VarLenUnicode>()
            .map(|v| json!(v.as_str()))
            .unwrap_or(Value::Null),
        TypeDescriptor::VarLenAscii => attr
            .read_scalar::<hdf5::types::VarLenAscii>()
            .map(|v| json!(v.as_str()))
            .unwrap_or(Value::Null),
        other => json!(other.to_string()),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Python-style tuple rendering of a dataset shape.
fn shape_string(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [single] => format!("({},)", single),
        dims => {
            let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", parts.join(", "))
        }
    }
}

fn statistics(data: &[f64]) -> Value {
    let count = data.len() as f64;
    let min = data.iter().copied().fold(f64::INFINITY, f64::min);
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = data.iter().sum::<f64>() / count;
    let variance = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    json!({
        "min": min,
        "max": max,
        "mean": mean,
        "std": variance.sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_string() {
        assert_eq!(shape_string(&[]), "()");
        assert_eq!(shape_string(&[10]), "(10,)");
        assert_eq!(shape_string(&[10, 20]), "(10, 20)");
    }

    #[test]
    fn test_statistics() {
        let stats = statistics(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats["min"], 1.0);
        assert_eq!(stats["max"], 4.0);
        assert_eq!(stats["mean"], 2.5);
        // Population standard deviation.
        assert!((stats["std"].as_f64().unwrap() - 1.118033988749895).abs() < 1e-9);
    }

    #[test]
    fn test_missing_file_reports_error_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.h5");
        std::fs::write(&path, b"not an hdf5 file").unwrap();

        let fragment = HdfExtractor::new().extract(&path).unwrap();
        assert!(fragment.get("error").is_some());
    }

    #[test]
    fn test_can_handle() {
        let extractor = HdfExtractor::new();
        assert!(extractor.can_handle(Path::new("run.h5")));
        assert!(extractor.can_handle(Path::new("run.HDF5")));
        assert!(!extractor.can_handle(Path::new("run.csv")));
    }

    #[test]
    fn test_round_trip_small_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.h5");

        {
            let file = hdf5::File::create(&path).unwrap();
            let group = file.create_group("measurements").unwrap();
            group
                .new_dataset_builder()
                .with_data(&[1.0f64, 2.0, 3.0])
                .create("values")
                .unwrap();
        }

        let fragment = HdfExtractor::new().extract(&path).unwrap();
        assert_eq!(fragment["format"], "HDF5");
        assert_eq!(fragment["root_groups"], json!(["measurements"]));
        assert_eq!(fragment["total_datasets"], 1);
        let dataset = &fragment["datasets"]["measurements/values"];
        assert_eq!(dataset["type"], "dataset");
        assert_eq!(dataset["shape"], "(3,)");
        assert_eq!(dataset["statistics"]["mean"], 2.0);
    }
}
