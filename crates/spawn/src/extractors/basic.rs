//! Always-applicable extractor producing filesystem-stat metadata.

use crate::core::mime::{guess_type, OCTET_STREAM_MIME_TYPE};
use crate::document::Fragment;
use crate::registry::MetadataExtractor;
use crate::Result;
use chrono::{DateTime, Local};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::time::SystemTime;

/// Extract basic metadata from any file.
///
/// Declares no extensions and no MIME prefixes, so it handles every file;
/// it is always the first extractor in the registry and seeds the canonical
/// `"file"` block plus the top-level stat-derived fields.
pub struct BasicExtractor;

impl BasicExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BasicExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// The standardized `"file"` block shared by all extractors.
pub(crate) fn common_file_fragment(path: &Path) -> Result<Fragment> {
    let stat = std::fs::metadata(path)?;

    let mut file_block = Map::new();
    file_block.insert(
        "filename".to_string(),
        json!(path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()),
    );
    file_block.insert(
        "directory".to_string(),
        json!(path.parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default()),
    );
    file_block.insert("extension".to_string(), json!(extension_with_dot(path)));
    file_block.insert("size_bytes".to_string(), json!(stat.len()));

    let mut fragment = Map::new();
    fragment.insert("file".to_string(), Value::Object(file_block));
    Ok(fragment)
}

fn extension_with_dot(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

fn iso_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

impl MetadataExtractor for BasicExtractor {
    fn name(&self) -> &str {
        "basic-extractor"
    }

    fn extract(&self, path: &Path) -> Result<Fragment> {
        let mut fragment = common_file_fragment(path)?;
        let stat = std::fs::metadata(path)?;

        let modified = stat.modified()?;
        // Not every filesystem records a birth time; fall back to mtime.
        let created = stat.created().unwrap_or(modified);
        let accessed = stat.accessed().unwrap_or(modified);

        let (mime_type, encoding) = guess_type(path);

        fragment.insert("path".to_string(), json!(path.to_string_lossy()));
        fragment.insert("created_at".to_string(), json!(iso_timestamp(created)));
        fragment.insert("modified_at".to_string(), json!(iso_timestamp(modified)));
        fragment.insert("accessed_at".to_string(), json!(iso_timestamp(accessed)));
        fragment.insert(
            "mime_type".to_string(),
            json!(mime_type.unwrap_or_else(|| OCTET_STREAM_MIME_TYPE.to_string())),
        );
        fragment.insert(
            "encoding".to_string(),
            encoding.map(Value::String).unwrap_or(Value::Null),
        );

        Ok(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_basic_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Sample.TXT");
        std::fs::File::create(&path).unwrap().write_all(b"hello").unwrap();

        let fragment = BasicExtractor::new().extract(&path).unwrap();

        let file = fragment["file"].as_object().unwrap();
        assert_eq!(file["filename"], "Sample.TXT");
        assert_eq!(file["extension"], ".txt");
        assert_eq!(file["size_bytes"], 5);
        assert_eq!(file["directory"], dir.path().to_string_lossy().as_ref());

        assert_eq!(fragment["path"], path.to_string_lossy().as_ref());
        assert_eq!(fragment["mime_type"], "text/plain");
        assert_eq!(fragment["encoding"], Value::Null);
        assert!(fragment["modified_at"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_unknown_extension_defaults_to_octet_stream() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.weird");
        std::fs::File::create(&path).unwrap();

        let fragment = BasicExtractor::new().extract(&path).unwrap();
        assert_eq!(fragment["mime_type"], "application/octet-stream");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = BasicExtractor::new().extract(Path::new("/nonexistent/file.txt"));
        assert!(result.is_err());
    }

    #[test]
    fn test_handles_every_file() {
        let extractor = BasicExtractor::new();
        assert!(extractor.can_handle(Path::new("/any/file.bin")));
        assert!(extractor.can_handle(Path::new("/any/file")));
    }
}
