//! Local JSON persistence for metadata documents.
//!
//! Crawl results are written to a fixed `SPAwn_metadata.json` in the output
//! directory; a single file's document goes to `<stem>_metadata.json`. Both
//! use 2-space indentation.

use crate::document::MetadataDocument;
use crate::Result;
use indexmap::IndexMap;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fixed filename for aggregate crawl metadata.
pub const AGGREGATE_METADATA_FILENAME: &str = "SPAwn_metadata.json";

/// Save the metadata of a whole crawl (path → document mapping) to
/// `<output_dir>/SPAwn_metadata.json`.
///
/// The output directory is created if needed. Returns the path written.
pub fn save_metadata_json(
    metadata: &IndexMap<String, MetadataDocument>,
    output_dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let json_path = output_dir.join(AGGREGATE_METADATA_FILENAME);

    let file = std::fs::File::create(&json_path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), metadata)?;

    debug!(count = metadata.len(), path = %json_path.display(), "saved crawl metadata");
    Ok(json_path)
}

/// Save a single file's metadata document to
/// `<output_dir>/<stem>_metadata.json`.
pub fn save_file_metadata_json(
    file_path: &Path,
    document: &MetadataDocument,
    output_dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let stem = file_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let json_path = output_dir.join(format!("{}_metadata.json", stem));

    let file = std::fs::File::create(&json_path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), document)?;

    debug!(file = %file_path.display(), path = %json_path.display(), "saved file metadata");
    Ok(json_path)
}
