//! Metadata pipeline: per-file extraction and whole-crawl orchestration.
//!
//! For a single file, [`extract_metadata`] seeds the common `"file"` block,
//! asks the registry for every applicable extractor, and folds their
//! fragments into one [`MetadataDocument`] in registration order. A failing
//! extractor is logged and skipped; it never aborts the document, the file,
//! or the crawl.

use crate::crawler::{CrawlPolicy, Crawler};
use crate::document::MetadataDocument;
use crate::extractors::basic::common_file_fragment;
use crate::extractors::{self, extractors_for_file};
use crate::Result;
use indexmap::IndexMap;
use std::path::Path;
use tracing::{debug, error};

/// Extract a merged metadata document for one file.
///
/// # Errors
///
/// Only a failed stat of the file itself (missing file, unreadable
/// metadata) is an error; individual extractor failures are recovered and
/// logged.
pub fn extract_metadata(path: &Path) -> Result<MetadataDocument> {
    extractors::ensure_initialized()?;

    let mut document = MetadataDocument::new();
    document.merge_fragment(common_file_fragment(path)?);

    for extractor in extractors_for_file(path)? {
        match extractor.extract(path) {
            Ok(fragment) => document.merge_fragment(fragment),
            Err(e) => {
                error!(
                    extractor = extractor.name(),
                    path = %path.display(),
                    error = %e,
                    "Error extracting metadata"
                );
            }
        }
    }

    Ok(document)
}

/// Crawl a directory and extract metadata for every discovered file.
///
/// Returns a mapping from absolute file-path string to metadata document,
/// in discovery order. This mapping is what the metadata sink and the local
/// JSON persistence consume. Files whose extraction fails are logged and
/// skipped.
pub fn extract_directory(policy: &CrawlPolicy) -> IndexMap<String, MetadataDocument> {
    let mut results = IndexMap::new();

    for path in Crawler::new(policy) {
        match extract_metadata(&path) {
            Ok(document) => {
                debug!(path = %path.display(), "extracted metadata");
                results.insert(path.to_string_lossy().into_owned(), document);
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Skipping file");
            }
        }
    }

    results
}
