//! MIME type and content-encoding guessing.
//!
//! Guessing is extension-based, mirroring how the rest of the pipeline
//! treats file types: extractors declare extension lists and MIME-type
//! prefixes, and [`guess_type`] supplies the MIME side of that check.

use mime_guess::MimeGuess;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

/// Fallback when no MIME type can be guessed from the extension.
pub const OCTET_STREAM_MIME_TYPE: &str = "application/octet-stream";

/// Compression-suffix to content-encoding mapping.
///
/// A trailing encoding suffix is stripped before the MIME guess, so
/// `data.csv.gz` reports `text/csv` with encoding `gzip`.
static ENCODING_SUFFIXES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("gz", "gzip");
    m.insert("tgz", "gzip");
    m.insert("bz2", "bzip2");
    m.insert("xz", "xz");
    m.insert("z", "compress");
    m
});

/// Extensions `mime_guess` maps poorly (or not at all) for our purposes.
static EXT_OVERRIDES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("py", "text/x-python");
    m.insert("pyi", "text/x-python");
    m.insert("pyx", "text/x-python");
    m.insert("pyw", "text/x-python");
    m.insert("yaml", "application/x-yaml");
    m.insert("yml", "application/x-yaml");
    m.insert("h5", "application/x-hdf5");
    m.insert("hdf5", "application/x-hdf5");
    m.insert("he5", "application/x-hdf5");
    m.insert("hdf", "application/x-hdf");
    m.insert("h4", "application/x-hdf");
    m.insert("hdf4", "application/x-hdf");
    m
});

fn extension_of(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

/// Guess the MIME type and content encoding of a path.
///
/// Returns `(mime_type, encoding)`; either side may be `None` when nothing
/// can be inferred from the file name.
pub fn guess_type(path: &Path) -> (Option<String>, Option<String>) {
    let mut stem = path.to_path_buf();
    let mut encoding = None;

    if let Some(ext) = extension_of(&stem) {
        if let Some(enc) = ENCODING_SUFFIXES.get(ext.as_str()) {
            encoding = Some(enc.to_string());
            stem = stem.with_extension("");
        }
    }

    let mime = extension_of(&stem).and_then(|ext| {
        if let Some(overridden) = EXT_OVERRIDES.get(ext.as_str()) {
            return Some(overridden.to_string());
        }
        MimeGuess::from_ext(&ext).first_raw().map(str::to_string)
    });

    (mime, encoding)
}

/// Guess the MIME type of a path, defaulting to `application/octet-stream`.
pub fn guess_mime_type(path: &Path) -> String {
    guess_type(path)
        .0
        .unwrap_or_else(|| OCTET_STREAM_MIME_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_extensions() {
        assert_eq!(guess_mime_type(Path::new("a.txt")), "text/plain");
        assert_eq!(guess_mime_type(Path::new("a.csv")), "text/csv");
        assert_eq!(guess_mime_type(Path::new("a.json")), "application/json");
        assert_eq!(guess_mime_type(Path::new("a.pdf")), "application/pdf");
        assert_eq!(guess_mime_type(Path::new("a.png")), "image/png");
    }

    #[test]
    fn test_override_extensions() {
        assert_eq!(guess_mime_type(Path::new("mod.py")), "text/x-python");
        assert_eq!(guess_mime_type(Path::new("c.yaml")), "application/x-yaml");
        assert_eq!(guess_mime_type(Path::new("d.h5")), "application/x-hdf5");
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        assert_eq!(guess_mime_type(Path::new("blob.xyzzy")), OCTET_STREAM_MIME_TYPE);
        assert_eq!(guess_mime_type(Path::new("no_extension")), OCTET_STREAM_MIME_TYPE);
    }

    #[test]
    fn test_encoding_suffix_is_stripped() {
        let (mime, encoding) = guess_type(Path::new("data.csv.gz"));
        assert_eq!(mime.as_deref(), Some("text/csv"));
        assert_eq!(encoding.as_deref(), Some("gzip"));

        let (mime, encoding) = guess_type(Path::new("plain.txt"));
        assert_eq!(mime.as_deref(), Some("text/plain"));
        assert_eq!(encoding, None);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(guess_mime_type(Path::new("UPPER.TXT")), "text/plain");
    }
}
