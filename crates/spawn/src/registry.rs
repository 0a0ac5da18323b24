//! Extractor trait and process-wide registry.
//!
//! The registry is an ordered, append-only list of extractor
//! implementations. It is seeded with the [`BasicExtractor`] and extended
//! once at startup by [`crate::extractors::register_builtin_extractors`];
//! after that it is effectively immutable — there is no unregistration.
//! Per-file dispatch asks every registered extractor whether it
//! [`can_handle`](MetadataExtractor::can_handle) the path and invokes the
//! matches in registration order.

use crate::core::mime::guess_type;
use crate::document::Fragment;
use crate::extractors::basic::BasicExtractor;
use crate::{Result, SpawnError};
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// A stateless component mapping a file path to a metadata fragment for one
/// format family.
///
/// Implementations declare the extensions and MIME-type prefixes they
/// handle; the provided [`can_handle`](Self::can_handle) implements the
/// dispatch rule (extension match OR MIME-prefix match — either alone
/// suffices, and declaring neither means the extractor handles every file).
///
/// Extractors must be safe to reuse for an entire crawl: `extract` may be
/// called for many files from one instance.
pub trait MetadataExtractor: Send + Sync {
    /// Unique kebab-case name, used in logs and for duplicate-registration
    /// detection.
    fn name(&self) -> &str;

    /// Handled file extensions, lower-cased with a leading dot.
    fn supported_extensions(&self) -> &[&str] {
        &[]
    }

    /// Handled MIME-type prefixes (e.g. `"text/"` or `"application/pdf"`).
    fn supported_mime_prefixes(&self) -> &[&str] {
        &[]
    }

    /// Whether this extractor applies to the given file.
    fn can_handle(&self, path: &Path) -> bool {
        let extensions = self.supported_extensions();
        let prefixes = self.supported_mime_prefixes();

        // Declaring no constraints at all means "handles every file"; the
        // basic extractor relies on this.
        if extensions.is_empty() && prefixes.is_empty() {
            return true;
        }

        if !extensions.is_empty() {
            let ext = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()));
            if let Some(ext) = ext {
                if extensions.contains(&ext.as_str()) {
                    return true;
                }
            }
        }

        if !prefixes.is_empty() {
            if let (Some(mime), _) = guess_type(path) {
                if prefixes.iter().any(|prefix| mime.starts_with(prefix)) {
                    return true;
                }
            }
        }

        false
    }

    /// Extract this format family's metadata fragment from a file.
    ///
    /// Recoverable problems (malformed content, a missing optional
    /// capability) should be reported through an `"error"` field in the
    /// returned fragment; `Err` is reserved for failures that make any
    /// fragment impossible, and is recovered by the pipeline either way.
    fn extract(&self, path: &Path) -> Result<Fragment>;
}

/// Ordered registry of metadata extractors.
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn MetadataExtractor>>,
}

impl ExtractorRegistry {
    /// Create a registry seeded with the basic extractor.
    pub fn new() -> Self {
        Self {
            extractors: vec![Arc::new(BasicExtractor::new())],
        }
    }

    /// Append an extractor.
    ///
    /// Registering a name that is already present is a no-op, matching the
    /// append-only contract. An empty or whitespace-containing name is
    /// rejected.
    pub fn register(&mut self, extractor: Arc<dyn MetadataExtractor>) -> Result<()> {
        let name = extractor.name();
        if name.is_empty() {
            return Err(SpawnError::validation("Extractor name cannot be empty"));
        }
        if name.contains(char::is_whitespace) {
            return Err(SpawnError::validation(format!(
                "Extractor name '{}' cannot contain whitespace",
                name
            )));
        }
        if self.extractors.iter().any(|e| e.name() == name) {
            debug!(extractor = name, "extractor already registered, skipping");
            return Ok(());
        }
        debug!(extractor = name, "registered metadata extractor");
        self.extractors.push(extractor);
        Ok(())
    }

    /// All extractors applicable to a file, in registration order.
    pub fn extractors_for(&self, path: &Path) -> Vec<Arc<dyn MetadataExtractor>> {
        self.extractors
            .iter()
            .filter(|e| e.can_handle(path))
            .cloned()
            .collect()
    }

    /// Names of every registered extractor, in registration order.
    pub fn list(&self) -> Vec<String> {
        self.extractors.iter().map(|e| e.name().to_string()).collect()
    }

    /// Number of registered extractors.
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Whether the registry holds no extractors (never true in practice: a
    /// fresh registry already carries the basic extractor).
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static EXTRACTOR_REGISTRY: Lazy<RwLock<ExtractorRegistry>> =
    Lazy::new(|| RwLock::new(ExtractorRegistry::new()));

/// Access the process-wide extractor registry.
pub fn get_extractor_registry() -> &'static RwLock<ExtractorRegistry> {
    &EXTRACTOR_REGISTRY
}

/// Register an extractor with the process-wide registry.
pub fn register_extractor(extractor: Arc<dyn MetadataExtractor>) -> Result<()> {
    let mut registry = EXTRACTOR_REGISTRY
        .write()
        .map_err(|e| SpawnError::Other(format!("Extractor registry lock poisoned: {}", e)))?;
    registry.register(extractor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    struct DummyExtractor {
        name: &'static str,
        extensions: &'static [&'static str],
        prefixes: &'static [&'static str],
    }

    impl MetadataExtractor for DummyExtractor {
        fn name(&self) -> &str {
            self.name
        }

        fn supported_extensions(&self) -> &[&str] {
            self.extensions
        }

        fn supported_mime_prefixes(&self) -> &[&str] {
            self.prefixes
        }

        fn extract(&self, _path: &Path) -> Result<Fragment> {
            Ok(Map::new())
        }
    }

    #[test]
    fn test_registry_seeded_with_basic() {
        let registry = ExtractorRegistry::new();
        assert_eq!(registry.list(), vec!["basic-extractor".to_string()]);
    }

    #[test]
    fn test_duplicate_registration_is_noop() {
        let mut registry = ExtractorRegistry::new();
        let extractor = Arc::new(DummyExtractor {
            name: "dummy",
            extensions: &[".foo"],
            prefixes: &[],
        });
        registry.register(extractor.clone()).unwrap();
        registry.register(extractor).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let mut registry = ExtractorRegistry::new();
        let err = registry
            .register(Arc::new(DummyExtractor {
                name: "has space",
                extensions: &[],
                prefixes: &[],
            }))
            .unwrap_err();
        assert!(matches!(err, SpawnError::Validation { .. }));
    }

    #[test]
    fn test_can_handle_by_extension() {
        let extractor = DummyExtractor {
            name: "ext",
            extensions: &[".csv", ".tsv"],
            prefixes: &[],
        };
        assert!(extractor.can_handle(Path::new("/data/table.CSV")));
        assert!(!extractor.can_handle(Path::new("/data/table.txt")));
    }

    #[test]
    fn test_can_handle_by_mime_prefix() {
        let extractor = DummyExtractor {
            name: "mime",
            extensions: &[],
            prefixes: &["text/"],
        };
        assert!(extractor.can_handle(Path::new("/notes/readme.txt")));
        assert!(!extractor.can_handle(Path::new("/pictures/photo.png")));
    }

    #[test]
    fn test_either_condition_suffices() {
        // Extension list misses but the MIME prefix matches.
        let extractor = DummyExtractor {
            name: "either",
            extensions: &[".weird"],
            prefixes: &["text/"],
        };
        assert!(extractor.can_handle(Path::new("/notes/readme.md")));
    }

    #[test]
    fn test_empty_lists_handle_everything() {
        let extractor = DummyExtractor {
            name: "catch-all",
            extensions: &[],
            prefixes: &[],
        };
        assert!(extractor.can_handle(Path::new("/anything/at.all")));
        assert!(extractor.can_handle(Path::new("/no/extension")));
    }

    #[test]
    fn test_extractors_for_preserves_registration_order() {
        let mut registry = ExtractorRegistry::new();
        registry
            .register(Arc::new(DummyExtractor {
                name: "second",
                extensions: &[".txt"],
                prefixes: &[],
            }))
            .unwrap();
        registry
            .register(Arc::new(DummyExtractor {
                name: "third",
                extensions: &[],
                prefixes: &["text/"],
            }))
            .unwrap();

        let matches = registry.extractors_for(Path::new("note.txt"));
        let names: Vec<_> = matches.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["basic-extractor", "second", "third"]);
    }
}
