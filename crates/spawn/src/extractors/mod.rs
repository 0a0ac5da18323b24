//! Built-in metadata extractors.
//!
//! All extractors implement the [`MetadataExtractor`] trait and are
//! registered with the process-wide registry by
//! [`register_builtin_extractors`], which runs automatically on the first
//! extraction. Format support that needs heavyweight native or parser
//! dependencies sits behind cargo features; a disabled feature simply means
//! the extractor is never compiled or registered.

use crate::registry::{get_extractor_registry, register_extractor, MetadataExtractor};
use crate::Result;
use once_cell::sync::Lazy;
use std::sync::Arc;

pub mod basic;
pub mod json;
pub(crate) mod structured;
pub mod tabular;
pub mod text;
pub mod yaml;

#[cfg(feature = "image")]
pub mod image;

#[cfg(feature = "hdf5")]
pub mod hdf;

#[cfg(feature = "pdf")]
pub mod pdf;

#[cfg(feature = "python")]
pub mod python;

pub use basic::BasicExtractor;
pub use json::JsonExtractor;
pub use tabular::TabularExtractor;
pub use text::TextExtractor;
pub use yaml::YamlExtractor;

#[cfg(feature = "image")]
pub use image::ImageExtractor;

#[cfg(feature = "hdf5")]
pub use hdf::HdfExtractor;

#[cfg(feature = "pdf")]
pub use pdf::PdfExtractor;

#[cfg(feature = "python")]
pub use python::PythonExtractor;

static EXTRACTORS_INITIALIZED: Lazy<Result<()>> = Lazy::new(register_builtin_extractors);

/// Ensure the built-in extractors are registered.
///
/// Called automatically on the first extraction operation; safe to call any
/// number of times.
pub fn ensure_initialized() -> Result<()> {
    match EXTRACTORS_INITIALIZED.as_ref() {
        Ok(()) => Ok(()),
        Err(e) => Err(crate::SpawnError::Other(format!(
            "Failed to register built-in extractors: {}",
            e
        ))),
    }
}

/// Register all built-in extractors with the process-wide registry.
///
/// Registration is append-only and idempotent, so explicit calls compose
/// with the automatic initialization.
pub fn register_builtin_extractors() -> Result<()> {
    register_extractor(Arc::new(TextExtractor::new()))?;

    #[cfg(feature = "image")]
    register_extractor(Arc::new(ImageExtractor::new()))?;

    register_extractor(Arc::new(TabularExtractor::new()))?;

    #[cfg(feature = "hdf5")]
    register_extractor(Arc::new(HdfExtractor::new()))?;

    #[cfg(feature = "pdf")]
    register_extractor(Arc::new(PdfExtractor::new()))?;

    #[cfg(feature = "python")]
    register_extractor(Arc::new(PythonExtractor::new()))?;

    register_extractor(Arc::new(JsonExtractor::new()))?;
    register_extractor(Arc::new(YamlExtractor::new()))?;

    Ok(())
}

/// Extractors applicable to one file, in registration order.
pub fn extractors_for_file(path: &std::path::Path) -> Result<Vec<Arc<dyn MetadataExtractor>>> {
    ensure_initialized()?;
    let registry = get_extractor_registry()
        .read()
        .map_err(|e| crate::SpawnError::Other(format!("Extractor registry lock poisoned: {}", e)))?;
    Ok(registry.extractors_for(path))
}
