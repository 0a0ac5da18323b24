//! Error types for SPAwn.
//!
//! All fallible operations in the library return [`Result`], backed by the
//! single [`SpawnError`] enum.
//!
//! # Error Handling Philosophy
//!
//! **System errors bubble up unchanged:**
//! - `SpawnError::Io` (from `std::io::Error`) - file system errors
//!
//! **Application errors are wrapped with context:**
//! - `Parsing` - malformed file content an extractor could not recover from
//! - `Validation` - invalid paths, configuration, or parameters
//! - `MissingDependency` - an optional capability is not compiled in
//!
//! Note that most extractor-level failures never become a `SpawnError` at
//! all: the metadata pipeline recovers them locally, and format extractors
//! prefer reporting an `"error"` field inside the document over returning
//! `Err` (see the `extractors` module).

use thiserror::Error;

/// Result type alias using [`SpawnError`].
pub type Result<T> = std::result::Result<T, SpawnError>;

/// Main error type for all SPAwn operations.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsing error: {message}")]
    Parsing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Extractor error in '{extractor_name}': {message}")]
    Extractor { message: String, extractor_name: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    Other(String),
}

impl SpawnError {
    /// Create a `Parsing` error.
    pub fn parsing<S: Into<String>>(message: S) -> Self {
        Self::Parsing {
            message: message.into(),
            source: None,
        }
    }

    /// Create a `Parsing` error with a source.
    pub fn parsing_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Parsing {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a `Validation` error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Create a `Serialization` error.
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
            source: None,
        }
    }

    /// Create an `Extractor` error carrying the extractor's identity.
    pub fn extractor<S: Into<String>, N: Into<String>>(message: S, extractor_name: N) -> Self {
        Self::Extractor {
            message: message.into(),
            extractor_name: extractor_name.into(),
        }
    }
}

impl From<serde_json::Error> for SpawnError {
    fn from(err: serde_json::Error) -> Self {
        SpawnError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml_ng::Error> for SpawnError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        SpawnError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<csv::Error> for SpawnError {
    fn from(err: csv::Error) -> Self {
        SpawnError::Parsing {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<regex::Error> for SpawnError {
    fn from(err: regex::Error) -> Self {
        SpawnError::Validation {
            message: format!("invalid regex pattern: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

impl From<globset::Error> for SpawnError {
    fn from(err: globset::Error) -> Self {
        SpawnError::Validation {
            message: format!("invalid glob pattern: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SpawnError::validation("bad root");
        assert_eq!(err.to_string(), "Validation error: bad root");

        let err = SpawnError::UnsupportedFormat("application/x-unknown".to_string());
        assert_eq!(err.to_string(), "Unsupported format: application/x-unknown");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SpawnError = io.into();
        assert!(matches!(err, SpawnError::Io(_)));
    }

    #[test]
    fn test_extractor_error_carries_identity() {
        let err = SpawnError::extractor("boom", "pdf-extractor");
        assert_eq!(err.to_string(), "Extractor error in 'pdf-extractor': boom");
    }
}
