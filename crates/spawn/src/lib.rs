//! SPAwn - filesystem crawler and metadata extraction pipeline.
//!
//! SPAwn walks directory trees under configurable inclusion/exclusion
//! policies and routes each discovered file through a registry of
//! format-specific metadata extractors, producing one merged metadata
//! document per file. The resulting path → document mapping feeds a search
//! index publisher or the local JSON persistence.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use spawn::crawler::CrawlPolicy;
//! use spawn::extract_directory;
//!
//! # fn main() -> spawn::Result<()> {
//! let policy = CrawlPolicy::builder("/data/instruments")
//!     .exclude_globs(["*.tmp"])
//!     .max_depth(Some(4))
//!     .build()?;
//!
//! let metadata = extract_directory(&policy);
//! for (path, document) in &metadata {
//!     println!("{}: {:?}", path, document.get("mime_type"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Crawler** (`crawler`): lazy depth-first traversal with glob/regex
//!   policy, depth limits, symlink-cycle avoidance, and an optional
//!   throttle.
//! - **Registry** (`registry`): process-wide, append-only list of
//!   extractors dispatched per file by extension or MIME-type prefix.
//! - **Extractors** (`extractors`): basic stat metadata plus text, image,
//!   PDF, HDF5, tabular, JSON, YAML, and Python-source format extractors.
//! - **Core** (`core`): configuration, MIME guessing, the per-file
//!   pipeline, and JSON persistence.
//!
//! The whole pipeline is synchronous and single-threaded: one pass, one
//! file at a time. The only process-wide state is the extractor registry,
//! which is populated once at startup and read-only afterwards.

#![deny(unsafe_code)]

pub mod core;
pub mod crawler;
pub mod document;
pub mod error;
pub mod extractors;
pub mod registry;

pub use crawler::{crawl_directory, CrawlPolicy, CrawlPolicyBuilder, Crawler};
pub use document::{Fragment, MetadataDocument};
pub use error::{Result, SpawnError};

pub use core::config::SpawnConfig;
pub use core::io::{save_file_metadata_json, save_metadata_json, AGGREGATE_METADATA_FILENAME};
pub use core::mime::{guess_mime_type, guess_type};
pub use core::pipeline::{extract_directory, extract_metadata};

pub use extractors::{ensure_initialized, register_builtin_extractors};
pub use registry::{get_extractor_registry, register_extractor, ExtractorRegistry, MetadataExtractor};
