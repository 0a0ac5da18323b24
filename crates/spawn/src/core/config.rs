//! Configuration loading and management.
//!
//! `SpawnConfig` supplies the process-wide defaults the crawler and the
//! metadata pipeline fall back to when a caller omits an explicit value:
//! the crawler polling rate, the dot-directory policy, extra include/exclude
//! regex lists, and output locations.
//!
//! Configuration is loaded from the first existing file among
//! `./spawn.yaml`, `~/.config/spawn/config.yaml`, and
//! `/etc/spawn/config.yaml`; when none exists, defaults apply.

use crate::{Result, SpawnError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level SPAwn configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpawnConfig {
    /// Crawler defaults.
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Metadata persistence defaults.
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Output defaults.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Seconds to wait before inspecting each directory entry. Bounds I/O
    /// pressure on the crawled filesystem.
    #[serde(default)]
    pub polling_rate: f64,

    /// Skip any path segment beginning with a dot (default: true).
    #[serde(default = "default_true")]
    pub ignore_dot_dirs: bool,

    /// Extra regex patterns excluded from every crawl.
    #[serde(default)]
    pub exclude_regex: Vec<String>,

    /// Extra regex patterns included in every crawl.
    #[serde(default)]
    pub include_regex: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            polling_rate: 0.0,
            ignore_dot_dirs: true,
            exclude_regex: Vec::new(),
            include_regex: Vec::new(),
        }
    }
}

/// Metadata section of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Directory metadata JSON files are written to.
    #[serde(default)]
    pub json_dir: Option<PathBuf>,

    /// Whether crawls persist their metadata as JSON by default.
    #[serde(default)]
    pub save_json: bool,
}

/// Output section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output directory.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

impl SpawnConfig {
    /// Load configuration from an explicit YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the file does not exist and `Serialization`
    /// when it is not valid YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SpawnError::validation(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the default search paths.
    ///
    /// Tries `./spawn.yaml`, `~/.config/spawn/config.yaml`, and
    /// `/etc/spawn/config.yaml` in order; the first existing file wins. When
    /// no file exists, the default configuration is returned.
    pub fn discover() -> Result<Self> {
        for path in Self::default_paths() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Ok(Self::default())
    }

    /// The default configuration search paths, in precedence order.
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./spawn.yaml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("spawn").join("config.yaml"));
        }
        paths.push(PathBuf::from("/etc/spawn/config.yaml"));
        paths
    }

    /// Directory metadata JSON is written to when no explicit directory is
    /// given: the metadata `json_dir` when set, otherwise the output dir.
    pub fn metadata_json_dir(&self) -> PathBuf {
        self.metadata
            .json_dir
            .clone()
            .unwrap_or_else(|| self.output.dir.clone())
    }
}
