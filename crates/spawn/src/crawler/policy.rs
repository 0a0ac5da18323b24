//! Crawl policy: the immutable inclusion/exclusion/depth/throttle rules
//! governing one traversal.
//!
//! Two pattern mechanisms compose:
//!
//! - **Globs** match the path's final component (`*.csv` against
//!   `report.csv`).
//! - **Regexes** are searched anywhere in the full path string
//!   (`/raw/` against `/data/raw/run1.dat`).
//!
//! Exclusion always dominates: a path matching any exclude glob or exclude
//! regex is rejected no matter what the include rules say. Inclusion then
//! requires a match from either mechanism; both default to match-all, so a
//! policy with only excludes accepts everything else.

use crate::core::config::SpawnConfig;
use crate::Result;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::RegexSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Exclude-regex appended when dot directories are ignored: any path
/// segment beginning with a dot.
const DOT_DIR_REGEX: &str = r"/\.[^/]*(/|$)";

/// Immutable configuration for one crawl.
#[derive(Debug)]
pub struct CrawlPolicy {
    root: PathBuf,
    include_globs: GlobSet,
    exclude_globs: GlobSet,
    include_regex: RegexSet,
    exclude_regex: RegexSet,
    max_depth: Option<usize>,
    follow_symlinks: bool,
    polling_rate: Duration,
}

impl CrawlPolicy {
    /// Start building a policy for the given root directory.
    pub fn builder(root: impl Into<PathBuf>) -> CrawlPolicyBuilder {
        CrawlPolicyBuilder::new(root)
    }

    /// The (absolutised) root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    pub fn follow_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    /// Delay applied before each directory-entry inspection.
    pub fn polling_rate(&self) -> Duration {
        self.polling_rate
    }

    /// Whether the path is rejected by the exclusion rules.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if let Some(name) = path.file_name() {
            if self.exclude_globs.is_match(Path::new(name)) {
                return true;
            }
        }
        self.exclude_regex.is_match(&path.to_string_lossy())
    }

    /// Whether the path satisfies the inclusion rules (glob OR regex).
    ///
    /// Exclusion is not consulted here; the crawler applies it first.
    pub fn matches_include(&self, path: &Path) -> bool {
        if let Some(name) = path.file_name() {
            if self.include_globs.is_match(Path::new(name)) {
                return true;
            }
        }
        self.include_regex.is_match(&path.to_string_lossy())
    }

    /// Full inclusion contract: not excluded, and matched by an include
    /// rule.
    pub fn accepts(&self, path: &Path) -> bool {
        !self.is_excluded(path) && self.matches_include(path)
    }
}

/// Builder for [`CrawlPolicy`].
#[derive(Debug, Clone, Default)]
pub struct CrawlPolicyBuilder {
    root: PathBuf,
    include_globs: Vec<String>,
    exclude_globs: Vec<String>,
    include_regex: Vec<String>,
    exclude_regex: Vec<String>,
    max_depth: Option<usize>,
    follow_symlinks: bool,
    polling_rate: Option<f64>,
    ignore_dot_dirs: Option<bool>,
}

impl CrawlPolicyBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Glob patterns files must match (default: `*`, match everything).
    pub fn include_globs<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_globs = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Glob patterns excluded from crawling (e.g. `*.tmp`).
    pub fn exclude_globs<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_globs = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Regex patterns included in crawling (default: match everything).
    pub fn include_regex<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_regex = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Regex patterns excluded from crawling (e.g. `^\..*$`).
    pub fn exclude_regex<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_regex = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Maximum recursion depth (unbounded when unset).
    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Whether to follow symbolic links.
    pub fn follow_symlinks(mut self, follow_symlinks: bool) -> Self {
        self.follow_symlinks = follow_symlinks;
        self
    }

    /// Seconds to wait between file operations (default from configuration).
    pub fn polling_rate(mut self, seconds: f64) -> Self {
        self.polling_rate = Some(seconds);
        self
    }

    /// Whether to skip path segments beginning with a dot (default from
    /// configuration, normally true).
    pub fn ignore_dot_dirs(mut self, ignore_dot_dirs: bool) -> Self {
        self.ignore_dot_dirs = Some(ignore_dot_dirs);
        self
    }

    /// Build with library defaults for any value the configuration would
    /// supply.
    pub fn build(self) -> Result<CrawlPolicy> {
        self.build_with(&SpawnConfig::default())
    }

    /// Build, taking unset defaults (polling rate, dot-dir policy) from the
    /// configuration provider.
    pub fn build_with(self, config: &SpawnConfig) -> Result<CrawlPolicy> {
        let root = if self.root.is_absolute() {
            self.root
        } else {
            std::env::current_dir()?.join(self.root)
        };

        let include_globs = if self.include_globs.is_empty() {
            vec!["*".to_string()]
        } else {
            self.include_globs
        };

        let ignore_dot_dirs = self
            .ignore_dot_dirs
            .unwrap_or(config.crawler.ignore_dot_dirs);
        let mut exclude_regex = self.exclude_regex;
        if ignore_dot_dirs {
            exclude_regex.push(DOT_DIR_REGEX.to_string());
        }

        let include_regex = if self.include_regex.is_empty() {
            vec![".*".to_string()]
        } else {
            self.include_regex
        };

        let polling_rate = self.polling_rate.unwrap_or(config.crawler.polling_rate);

        Ok(CrawlPolicy {
            root,
            include_globs: build_glob_set(&include_globs)?,
            exclude_globs: build_glob_set(&self.exclude_globs)?,
            include_regex: RegexSet::new(&include_regex)?,
            exclude_regex: RegexSet::new(&exclude_regex)?,
            max_depth: self.max_depth,
            follow_symlinks: self.follow_symlinks,
            polling_rate: Duration::from_secs_f64(polling_rate.max(0.0)),
        })
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).literal_separator(false).build()?);
    }
    Ok(builder.build()?)
}
