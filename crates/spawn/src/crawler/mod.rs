//! Directory crawler.
//!
//! [`Crawler`] lazily walks a directory tree depth-first under a
//! [`CrawlPolicy`], yielding the absolute paths of regular files that pass
//! the policy's inclusion contract. Each crawl owns its own visited-set (so
//! symlink cycles terminate), applies the configured polling delay before
//! inspecting each directory entry, and recovers from directory-level
//! errors without aborting the traversal.

pub mod policy;

pub use policy::{CrawlPolicy, CrawlPolicyBuilder};

use std::collections::HashSet;
use std::fs::ReadDir;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Lazy, single-pass iterator over the files discovered by one crawl.
///
/// Re-crawling means constructing a fresh `Crawler`; the visited-set is
/// scoped to one traversal.
pub struct Crawler<'a> {
    policy: &'a CrawlPolicy,
    stack: Vec<(ReadDir, usize)>,
    visited: HashSet<PathBuf>,
}

impl<'a> Crawler<'a> {
    /// Start a crawl under the given policy.
    ///
    /// A missing or non-directory root is a reported condition, not an
    /// error: the crawl logs and yields nothing.
    pub fn new(policy: &'a CrawlPolicy) -> Self {
        let mut crawler = Self {
            policy,
            stack: Vec::new(),
            visited: HashSet::new(),
        };

        let root = policy.root();
        if !root.exists() {
            error!(root = %root.display(), "Root directory does not exist");
            return crawler;
        }
        if !root.is_dir() {
            error!(root = %root.display(), "Root path is not a directory");
            return crawler;
        }

        info!(root = %root.display(), "Starting crawl");
        crawler.descend(root, 0);
        crawler
    }

    /// Descend into a directory, honoring the depth limit and the symlink
    /// cycle guard.
    fn descend(&mut self, directory: &Path, depth: usize) {
        if let Some(max_depth) = self.policy.max_depth() {
            if depth > max_depth {
                return;
            }
        }

        let resolved = match directory.canonicalize() {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(directory = %directory.display(), error = %e, "Error crawling directory");
                return;
            }
        };
        if !self.visited.insert(resolved) {
            return;
        }

        match std::fs::read_dir(directory) {
            Ok(entries) => self.stack.push((entries, depth)),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                warn!(directory = %directory.display(), "Permission denied");
            }
            Err(e) => {
                error!(directory = %directory.display(), error = %e, "Error crawling directory");
            }
        }
    }

    /// Handle a symlink entry: resolve it and treat the target as a
    /// directory or file. Only called when the policy follows symlinks.
    fn follow_symlink(&mut self, path: &Path, depth: usize) -> Option<PathBuf> {
        let target = match path.canonicalize() {
            Ok(target) => target,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Skipping unresolvable symlink");
                return None;
            }
        };

        if target.is_dir() {
            self.descend(&target, depth + 1);
            None
        } else if target.is_file() && self.policy.matches_include(&target) {
            Some(target)
        } else {
            None
        }
    }
}

impl Iterator for Crawler<'_> {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let (entries, depth) = self.stack.last_mut()?;
            let depth = *depth;

            let entry = match entries.next() {
                Some(entry) => entry,
                None => {
                    self.stack.pop();
                    continue;
                }
            };

            // Throttle before inspecting each entry.
            let polling_rate = self.policy.polling_rate();
            if !polling_rate.is_zero() {
                std::thread::sleep(polling_rate);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    error!(error = %e, "Error reading directory entry");
                    continue;
                }
            };
            let path = entry.path();

            if self.policy.is_excluded(&path) {
                debug!(path = %path.display(), "Skipping excluded path");
                continue;
            }

            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Error classifying entry");
                    continue;
                }
            };

            if file_type.is_symlink() {
                if self.policy.follow_symlinks() {
                    if let Some(target) = self.follow_symlink(&path, depth) {
                        return Some(target);
                    }
                }
                // Symlinks are neither yielded nor descended otherwise.
            } else if file_type.is_file() {
                if self.policy.matches_include(&path) {
                    return Some(path);
                }
            } else if file_type.is_dir() {
                self.descend(&path, depth + 1);
            }
        }
    }
}

/// Crawl a directory and collect the discovered files.
pub fn crawl_directory(policy: &CrawlPolicy) -> Vec<PathBuf> {
    Crawler::new(policy).collect()
}
